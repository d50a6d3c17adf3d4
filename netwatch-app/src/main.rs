mod app;
mod gaze;

pub use app::App;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "netwatch")]
#[command(about = "Packet classification trial screen")]
pub struct Args {
    /// Session manifest (condition, config and packets) as JSON
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Experiment server receiving results and gaze data
    #[arg(long, default_value = "http://localhost:3000")]
    pub server: String,

    /// Number of generated packets when no manifest is given
    #[arg(long, default_value_t = 12)]
    pub demo: usize,

    #[arg(long, default_value_t = false)]
    pub windowed: bool,

    /// TrueType font for panel text
    #[arg(long)]
    pub font: Option<PathBuf>,
}

/// Info by default; `filters` (normally `RUST_LOG`) take precedence.
fn log_builder(filters: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }
    builder
}

fn main() -> anyhow::Result<()> {
    log_builder(std::env::var("RUST_LOG").ok().as_deref()).init();

    let args = Args::parse();
    let app = App::new(args)?;
    app.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn info_is_the_default_level() {
        assert_eq!(log_builder(None).build().filter(), LevelFilter::Info);
    }

    #[test]
    fn env_filters_override_the_default() {
        assert_eq!(log_builder(Some("debug")).build().filter(), LevelFilter::Debug);
        assert_eq!(log_builder(Some("warn")).build().filter(), LevelFilter::Warn);
        assert_eq!(
            log_builder(Some("netwatch=trace")).build().filter(),
            LevelFilter::Trace
        );
    }
}
