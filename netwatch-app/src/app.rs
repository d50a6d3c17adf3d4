use anyhow::Result;
use netwatch_core::{Classification, SessionState};
use netwatch_render::{Button, FontVec, Hit, SkiaRenderer, load_font};
use netwatch_session::{GazeTracker, SessionEvent, SessionManifest, TrialSession};
use netwatch_timing::{HighPrecisionTimer, Timer};
use netwatch_upload::{HttpTransport, PipelineOutcome, SubmissionPipeline};
use pixels::{Pixels, SurfaceTexture};
use std::sync::{Arc, mpsc};
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowId},
};

use crate::Args;
use crate::gaze::CursorGazeTracker;

/// What the UI loop learns about a spawned submission
#[derive(Debug)]
enum Submission {
    Finished(PipelineOutcome),
    /// The task ended without reporting; no stage is known to have failed.
    Lost,
}

impl Submission {
    fn poll(rx: &mpsc::Receiver<PipelineOutcome>) -> Option<Self> {
        match rx.try_recv() {
            Ok(outcome) => Some(Submission::Finished(outcome)),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                log::error!("Submission task ended without reporting an outcome");
                Some(Submission::Lost)
            }
        }
    }

    fn succeeded(&self) -> bool {
        matches!(self, Submission::Finished(outcome) if outcome.is_completed())
    }

    fn notice(&self) -> String {
        match self {
            Submission::Finished(PipelineOutcome::Completed { next }) => {
                format!("Thank you. Continue at {next}")
            }
            Submission::Finished(PipelineOutcome::Failed { .. }) | Submission::Lost => {
                "Results could not be saved".to_string()
            }
        }
    }
}

pub struct App {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SkiaRenderer>,
    font: Option<FontVec>,
    session: TrialSession<HighPrecisionTimer>,
    tracker: CursorGazeTracker,
    pipeline: Arc<SubmissionPipeline<HttpTransport>>,
    runtime: Runtime,
    submission: Option<mpsc::Receiver<PipelineOutcome>>,
    notice: Option<String>,
    cursor: Option<(f32, f32)>,
    frame_timer: HighPrecisionTimer,
    windowed: bool,
    refresh_rate: Option<f64>,

    should_exit: bool,
}

impl App {
    pub fn new(args: Args) -> Result<Self> {
        let manifest = match &args.manifest {
            Some(path) => SessionManifest::load(path)?,
            None => {
                log::info!("No manifest given, generating {} demo packets", args.demo);
                SessionManifest::demo(&mut rand::rng(), args.demo)
            }
        };
        let tracker = CursorGazeTracker::new(manifest.config.gaze_timestep());
        let session = TrialSession::from_manifest(manifest, HighPrecisionTimer::new())?;

        let transport = HttpTransport::new(&args.server)?;
        log::info!("Submitting to {}", transport.base_url());
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;

        Ok(Self {
            window: None,
            pixels: None,
            renderer: None,
            font: load_font(args.font.as_deref()),
            session,
            tracker,
            pipeline: Arc::new(SubmissionPipeline::new(transport)),
            runtime,
            submission: None,
            notice: None,
            cursor: None,
            frame_timer: HighPrecisionTimer::new(),
            windowed: args.windowed,
            refresh_rate: None,
            should_exit: false,
        })
    }

    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        log::info!(
            "Platform: {} ({})",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        log::info!("Keys: 1/2/3 classify, A accepts the advisor, ESC exits");

        event_loop.run_app(&mut self)?;
        Ok(())
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .ok_or_else(|| anyhow::anyhow!("No monitor available"))?;

        self.refresh_rate = primary_monitor
            .refresh_rate_millihertz()
            .map(|rate| rate as f64 / 1000.0);

        let mut window_attributes = Window::default_attributes().with_title("Netwatch");
        window_attributes = if self.windowed {
            window_attributes.with_inner_size(PhysicalSize::new(1280, 720))
        } else {
            window_attributes
                .with_fullscreen(Some(Fullscreen::Borderless(Some(primary_monitor))))
                .with_resizable(false)
        };

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let physical_size = window.inner_size();

        log::info!(
            "Display: {}x{} at scale {:.2}, refresh {}",
            physical_size.width,
            physical_size.height,
            window.scale_factor(),
            self.refresh_rate
                .map_or_else(|| "unknown".to_string(), |hz| format!("{hz:.1} Hz"))
        );

        let surface_texture =
            SurfaceTexture::new(physical_size.width, physical_size.height, window.clone());
        self.pixels = Some(Pixels::new(
            physical_size.width,
            physical_size.height,
            surface_texture,
        )?);
        self.renderer = Some(SkiaRenderer::new(
            physical_size.width,
            physical_size.height,
            self.session.rules().direction,
            self.font.take(),
        )?);

        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let (Some(pix), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut()) else {
            return Ok(());
        };

        let stats = renderer.render_frame(
            &self.session,
            self.notice.as_deref(),
            pix.frame_mut(),
            &mut self.frame_timer,
        )?;
        pix.render()?;

        log::trace!(
            "clear {:.3}ms, scene {:.3}ms, copy {:.3}ms, total {:.3}ms",
            stats.clear.as_secs_f64() * 1e3,
            stats.scene.as_secs_f64() * 1e3,
            stats.copy.as_secs_f64() * 1e3,
            stats.total.as_secs_f64() * 1e3,
        );
        Ok(())
    }

    fn update(&mut self) -> Result<()> {
        // first frame is on screen, start the animations
        if self.session.state() == SessionState::Rendering {
            self.session.start()?;
            self.tracker.begin()?;
        }

        let now = self.session.elapsed_ms();
        let session = &mut self.session;
        if session.state().collects_gaze() {
            self.tracker
                .drain(now, &mut |point, at| session.on_gaze(point, at));
        }

        for event in self.session.update() {
            match event {
                SessionEvent::PacketShown(i) => log::debug!("Packet {} on screen", i),
                SessionEvent::PacketFinished(i) => log::debug!("Packet {} finished", i),
                SessionEvent::AllPacketsLaunched => log::info!("All packets launched"),
                SessionEvent::AllPacketsFinished => self.submit()?,
            }
        }

        self.poll_submission()
    }

    fn submit(&mut self) -> Result<()> {
        let outcome = self.session.end_trial()?;
        self.notice = Some("Saving results".to_string());

        let (tx, rx) = mpsc::channel();
        let pipeline = self.pipeline.clone();
        self.runtime.spawn(async move {
            let result = pipeline.run(outcome.records, &outcome.gaze).await;
            if tx.send(result).is_err() {
                log::warn!("Submission finished after the window closed");
            }
        });
        self.submission = Some(rx);
        Ok(())
    }

    fn poll_submission(&mut self) -> Result<()> {
        let Some(submission) = self.submission.as_ref().and_then(Submission::poll) else {
            return Ok(());
        };
        self.submission = None;

        self.session.finish_submission(submission.succeeded())?;
        self.notice = Some(submission.notice());
        Ok(())
    }

    fn click(&mut self) {
        let (Some((x, y)), Some(renderer)) = (self.cursor, self.renderer.as_ref()) else {
            return;
        };
        let dots = self
            .session
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_visible())
            .map(|(i, s)| (i, s.position()));
        let hit = renderer
            .layout()
            .hit_test(x, y, dots, self.session.rules().accept_visible);

        let result = match hit {
            Some(Hit::Packet(i)) => self.session.select_packet(i),
            Some(Hit::Button(Button::Classify(kind))) => self.session.classify(kind),
            Some(Hit::Button(Button::Accept)) => self.session.accept_recommendation(),
            None => Ok(()),
        };
        if let Err(e) = result {
            log::debug!("Click ignored: {}", e);
        }
    }

    fn handle_input(&mut self, key: winit::keyboard::PhysicalKey, event_loop: &ActiveEventLoop) {
        use winit::keyboard::{KeyCode, PhysicalKey};
        let PhysicalKey::Code(k) = key else {
            return;
        };
        let result = match k {
            KeyCode::Digit1 | KeyCode::Numpad1 => self.session.classify(Classification::Trusted),
            KeyCode::Digit2 | KeyCode::Numpad2 => self.session.classify(Classification::Suspect),
            KeyCode::Digit3 | KeyCode::Numpad3 => self.session.classify(Classification::Hostile),
            KeyCode::KeyA if self.session.rules().accept_visible => {
                self.session.accept_recommendation()
            }
            KeyCode::Escape => {
                self.cleanup_and_exit(event_loop);
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            log::debug!("Key ignored: {}", e);
        }
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                log::error!("Failed to resize surface: {}", e);
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                log::error!("Failed to resize buffer: {}", e);
            }
        }
        if let Some(renderer) = &mut self.renderer {
            if let Err(e) = renderer.resize(new_size.width, new_size.height) {
                log::error!("{}", e);
            }
        }
        log::info!("Display resized to {}x{}", new_size.width, new_size.height);
    }

    fn cleanup_and_exit(&mut self, event_loop: &ActiveEventLoop) {
        if self.submission.is_some() {
            log::warn!("Exiting while results are still being submitted");
        }
        if let Some(renderer) = &self.renderer {
            for (component, stats) in renderer.component_stats() {
                log::info!(
                    "{:>6}: {} frames, avg {:.3}ms, jitter {:.3}ms",
                    component,
                    stats.frames,
                    stats.average_frame_time_ns as f64 / 1e6,
                    stats.jitter_ns as f64 / 1e6,
                );
            }
        }
        let frames = self.frame_timer.frame_stats();
        log::info!(
            "Session {:?} after {} frames ({:.1} fps)",
            self.session.state(),
            frames.frames,
            frames.effective_fps
        );

        self.should_exit = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                log::error!("Failed to create window and surface: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.cleanup_and_exit(event_loop),
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render().and_then(|_| self.update()) {
                    log::error!("{:#}", e);
                    self.cleanup_and_exit(event_loop);
                    return;
                }
                if let Some(win) = &self.window {
                    win.request_redraw();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                self.handle_input(event.physical_key, event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some((position.x as f32, position.y as f32));
                self.tracker.cursor_moved(position.x, position.y);
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.tracker.cursor_left();
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => self.click(),
            WindowEvent::Resized(sz) => self.handle_resize(sz),
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = &self.window {
                    self.handle_resize(window.inner_size());
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netwatch_upload::{NEXT_LOCATION, Stage, UploadError};

    #[test]
    fn pending_submission_reports_nothing() {
        let (_tx, rx) = mpsc::channel::<PipelineOutcome>();
        assert!(Submission::poll(&rx).is_none());
    }

    #[test]
    fn completed_submission_names_next_location() {
        let (tx, rx) = mpsc::channel();
        tx.send(PipelineOutcome::Completed {
            next: NEXT_LOCATION.to_string(),
        })
        .unwrap();
        let submission = Submission::poll(&rx).unwrap();
        assert!(submission.succeeded());
        assert!(submission.notice().ends_with(NEXT_LOCATION));
    }

    #[test]
    fn failed_stage_is_not_a_success() {
        let (tx, rx) = mpsc::channel();
        tx.send(PipelineOutcome::Failed {
            stage: Stage::SubmitGaze,
            error: UploadError::Network("reset".into()),
        })
        .unwrap();
        let submission = Submission::poll(&rx).unwrap();
        assert!(!submission.succeeded());
        assert_eq!(submission.notice(), "Results could not be saved");
    }

    #[test]
    fn dropped_task_is_lost_without_a_stage() {
        let (tx, rx) = mpsc::channel::<PipelineOutcome>();
        drop(tx);
        let submission = Submission::poll(&rx).unwrap();
        assert!(matches!(submission, Submission::Lost));
        assert!(!submission.succeeded());
    }
}
