use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use netwatch_core::Packet;
use netwatch_render::{SkiaRenderer, load_font};
use netwatch_session::{CensorKey, CensorSelection, Condition, TrialConfig, TrialSession};
use netwatch_timing::{HighPrecisionTimer, ManualTimer};
use std::time::Duration;

fn harness() -> (SkiaRenderer, TrialSession<ManualTimer>, Vec<u8>, HighPrecisionTimer) {
    let width = 1280u32;
    let height = 720u32;
    let condition = Condition {
        group: "A".into(),
        condition_text: "The advisor has reviewed these connections.".into(),
        advice_template: String::new(),
        censor: Some(CensorSelection {
            key: CensorKey::Sio,
            index: None,
        }),
    };
    let config = TrialConfig {
        trial_length: 1.0,
        packet_time_on_screen: 4.0,
        censoring: true,
        ..TrialConfig::default()
    };
    let timer = ManualTimer::new();
    let mut session = TrialSession::new(config, &condition, timer.clone()).unwrap();
    let packets = (0..40)
        .map(|i| Packet::new([(i * 7 % 100) as f32, (i * 13 % 100) as f32], None))
        .collect();
    session.setup(packets).unwrap();
    session.start().unwrap();
    timer.advance(Duration::from_secs(20));
    session.update();
    if let Some(first) = session.slots().iter().position(|s| s.is_visible()) {
        session.select_packet(first).unwrap();
    }

    let r = SkiaRenderer::new(width, height, session.rules().direction, load_font(None)).unwrap();
    let fb = vec![0u8; (width * height * 4) as usize];
    (r, session, fb, HighPrecisionTimer::new())
}

pub fn bench_trial_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40);

    g.bench_function("trial_frame", |b| {
        b.iter_batched(
            harness,
            |(mut r, session, mut fb, mut t)| {
                let stats = r.render_frame(&session, None, &mut fb, &mut t);
                black_box(stats.is_ok());
            },
            BatchSize::SmallInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_trial_frame);
criterion_main!(benches);
