use std::time::Duration;

/// On-screen time for each packet.
///
/// The configured time is used unless `packet_count` packets of that length
/// would overrun the trial, in which case the trial is split evenly.
pub fn effective_packet_duration(
    configured: Duration,
    trial_length: Duration,
    packet_count: usize,
) -> Duration {
    if packet_count == 0 {
        return configured;
    }
    let budget = Duration::from_nanos((trial_length.as_nanos() / packet_count as u128) as u64);
    configured.min(budget)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSlot {
    pub delay: Duration,
    pub duration: Duration,
}

impl AnimationSlot {
    pub fn end(&self) -> Duration {
        self.delay + self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationPhase {
    Pending,
    /// Linear progress in `[0, 1)`
    Running(f32),
    Finished,
}

/// Staggered linear animations, one per packet.
///
/// Packet `i` starts after `(i + 1) * per_packet / 2` and runs for
/// `per_packet`, so consecutive packets overlap by half their duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Choreography {
    per_packet: Duration,
    slots: Vec<AnimationSlot>,
}

impl Choreography {
    pub fn new(per_packet: Duration, packet_count: usize) -> Self {
        let half_ns = per_packet.as_nanos() / 2;
        let slots = (0..packet_count)
            .map(|i| AnimationSlot {
                delay: Duration::from_nanos((half_ns * (i as u128 + 1)) as u64),
                duration: per_packet,
            })
            .collect();
        Self { per_packet, slots }
    }

    pub fn per_packet(&self) -> Duration {
        self.per_packet
    }

    pub fn slot(&self, index: usize) -> Option<AnimationSlot> {
        self.slots.get(index).copied()
    }

    pub fn slots(&self) -> &[AnimationSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Time from start until the last packet finishes
    pub fn total(&self) -> Duration {
        self.slots.last().map(AnimationSlot::end).unwrap_or_default()
    }

    /// Time from start until every packet has begun moving
    pub fn last_start(&self) -> Duration {
        self.slots.last().map(|s| s.delay).unwrap_or_default()
    }

    pub fn phase_at(&self, index: usize, elapsed: Duration) -> Option<AnimationPhase> {
        let slot = self.slot(index)?;
        Some(if elapsed < slot.delay {
            AnimationPhase::Pending
        } else if elapsed >= slot.end() {
            AnimationPhase::Finished
        } else if slot.duration.is_zero() {
            AnimationPhase::Finished
        } else {
            let into = (elapsed - slot.delay).as_secs_f64() / slot.duration.as_secs_f64();
            AnimationPhase::Running(into.clamp(0.0, 1.0) as f32)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_time_used_when_it_fits() {
        let d = effective_packet_duration(
            Duration::from_secs(5),
            Duration::from_secs(60),
            10,
        );
        assert_eq!(d, Duration::from_secs(5));
    }

    #[test]
    fn trial_budget_caps_packet_time() {
        // 1 minute over 20 packets leaves 3s each
        let d = effective_packet_duration(
            Duration::from_secs(5),
            Duration::from_secs(60),
            20,
        );
        assert_eq!(d, Duration::from_secs(3));
    }

    #[test]
    fn exact_fit_keeps_configured_time() {
        let d = effective_packet_duration(
            Duration::from_secs(6),
            Duration::from_secs(60),
            10,
        );
        assert_eq!(d, Duration::from_secs(6));
    }

    #[test]
    fn delays_strictly_increase_by_half_a_packet() {
        let per = Duration::from_millis(4000);
        let c = Choreography::new(per, 6);
        let delays: Vec<_> = c.slots().iter().map(|s| s.delay).collect();
        assert_eq!(delays[0], Duration::from_millis(2000));
        for pair in delays.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!(pair[1] - pair[0] <= per);
        }
        assert_eq!(c.last_start(), Duration::from_millis(12_000));
        assert_eq!(c.total(), Duration::from_millis(16_000));
    }

    #[test]
    fn phase_progression() {
        let c = Choreography::new(Duration::from_secs(2), 2);
        assert_eq!(c.phase_at(0, Duration::ZERO), Some(AnimationPhase::Pending));
        assert_eq!(
            c.phase_at(0, Duration::from_millis(1500)),
            Some(AnimationPhase::Running(0.25))
        );
        assert_eq!(
            c.phase_at(0, Duration::from_secs(3)),
            Some(AnimationPhase::Finished)
        );
        assert_eq!(c.phase_at(1, Duration::from_secs(1)), Some(AnimationPhase::Pending));
        assert_eq!(c.phase_at(2, Duration::ZERO), None);
    }

    #[test]
    fn empty_choreography_has_no_duration() {
        let c = Choreography::new(Duration::from_secs(2), 0);
        assert!(c.is_empty());
        assert_eq!(c.total(), Duration::ZERO);
    }
}
