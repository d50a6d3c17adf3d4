use netwatch_core::{Classification, GazeSample, Packet, SessionState, TrialRecord};
use netwatch_timing::{Choreography, Timer, effective_packet_duration};
use std::time::Duration;

use super::config::{Condition, SessionManifest, TrialConfig};
use super::display::{AdviceDisplay, DisplayRules};
use super::error::SessionError;
use super::gaze::GazeBuffer;
use super::trial::{PacketSlot, Transition};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PacketShown(usize),
    PacketFinished(usize),
    /// Every packet has started moving
    AllPacketsLaunched,
    /// Every packet's animation has ended; the trial should end
    AllPacketsFinished,
}

/// What the session hands to the submission stage
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub records: Vec<TrialRecord>,
    pub gaze: Vec<GazeSample>,
}

/// Controller for one trial screen.
///
/// Owns the packet scene, the current selection, the completion counter and
/// the gaze buffer. Driven by `update` once per frame and by the input
/// methods from window events.
pub struct TrialSession<T>
where
    T: Timer,
{
    state: SessionState,
    timer: T,
    config: TrialConfig,
    rules: DisplayRules,
    advice: AdviceDisplay,
    slots: Vec<PacketSlot>,
    choreography: Option<Choreography>,
    created_ns: u64,
    started_ns: Option<u64>,
    selected: Option<usize>,
    finished: usize,
    completion_reported: bool,
    gaze: GazeBuffer,
}

impl<T> TrialSession<T>
where
    T: Timer<Timestamp = u64>,
{
    pub fn new(config: TrialConfig, condition: &Condition, timer: T) -> Result<Self, SessionError> {
        config.validate()?;
        let rules = DisplayRules::resolve(condition, &config)?;
        let advice = AdviceDisplay::new(condition, &rules);
        let created_ns = timer.now();
        Ok(Self {
            state: SessionState::Idle,
            timer,
            gaze: GazeBuffer::new(config.max_gaze_samples),
            config,
            rules,
            advice,
            slots: Vec::new(),
            choreography: None,
            created_ns,
            started_ns: None,
            selected: None,
            finished: 0,
            completion_reported: false,
        })
    }

    /// Builds a session and runs `setup` with the manifest's packets.
    pub fn from_manifest(manifest: SessionManifest, timer: T) -> Result<Self, SessionError> {
        manifest.validate()?;
        let mut session = Self::new(manifest.config, &manifest.condition, timer)?;
        session.setup(manifest.packets)?;
        Ok(session)
    }

    /// Places one scene node per packet and applies the condition's
    /// display rules. Gaze collection starts here.
    pub fn setup(&mut self, packets: Vec<Packet>) -> Result<(), SessionError> {
        self.expect_state(SessionState::Idle, "set up")?;
        self.slots = packets.into_iter().map(PacketSlot::new).collect();
        self.state = SessionState::Rendering;

        log::info!(
            "Trial set up: {} packets, layout {:?}, advice {}, accept {}, censored {:?}",
            self.slots.len(),
            self.rules.direction,
            if self.rules.advice_visible { "shown" } else { "hidden" },
            if self.rules.accept_visible { "shown" } else { "hidden" },
            self.rules.censored,
        );
        Ok(())
    }

    /// Shows the center marker and schedules the staggered animations.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.expect_state(SessionState::Rendering, "start")?;
        let per_packet = effective_packet_duration(
            self.config.packet_time_duration(),
            self.config.trial_length_duration(),
            self.slots.len(),
        );
        let choreography = Choreography::new(per_packet, self.slots.len());
        log::info!(
            "Trial started: {:.3}s per packet, last packet ends at {:.3}s",
            per_packet.as_secs_f64(),
            choreography.total().as_secs_f64()
        );
        self.choreography = Some(choreography);
        self.started_ns = Some(self.timer.now());
        self.state = SessionState::Animating;
        Ok(())
    }

    /// Advances animations to the current time.
    pub fn update(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !matches!(
            self.state,
            SessionState::Animating | SessionState::AwaitingAllCompletions
        ) {
            return events;
        }
        let (Some(choreography), Some(started)) = (&self.choreography, self.started_ns) else {
            return events;
        };
        let elapsed = self.timer.elapsed(started);

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(phase) = choreography.phase_at(index, elapsed) else {
                continue;
            };
            match slot.apply(phase) {
                Some(Transition::Shown) => events.push(SessionEvent::PacketShown(index)),
                Some(Transition::Finished) => {
                    self.finished += 1;
                    if slot.selected {
                        slot.selected = false;
                        self.selected = None;
                    }
                    events.push(SessionEvent::PacketFinished(index));
                }
                None => {}
            }
        }

        if self.state == SessionState::Animating && elapsed >= choreography.last_start() {
            self.state = SessionState::AwaitingAllCompletions;
            events.push(SessionEvent::AllPacketsLaunched);
        }

        if self.state == SessionState::AwaitingAllCompletions
            && self.finished == self.slots.len()
            && !self.completion_reported
        {
            self.completion_reported = true;
            events.push(SessionEvent::AllPacketsFinished);
        }

        events
    }

    /// Highlights `index`, clearing the previous highlight.
    pub fn select_packet(&mut self, index: usize) -> Result<(), SessionError> {
        self.expect_input()?;
        let slot = self
            .slots
            .get(index)
            .ok_or(SessionError::UnknownPacket(index))?;
        if !slot.is_visible() {
            return Err(SessionError::PacketNotVisible(index));
        }
        if let Some(previous) = self.selected.take() {
            if let Some(prev) = self.slots.get_mut(previous) {
                prev.selected = false;
            }
        }
        self.slots[index].selected = true;
        self.selected = Some(index);
        self.advice.restore();
        log::debug!("Packet {} selected", index);
        Ok(())
    }

    pub fn classify(&mut self, kind: Classification) -> Result<(), SessionError> {
        self.expect_input()?;
        let now_ms = self.elapsed_millis();
        let slot = self.selected_slot_mut()?;
        slot.packet.classification = Some(kind);
        slot.packet.input_time = Some(now_ms);
        log::debug!("Selected packet classified as {}", kind);
        Ok(())
    }

    /// Adopts the advisor's recommendation for the selected packet.
    pub fn accept_recommendation(&mut self) -> Result<(), SessionError> {
        self.expect_input()?;
        if !self.rules.accept_visible {
            return Err(SessionError::AdvisorHidden);
        }
        let now_ms = self.elapsed_millis();
        let slot = self.selected_slot_mut()?;
        let recommendation = slot
            .packet
            .recommendation
            .ok_or(SessionError::NoRecommendation)?;
        slot.packet.classification = Some(recommendation);
        slot.packet.accepted_recommendation = true;
        slot.packet.input_time = Some(now_ms);
        Ok(())
    }

    /// Listener for the gaze tracker. `None` estimates are ignored.
    pub fn on_gaze(&mut self, point: Option<(f64, f64)>, time_ms: f64) {
        if !self.state.collects_gaze() {
            return;
        }
        if let Some((x, y)) = point {
            self.gaze.push(GazeSample::new(x, y, time_ms));
        }
    }

    /// Reconciles accepted flags, builds the records in packet order and
    /// flushes the gaze buffer.
    pub fn end_trial(&mut self) -> Result<TrialOutcome, SessionError> {
        if !matches!(
            self.state,
            SessionState::Animating | SessionState::AwaitingAllCompletions
        ) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                op: "end the trial",
            });
        }

        let mut records = Vec::with_capacity(self.slots.len());
        for slot in &mut self.slots {
            if !slot.packet.matches_recommendation() {
                slot.packet.accepted_recommendation = false;
            }
            records.push(TrialRecord::from(&slot.packet));
        }
        if let Some(index) = self.selected.take() {
            self.slots[index].selected = false;
        }
        let gaze = self.gaze.flush();
        self.state = SessionState::Submitting;

        log::info!(
            "Trial ended after {:.1}s: {} records, {} gaze samples",
            self.elapsed_ms() / 1000.0,
            records.len(),
            gaze.len()
        );
        Ok(TrialOutcome { records, gaze })
    }

    /// Records how submission went. Failures are terminal.
    pub fn finish_submission(&mut self, succeeded: bool) -> Result<(), SessionError> {
        self.expect_state(SessionState::Submitting, "finish submission")?;
        self.state = if succeeded {
            SessionState::Done
        } else {
            SessionState::Failed
        };
        log::info!("Session {:?}", self.state);
        Ok(())
    }

    /// Milliseconds since the session was created
    pub fn elapsed_ms(&self) -> f64 {
        self.timer.elapsed(self.created_ns).as_secs_f64() * 1000.0
    }

    fn elapsed_millis(&self) -> u64 {
        self.timer.elapsed(self.created_ns).as_millis() as u64
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn rules(&self) -> &DisplayRules {
        &self.rules
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    pub fn advice_text(&self) -> Option<&str> {
        self.advice.text()
    }

    pub fn slots(&self) -> &[PacketSlot] {
        &self.slots
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_packet(&self) -> Option<&Packet> {
        self.selected
            .and_then(|i| self.slots.get(i))
            .map(|slot| &slot.packet)
    }

    /// The center marker is on screen from `start` until the trial ends.
    pub fn center_marker_visible(&self) -> bool {
        self.started_ns.is_some() && self.state.allows_input()
    }

    pub fn per_packet_duration(&self) -> Option<Duration> {
        self.choreography.as_ref().map(Choreography::per_packet)
    }

    pub fn gaze_samples(&self) -> usize {
        self.gaze.len()
    }

    /// (finished, total)
    pub fn progress(&self) -> (usize, usize) {
        (self.finished, self.slots.len())
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    fn selected_slot_mut(&mut self) -> Result<&mut PacketSlot, SessionError> {
        let index = self.selected.ok_or(SessionError::NoSelection)?;
        self.slots
            .get_mut(index)
            .ok_or(SessionError::UnknownPacket(index))
    }

    fn expect_state(&self, expected: SessionState, op: &'static str) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.state,
                op,
            })
        }
    }

    fn expect_input(&self) -> Result<(), SessionError> {
        if self.state.allows_input() {
            Ok(())
        } else {
            Err(SessionError::InputNotAllowed(self.state))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CensorKey, CensorSelection};
    use netwatch_timing::ManualTimer;

    fn condition(text: &str) -> Condition {
        Condition {
            group: "A".into(),
            condition_text: text.into(),
            advice_template: String::new(),
            censor: None,
        }
    }

    fn packets(recs: &[Option<Classification>]) -> Vec<Packet> {
        recs.iter()
            .enumerate()
            .map(|(i, r)| Packet::new([10.0 * i as f32, 20.0], *r))
            .collect()
    }

    /// 2s per packet, one minute trial
    fn running_session(recs: &[Option<Classification>]) -> (TrialSession<ManualTimer>, ManualTimer) {
        let timer = ManualTimer::new();
        let config = TrialConfig {
            trial_length: 1.0,
            packet_time_on_screen: 2.0,
            ..TrialConfig::default()
        };
        let mut session = TrialSession::new(config, &condition("advisor"), timer.clone()).unwrap();
        session.setup(packets(recs)).unwrap();
        session.start().unwrap();
        (session, timer)
    }

    #[test]
    fn lifecycle_follows_state_machine() {
        let timer = ManualTimer::new();
        let mut session =
            TrialSession::new(TrialConfig::default(), &condition("x"), timer.clone()).unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.start().is_err());
        session.setup(packets(&[None])).unwrap();
        assert_eq!(session.state(), SessionState::Rendering);
        assert!(session.setup(Vec::new()).is_err());
        session.start().unwrap();
        assert_eq!(session.state(), SessionState::Animating);
        assert!(session.center_marker_visible());
    }

    #[test]
    fn budget_caps_per_packet_time() {
        let timer = ManualTimer::new();
        let config = TrialConfig {
            trial_length: 0.5,
            packet_time_on_screen: 10.0,
            ..TrialConfig::default()
        };
        let mut session = TrialSession::new(config, &condition("x"), timer).unwrap();
        session.setup(packets(&[None; 6])).unwrap();
        session.start().unwrap();
        assert_eq!(session.per_packet_duration(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn packets_appear_staggered_and_finish() {
        let (mut session, timer) = running_session(&[None, None]);
        assert!(session.update().is_empty());

        timer.advance(Duration::from_millis(1000));
        assert_eq!(session.update(), vec![SessionEvent::PacketShown(0)]);

        timer.advance(Duration::from_millis(1000));
        assert_eq!(
            session.update(),
            vec![SessionEvent::PacketShown(1), SessionEvent::AllPacketsLaunched]
        );
        assert_eq!(session.state(), SessionState::AwaitingAllCompletions);

        timer.advance(Duration::from_millis(1000));
        assert_eq!(session.update(), vec![SessionEvent::PacketFinished(0)]);

        timer.advance(Duration::from_millis(1000));
        assert_eq!(
            session.update(),
            vec![
                SessionEvent::PacketFinished(1),
                SessionEvent::AllPacketsFinished
            ]
        );
        assert_eq!(session.progress(), (2, 2));
        assert!(session.update().is_empty());
    }

    #[test]
    fn empty_trial_finishes_immediately() {
        let (mut session, _timer) = running_session(&[]);
        assert_eq!(
            session.update(),
            vec![
                SessionEvent::AllPacketsLaunched,
                SessionEvent::AllPacketsFinished
            ]
        );
        let outcome = session.end_trial().unwrap();
        assert!(outcome.records.is_empty());
    }

    #[test]
    fn selecting_moves_highlight() {
        let (mut session, timer) = running_session(&[None, None, None]);
        timer.advance(Duration::from_millis(2500));
        session.update();

        session.select_packet(0).unwrap();
        assert_eq!(session.selected(), Some(0));
        session.select_packet(2).unwrap_err();
        session.select_packet(1).unwrap();

        let highlighted: Vec<_> = session
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.selected)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(highlighted, vec![1]);
        assert_eq!(session.selected(), Some(1));
    }

    #[test]
    fn hidden_or_unknown_packets_cannot_be_selected() {
        let (mut session, timer) = running_session(&[None, None]);
        timer.advance(Duration::from_millis(1500));
        session.update();
        assert!(matches!(
            session.select_packet(1),
            Err(SessionError::PacketNotVisible(1))
        ));
        assert!(matches!(
            session.select_packet(9),
            Err(SessionError::UnknownPacket(9))
        ));
    }

    #[test]
    fn finished_packet_loses_selection() {
        let (mut session, timer) = running_session(&[None, None]);
        timer.advance(Duration::from_millis(1500));
        session.update();
        session.select_packet(0).unwrap();
        timer.advance(Duration::from_millis(2000));
        session.update();
        assert_eq!(session.selected(), None);
        assert!(matches!(
            session.classify(Classification::Hostile),
            Err(SessionError::NoSelection)
        ));
    }

    #[test]
    fn classify_stamps_input_time() {
        let (mut session, timer) = running_session(&[Some(Classification::Trusted)]);
        timer.advance(Duration::from_millis(1200));
        session.update();
        session.select_packet(0).unwrap();
        session.classify(Classification::Suspect).unwrap();
        let packet = session.selected_packet().unwrap();
        assert_eq!(packet.classification, Some(Classification::Suspect));
        assert_eq!(packet.input_time, Some(1200));
    }

    #[test]
    fn mismatch_clears_accepted_flag() {
        let (mut session, timer) = running_session(&[
            Some(Classification::Trusted),
            Some(Classification::Hostile),
        ]);
        timer.advance(Duration::from_millis(2100));
        session.update();

        session.select_packet(0).unwrap();
        session.accept_recommendation().unwrap();
        // participant changes their mind after accepting
        session.classify(Classification::Hostile).unwrap();

        session.select_packet(1).unwrap();
        session.accept_recommendation().unwrap();

        let outcome = session.end_trial().unwrap();
        assert_eq!(
            outcome.records[0],
            TrialRecord {
                user: Some(Classification::Hostile),
                advisor: Some(Classification::Trusted),
                accepted: false,
                time: Some(2100),
            }
        );
        assert!(outcome.records[1].accepted);
        assert_eq!(session.state(), SessionState::Submitting);
    }

    #[test]
    fn unclassified_packet_without_recommendation_keeps_flag() {
        let (mut session, _timer) = running_session(&[None]);
        let outcome = session.end_trial().unwrap();
        assert_eq!(
            outcome.records,
            vec![TrialRecord {
                user: None,
                advisor: None,
                accepted: false,
                time: None
            }]
        );
    }

    #[test]
    fn accept_requires_visible_advisor() {
        let timer = ManualTimer::new();
        let mut session =
            TrialSession::new(TrialConfig::default(), &condition(""), timer.clone()).unwrap();
        session
            .setup(packets(&[Some(Classification::Trusted)]))
            .unwrap();
        session.start().unwrap();
        timer.advance(Duration::from_secs(6));
        session.update();
        session.select_packet(0).unwrap();
        assert!(matches!(
            session.accept_recommendation(),
            Err(SessionError::AdvisorHidden)
        ));
        assert_eq!(session.advice_text(), None);
    }

    #[test]
    fn accept_without_recommendation_fails() {
        let (mut session, timer) = running_session(&[None]);
        timer.advance(Duration::from_millis(1500));
        session.update();
        session.select_packet(0).unwrap();
        assert!(matches!(
            session.accept_recommendation(),
            Err(SessionError::NoRecommendation)
        ));
    }

    #[test]
    fn gaze_collected_until_trial_end() {
        let mut session =
            TrialSession::new(TrialConfig::default(), &condition("x"), ManualTimer::new()).unwrap();
        session.on_gaze(Some((1.0, 1.0)), 0.0);
        assert_eq!(session.gaze_samples(), 0);
        session.setup(packets(&[None])).unwrap();
        session.on_gaze(Some((100.0, 200.0)), 5.0);
        assert_eq!(session.state(), SessionState::Rendering);
        assert_eq!(session.gaze_samples(), 1);
        session.start().unwrap();
        session.on_gaze(Some((100.0, 200.0)), 10.0);
        session.on_gaze(None, 20.0);
        session.on_gaze(Some((110.0, 210.0)), 30.0);
        let outcome = session.end_trial().unwrap();
        assert_eq!(
            outcome.gaze,
            vec![
                GazeSample::new(100.0, 200.0, 5.0),
                GazeSample::new(100.0, 200.0, 10.0),
                GazeSample::new(110.0, 210.0, 30.0)
            ]
        );
        session.on_gaze(Some((1.0, 1.0)), 40.0);
        assert_eq!(session.gaze_samples(), 0);
    }

    #[test]
    fn selection_without_template_keeps_advisor_text() {
        let (mut session, timer) = running_session(&[Some(Classification::Trusted)]);
        timer.advance(Duration::from_secs(1));
        session.update();
        assert_eq!(session.advice_text(), Some("advisor"));
        session.select_packet(0).unwrap();
        assert_eq!(session.advice_text(), Some("advisor"));
    }

    #[test]
    fn input_rejected_after_trial_end() {
        let (mut session, _timer) = running_session(&[None]);
        session.end_trial().unwrap();
        assert!(matches!(
            session.select_packet(0),
            Err(SessionError::InputNotAllowed(SessionState::Submitting))
        ));
        assert!(session.end_trial().is_err());
        session.finish_submission(false).unwrap();
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn censor_rules_come_from_condition() {
        let timer = ManualTimer::new();
        let config = TrialConfig {
            censoring: true,
            ..TrialConfig::default()
        };
        let mut cond = condition("advisor");
        cond.censor = Some(CensorSelection {
            key: CensorKey::Rio,
            index: Some(2),
        });
        let session = TrialSession::new(config, &cond, timer).unwrap();
        assert!(session.rules().is_censored(netwatch_core::InfoField::Certificates));
        assert_eq!(session.rules().censored.len(), 1);
    }
}
