use netwatch_core::Packet;
use netwatch_timing::AnimationPhase;

/// Center reference marker, in game-area percent
pub const CENTER: [f32; 2] = [50.0, 50.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketVisibility {
    /// Waiting for its stagger delay
    Hidden,
    /// On screen; linear progress in `[0, 1)`
    Moving(f32),
    /// Animation ended, node removed
    Removed,
}

/// Scene node for one packet
#[derive(Debug, Clone)]
pub struct PacketSlot {
    pub packet: Packet,
    pub visibility: PacketVisibility,
    pub selected: bool,
}

impl PacketSlot {
    pub fn new(packet: Packet) -> Self {
        Self {
            packet,
            visibility: PacketVisibility::Hidden,
            selected: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.visibility, PacketVisibility::Moving(_))
    }

    pub fn is_removed(&self) -> bool {
        self.visibility == PacketVisibility::Removed
    }

    /// Current position in game-area percent; the dot travels from its
    /// configured location toward the center marker.
    pub fn position(&self) -> [f32; 2] {
        let t = match self.visibility {
            PacketVisibility::Hidden => 0.0,
            PacketVisibility::Moving(t) => t,
            PacketVisibility::Removed => 1.0,
        };
        let [x, y] = self.packet.location;
        [x + (CENTER[0] - x) * t, y + (CENTER[1] - y) * t]
    }

    pub(crate) fn apply(&mut self, phase: AnimationPhase) -> Option<Transition> {
        let next = match phase {
            AnimationPhase::Pending => PacketVisibility::Hidden,
            AnimationPhase::Running(t) => PacketVisibility::Moving(t),
            AnimationPhase::Finished => PacketVisibility::Removed,
        };
        let transition = match (self.visibility, next) {
            (PacketVisibility::Removed, _) => return None,
            (PacketVisibility::Hidden, PacketVisibility::Moving(_)) => Some(Transition::Shown),
            (_, PacketVisibility::Removed) => Some(Transition::Finished),
            _ => None,
        };
        self.visibility = next;
        transition
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Shown,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_moves_toward_center() {
        let mut slot = PacketSlot::new(Packet::new([10.0, 90.0], None));
        assert_eq!(slot.position(), [10.0, 90.0]);
        assert_eq!(slot.apply(AnimationPhase::Running(0.5)), Some(Transition::Shown));
        assert_eq!(slot.position(), [30.0, 70.0]);
        assert!(slot.is_visible());
    }

    #[test]
    fn removal_is_reported_once() {
        let mut slot = PacketSlot::new(Packet::new([0.0, 0.0], None));
        // a long frame can skip the running phase entirely
        assert_eq!(slot.apply(AnimationPhase::Finished), Some(Transition::Finished));
        assert_eq!(slot.apply(AnimationPhase::Finished), None);
        assert_eq!(slot.apply(AnimationPhase::Running(0.1)), None);
        assert!(slot.is_removed());
    }
}
