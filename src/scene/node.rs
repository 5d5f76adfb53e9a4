use crate::scene::member::Member;

/// A member placed on the orbit at a fixed slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberNode {
    pub member: Member,
    /// Slot on the orbit, `0..N`.
    pub angle_index: usize,
}

/// What sits under a pointer in the network diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Node(usize),
    Hub,
    /// The selected member's tooltip text.
    Tooltip,
    Background,
}

/// Keyboard focus inside the diagram, in tab order hub first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Hub,
    Node(usize),
}
