use serde::{Deserialize, Serialize};

use crate::rack::ModuleId;

/// Closed set of module kinds that understand `ChainMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParticipantKind {
    ChannelStrip,
    ChannelStripVu,
    AuxSendGroup,
    Separator,
    Master,
}

impl ParticipantKind {
    /// Whether a participant of this kind reads messages from a `left` neighbor.
    /// Only a VU meter may sit to the right of a master.
    pub fn accepts_from(self, left: ParticipantKind) -> bool {
        match left {
            ParticipantKind::Master => self == ParticipantKind::ChannelStripVu,
            _ => true,
        }
    }

    /// Whether a participant of this kind forwards messages to a `right` neighbor.
    pub fn feeds(self, right: ParticipantKind) -> bool {
        match self {
            ParticipantKind::Master => right == ParticipantKind::ChannelStripVu,
            _ => true,
        }
    }
}

/// What the host reports about an adjacent module: an opaque handle plus an
/// optional chain kind. `kind` is `None` for modules outside the chain family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub id: ModuleId,
    pub kind: Option<ParticipantKind>,
}

/// A chain boundary exists unless the neighbor exists, is a participant, and
/// both sides agree on the direction of flow.
pub fn links_left(me: ParticipantKind, left: Option<Neighbor>) -> bool {
    match left.and_then(|n| n.kind) {
        Some(kind) => kind.feeds(me) && me.accepts_from(kind),
        None => false,
    }
}

pub fn links_right(me: ParticipantKind, right: Option<Neighbor>) -> bool {
    match right.and_then(|n| n.kind) {
        Some(kind) => me.feeds(kind) && kind.accepts_from(me),
        None => false,
    }
}
