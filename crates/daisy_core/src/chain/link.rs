use super::mailbox::Mailbox;
use super::message::ChainMessage;
use super::topology::{Neighbor, ParticipantKind, links_left, links_right};
use crate::dsp::utils::ClockDivider;
use crate::types::{LightId, ProcessArgs, Vec2};

/// Ticks between widget position polls
pub const POSITION_DIVISION: u32 = 128;
/// Ticks between link light refreshes
pub const LIGHT_DIVISION: u32 = 512;
/// Link light brightness while a boundary is linked
pub const LINK_BRIGHTNESS: f32 = 0.8;

/// What the host lends a participant for one tick: who sits either side,
/// the participant's own inbox, and the right neighbor's inbox when that
/// neighbor is a chain participant.
pub struct ChainIo<'a> {
    pub left: Option<Neighbor>,
    pub right: Option<Neighbor>,
    inbox: &'a mut Mailbox,
    right_inbox: Option<&'a mut Mailbox>,
}

impl<'a> ChainIo<'a> {
    pub fn new(
        left: Option<Neighbor>,
        right: Option<Neighbor>,
        inbox: &'a mut Mailbox,
        right_inbox: Option<&'a mut Mailbox>,
    ) -> Self {
        Self {
            left,
            right,
            inbox,
            right_inbox,
        }
    }

    pub fn flip_inbox(&mut self) -> bool {
        self.inbox.flip_if_requested()
    }

    pub fn inbox(&self) -> &ChainMessage {
        self.inbox.consumer()
    }

    /// Write into the right neighbor's producer slot and request its flip.
    /// Returns false when there is no mailbox to write to.
    pub fn publish_right(&mut self, message: &ChainMessage) -> bool {
        match self.right_inbox.as_deref_mut() {
            Some(mailbox) => {
                mailbox.publish(message);
                true
            }
            None => false,
        }
    }
}

/// Shared per-tick chain bookkeeping embedded in every participant:
/// neighbor checks, head synthesis, forwarding and link lights.
#[derive(Debug, Clone)]
pub struct ChainLink {
    kind: ParticipantKind,
    widget_position: Vec2,
    position_divider: ClockDivider,
    light_divider: ClockDivider,
    linked_left: bool,
    linked_right: bool,
    left_kind: Option<ParticipantKind>,
    left_light: f32,
    right_light: f32,
}

impl ChainLink {
    pub fn new(kind: ParticipantKind) -> Self {
        Self {
            kind,
            widget_position: Vec2::default(),
            position_divider: ClockDivider::new(POSITION_DIVISION),
            light_divider: ClockDivider::new(LIGHT_DIVISION),
            linked_left: false,
            linked_right: false,
            left_kind: None,
            left_light: 0.0,
            right_light: 0.0,
        }
    }

    pub fn kind(&self) -> ParticipantKind {
        self.kind
    }

    pub fn linked_left(&self) -> bool {
        self.linked_left
    }

    pub fn linked_right(&self) -> bool {
        self.linked_right
    }

    /// Kind of the left neighbor as of the last `receive`, if it is linked.
    pub fn left_kind(&self) -> Option<ParticipantKind> {
        self.left_kind
    }

    pub fn widget_position(&self) -> Vec2 {
        self.widget_position
    }

    /// Start of tick: flip the inbox, then return the left neighbor's message
    /// or a fresh chain head if the left boundary is broken.
    pub fn receive(&mut self, args: &ProcessArgs, chain: Option<&mut ChainIo<'_>>) -> ChainMessage {
        if self.position_divider.tick() {
            self.widget_position = args.position;
        }

        let Some(io) = chain else {
            self.linked_left = false;
            self.left_kind = None;
            return ChainMessage::head(self.widget_position);
        };

        io.flip_inbox();
        self.linked_left = links_left(self.kind, io.left);
        self.left_kind = io.left.and_then(|n| n.kind).filter(|_| self.linked_left);
        if self.linked_left {
            *io.inbox()
        } else {
            ChainMessage::head(self.widget_position)
        }
    }

    /// End of tick: publish to the right neighbor if that boundary is valid,
    /// then refresh link lights on their divider. Returns whether a write happened.
    pub fn forward(&mut self, chain: Option<&mut ChainIo<'_>>, message: &ChainMessage) -> bool {
        let written = match chain {
            Some(io) => {
                self.linked_right = links_right(self.kind, io.right);
                self.linked_right && io.publish_right(message)
            }
            None => {
                self.linked_right = false;
                false
            }
        };

        if self.light_divider.tick() {
            self.left_light = if self.linked_left { LINK_BRIGHTNESS } else { 0.0 };
            self.right_light = if self.linked_right { LINK_BRIGHTNESS } else { 0.0 };
        }

        written
    }

    pub fn light(&self, light: LightId) -> f32 {
        match light {
            LightId::LinkLeft => self.left_light,
            LightId::LinkRight => self.right_light,
            _ => 0.0,
        }
    }
}
