use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainIo, ChainLink, ParticipantKind},
    types::{LightId, ProcessArgs},
};

#[derive(Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct SeparatorParams {}

#[derive(Inputs)]
struct SeparatorInputs {}

#[derive(Outputs)]
struct SeparatorOutputs {}

/// Blank panel that keeps the chain connected across a visual gap.
#[derive(Module)]
#[module(
    "separator",
    "Blank panel that passes the chain through",
    width = 1,
    participant = Separator,
    lights
)]
pub struct Separator {
    outputs: SeparatorOutputs,
    inputs: SeparatorInputs,
    params: SeparatorParams,
    link: ChainLink,
}

impl Default for Separator {
    fn default() -> Self {
        Self {
            outputs: Default::default(),
            inputs: Default::default(),
            params: Default::default(),
            link: ChainLink::new(ParticipantKind::Separator),
        }
    }
}

message_handlers!(impl Separator {});

impl Separator {
    fn process(&mut self, args: &ProcessArgs, mut chain: Option<&mut ChainIo<'_>>) {
        let msg = self.link.receive(args, chain.as_deref_mut());
        self.link.forward(chain, &msg);
    }

    fn light(&self, light: LightId) -> f32 {
        self.link.light(light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainMessage, Mailbox, Neighbor, encode};
    use crate::types::Vec2;

    fn strip() -> Option<Neighbor> {
        Some(Neighbor {
            id: 0,
            kind: Some(ParticipantKind::ChannelStrip),
        })
    }

    fn tick(separator: &mut Separator, incoming: &ChainMessage) -> ChainMessage {
        let mut inbox = Mailbox::new();
        inbox.publish(incoming);
        let mut out = Mailbox::new();
        {
            let mut io = ChainIo::new(strip(), strip(), &mut inbox, Some(&mut out));
            separator.process(&ProcessArgs::new(48000.0, 0, Vec2::default()), Some(&mut io));
        }
        out.flip_if_requested();
        *out.consumer()
    }

    #[test]
    fn test_passes_through_identically() {
        let mut separator = Separator::default();
        let mut msg = ChainMessage::head(Vec2::new(15.0, 0.0));
        msg.mix.set(0, encode(3.0), encode(-3.0));
        msg.aux2.set(0, encode(1.0), encode(1.0));
        msg.soloists = 2;
        msg.strip_index = 4;

        let first = tick(&mut separator, &msg);
        let second = tick(&mut separator, &msg);
        assert_eq!(first, msg);
        assert_eq!(first, second);
    }

    #[test]
    fn test_link_lights() {
        let mut separator = Separator::default();
        tick(&mut separator, &ChainMessage::default());
        assert_eq!(separator.light(LightId::LinkLeft), 0.8);
        assert_eq!(separator.light(LightId::LinkRight), 0.8);
    }
}
