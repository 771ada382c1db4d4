use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainIo, ChainLink, ChainMessage, ParticipantKind},
    dsp::utils::{ClockDivider, VU_BINS, VuEnvelope},
    rack::RACK_GRID_WIDTH,
    types::{LightId, ProcessArgs, Vec2},
};

/// Meter input is the lane sum scaled so 10 V reads as 0 dB.
const METER_SCALE: f32 = 10.0;

const WIDTH_HP: f32 = 1.0;

#[derive(Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct ChannelStripVuParams {}

#[derive(Inputs)]
struct ChannelStripVuInputs {}

#[derive(Outputs)]
struct ChannelStripVuOutputs {}

/// Meters the `single` signal of its left neighbor and passes the chain on untouched.
#[derive(Module)]
#[module(
    "channelStripVu",
    "Stereo level meter for the module on its left",
    width = 1,
    participant = ChannelStripVu,
    lights
)]
pub struct ChannelStripVu {
    outputs: ChannelStripVuOutputs,
    inputs: ChannelStripVuInputs,
    params: ChannelStripVuParams,
    link: ChainLink,
    envelopes: [VuEnvelope; 2],
    light_divider: ClockDivider,
    bins: [[f32; VU_BINS]; 2],
}

impl Default for ChannelStripVu {
    fn default() -> Self {
        Self {
            outputs: Default::default(),
            inputs: Default::default(),
            params: Default::default(),
            link: ChainLink::new(ParticipantKind::ChannelStripVu),
            envelopes: [VuEnvelope::default(); 2],
            light_divider: ClockDivider::new(crate::chain::link::LIGHT_DIVISION),
            bins: [[0.0; VU_BINS]; 2],
        }
    }
}

message_handlers!(impl ChannelStripVu {});

impl ChannelStripVu {
    /// Current envelope level per side, before dB conversion.
    pub fn levels(&self) -> (f32, f32) {
        (self.envelopes[0].value(), self.envelopes[1].value())
    }

    fn process(&mut self, args: &ProcessArgs, mut chain: Option<&mut ChainIo<'_>>) {
        let msg = self.link.receive(args, chain.as_deref_mut());

        let (left, right) = if self.link.linked_left() {
            (
                msg.single.left_sum() / METER_SCALE,
                msg.single.right_sum() / METER_SCALE,
            )
        } else {
            (0.0, 0.0)
        };
        self.envelopes[0].process(args.sample_time, left);
        self.envelopes[1].process(args.sample_time, right);

        // A master's chain ends here; whatever sits to the right starts a new one.
        if self.link.left_kind() == Some(ParticipantKind::Master) {
            self.link.forward(chain, &ChainMessage::head(self.right_edge()));
        } else {
            self.link.forward(chain, &msg);
        }

        if self.light_divider.tick() {
            for (side, envelope) in self.envelopes.iter().enumerate() {
                for (bin, brightness) in self.bins[side].iter_mut().enumerate() {
                    *brightness = envelope.bin_brightness(bin);
                }
            }
        }
    }

    fn right_edge(&self) -> Vec2 {
        let position = self.link.widget_position();
        Vec2::new(position.x + WIDTH_HP * RACK_GRID_WIDTH, position.y)
    }

    fn light(&self, light: LightId) -> f32 {
        match light {
            LightId::VuLeft(bin) => self.bins[0].get(bin).copied().unwrap_or(0.0),
            LightId::VuRight(bin) => self.bins[1].get(bin).copied().unwrap_or(0.0),
            other => self.link.light(other),
        }
    }
}
