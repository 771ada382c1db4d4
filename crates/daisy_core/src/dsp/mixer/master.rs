//! Master - end of the chain.
//!
//! Decodes the accumulated bus back to full scale (the solo bus replaces the
//! mix whenever any strip upstream is soloed), then applies master level and
//! an optional CV fader. Only a VU meter may sit on its right; it receives
//! the master output as its `single` signal.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{ChainIo, ChainLink, ChainMessage, ParticipantKind, decode_buffer},
    poly::{PORT_MAX_CHANNELS, PolyInput, PolyOutput},
    types::{Clickless, LightId, ProcessArgs, Vec2},
};

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct MasterParams {
    /// Master level, 0..2
    level: f32,
}

impl Default for MasterParams {
    fn default() -> Self {
        Self { level: 1.0 }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterState {
    pub muted: bool,
    pub level_slew: bool,
}

#[derive(Inputs)]
struct MasterInputs {
    #[input("level-cv", "master level CV, 0..10V")]
    level_cv: PolyInput,
}

#[derive(Outputs)]
struct MasterOutputs {
    #[output("out-l", "left mix out", default)]
    out_l: PolyOutput,
    #[output("out-r", "right mix out")]
    out_r: PolyOutput,
}

#[derive(Module)]
#[module(
    "master",
    "Decodes the chained mix, with master level and mute",
    width = 3,
    participant = Master,
    lights
)]
#[stateful]
pub struct Master {
    outputs: MasterOutputs,
    inputs: MasterInputs,
    params: MasterParams,
    state: MasterState,
    link: ChainLink,
    cv_slew: [Clickless; PORT_MAX_CHANNELS],
    chain_origin: Option<Vec2>,
    soloing: bool,
}

impl Default for Master {
    fn default() -> Self {
        Self {
            outputs: Default::default(),
            inputs: Default::default(),
            params: Default::default(),
            state: Default::default(),
            link: ChainLink::new(ParticipantKind::Master),
            cv_slew: [Clickless::from(1.0); PORT_MAX_CHANNELS],
            chain_origin: None,
            soloing: false,
        }
    }
}

message_handlers!(impl Master {
    SetMuted(muted) => Master::set_muted,
    SetLevelSlew(enabled) => Master::set_level_slew,
});

impl Master {
    pub fn state(&self) -> &MasterState {
        &self.state
    }

    /// Panel position of the chain head, as last seen. `None` before the first tick.
    pub fn chain_origin(&self) -> Option<Vec2> {
        self.chain_origin
    }

    /// Whether the last decoded bus was the solo bus.
    pub fn soloing(&self) -> bool {
        self.soloing
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.state.muted = muted;
        Ok(())
    }

    fn set_level_slew(&mut self, enabled: bool) -> Result<()> {
        self.state.level_slew = enabled;
        Ok(())
    }

    fn process(&mut self, args: &ProcessArgs, mut chain: Option<&mut ChainIo<'_>>) {
        let msg = self.link.receive(args, chain.as_deref_mut());
        self.chain_origin = Some(msg.chain_origin);
        self.soloing = msg.has_solo();

        let mut output = decode_buffer(msg.audible());
        let level = self.params.level.clamp(0.0, 2.0);
        let cv_connected = self.inputs.level_cv.is_connected();

        for c in 0..output.channels() {
            let cv = if cv_connected {
                (self.inputs.level_cv.get_value(c) / 10.0).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let fader = if self.state.level_slew {
                self.cv_slew[c].update(cv);
                *self.cv_slew[c]
            } else {
                self.cv_slew[c].reset(cv);
                cv
            };
            let gain = level * fader;
            output.set(c, output.left(c) * gain, output.right(c) * gain);
        }

        if self.state.muted {
            output.silence();
        }
        output.write_outputs(&mut self.outputs.out_l, &mut self.outputs.out_r);

        let mut meter = ChainMessage::head(self.link.widget_position());
        meter.single = output;
        self.link.forward(chain, &meter);
    }

    fn light(&self, light: LightId) -> f32 {
        match light {
            LightId::Mute => {
                if self.state.muted {
                    1.0
                } else {
                    0.0
                }
            }
            other => self.link.light(other),
        }
    }
}
