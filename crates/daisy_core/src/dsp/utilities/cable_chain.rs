//! First-generation daisy chain carried over ordinary cables.
//!
//! Each strip adds its divisor-scaled output to whatever arrives on `chain-in`
//! and patches the sum on to the next strip; the master decodes the result.
//! Unlike the neighbor chain there is no solo, aux or metering here.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{decode, encode},
    poly::{PORT_MAX_CHANNELS, PolyInput, PolyOutput},
    types::{LightId, ProcessArgs},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableChainState {
    pub muted: bool,
}

fn cv_fader(cv: &PolyInput, channel: usize) -> f32 {
    if cv.is_connected() {
        (cv.get_value(channel) / 10.0).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn mute_light(state: &CableChainState) -> f32 {
    if state.muted { 1.0 } else { 0.0 }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct CableStripParams {
    /// 0..1, squared
    level: f32,
}

impl Default for CableStripParams {
    fn default() -> Self {
        Self { level: 1.0 }
    }
}

#[derive(Inputs)]
struct CableStripInputs {
    #[input("in", "signal in")]
    input: PolyInput,
    #[input("level-cv", "level CV, 0..10V")]
    level_cv: PolyInput,
    #[input("chain-in", "chain from the previous strip")]
    chain_in: PolyInput,
}

#[derive(Outputs)]
struct CableStripOutputs {
    #[output("out", "signal after level and mute", default)]
    out: PolyOutput,
    #[output("chain-out", "chain to the next strip or master")]
    chain_out: PolyOutput,
}

#[derive(Default, Module)]
#[module("cableStrip", "Channel strip chained over cables", width = 2, lights)]
#[stateful]
pub struct CableStrip {
    outputs: CableStripOutputs,
    inputs: CableStripInputs,
    params: CableStripParams,
    state: CableChainState,
}

message_handlers!(impl CableStrip {
    SetMuted(muted) => CableStrip::set_muted,
});

impl CableStrip {
    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.state.muted = muted;
        Ok(())
    }

    fn process(&mut self, _args: &ProcessArgs) {
        let gain = self.params.level.clamp(0.0, 1.0).powi(2);
        let channels = self.inputs.input.channels().max(1);

        let mut out = [0.0f32; PORT_MAX_CHANNELS];
        if !self.state.muted {
            for (c, lane) in out.iter_mut().enumerate().take(channels) {
                *lane = self.inputs.input.get(c) * gain * cv_fader(&self.inputs.level_cv, c);
            }
        }
        self.outputs.out.write_voltages(&out, channels);

        let chain_channels = channels.max(self.inputs.chain_in.channels());
        let mut chain = [0.0f32; PORT_MAX_CHANNELS];
        for (c, lane) in chain.iter_mut().enumerate().take(chain_channels) {
            *lane = self.inputs.chain_in.get(c) + encode(out[c]);
        }
        self.outputs.chain_out.write_voltages(&chain, chain_channels);
    }

    fn light(&self, light: LightId) -> f32 {
        match light {
            LightId::Mute => mute_light(&self.state),
            _ => 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct CableMasterParams {
    /// 0..2
    level: f32,
}

impl Default for CableMasterParams {
    fn default() -> Self {
        Self { level: 1.0 }
    }
}

#[derive(Inputs)]
struct CableMasterInputs {
    #[input("chain-in", "chain from the last strip")]
    chain_in: PolyInput,
    #[input("level-cv", "level CV, 0..10V")]
    level_cv: PolyInput,
}

#[derive(Outputs)]
struct CableMasterOutputs {
    #[output("out", "decoded mix", default)]
    out: PolyOutput,
}

#[derive(Default, Module)]
#[module("cableMaster", "Decodes a cable-chained mix", width = 2, lights)]
#[stateful]
pub struct CableMaster {
    outputs: CableMasterOutputs,
    inputs: CableMasterInputs,
    params: CableMasterParams,
    state: CableChainState,
}

message_handlers!(impl CableMaster {
    SetMuted(muted) => CableMaster::set_muted,
});

impl CableMaster {
    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.state.muted = muted;
        Ok(())
    }

    fn process(&mut self, _args: &ProcessArgs) {
        let level = self.params.level.clamp(0.0, 2.0);
        let channels = self.inputs.chain_in.channels().max(1);

        let mut out = [0.0f32; PORT_MAX_CHANNELS];
        if !self.state.muted {
            for (c, lane) in out.iter_mut().enumerate().take(channels) {
                *lane = decode(self.inputs.chain_in.get(c))
                    * level
                    * cv_fader(&self.inputs.level_cv, c);
            }
        }
        self.outputs.out.write_voltages(&out, channels);
    }

    fn light(&self, light: LightId) -> f32 {
        match light {
            LightId::Mute => mute_light(&self.state),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, MessageHandler, RackModule, Vec2};
    use serde_json::json;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    fn args() -> ProcessArgs {
        ProcessArgs::new(48000.0, 0, Vec2::default())
    }

    #[test]
    fn test_two_strips_into_master() {
        let mut first = CableStrip::default();
        let mut second = CableStrip::default();
        let mut master = CableMaster::default();

        first.set_input("in", PolyInput::mono(3.0)).unwrap();
        first.process(&args());
        second.set_input("in", PolyInput::mono(2.0)).unwrap();
        second
            .set_input("chain-in", first.get_output("chain-out").unwrap().into())
            .unwrap();
        second.process(&args());
        master
            .set_input("chain-in", second.get_output("chain-out").unwrap().into())
            .unwrap();
        master.process(&args());

        let out = master.get_output("out").unwrap();
        assert!(approx_eq(out.get(0), 5.0, 1e-5), "expected 5V, got {}", out.get(0));
    }

    #[test]
    fn test_chain_takes_wider_channel_count() {
        let mut strip = CableStrip::default();
        strip.set_input("in", PolyInput::mono(1.0)).unwrap();
        strip
            .set_input("chain-in", PolyInput::poly(&[0.0, 0.5, 0.25]))
            .unwrap();
        strip.process(&args());
        let chain = strip.get_output("chain-out").unwrap();
        assert_eq!(chain.channels(), 3);
        assert!(approx_eq(chain.get(0), 1.0 / 16.0, 1e-6));
        assert_eq!(chain.get(2), 0.25);
    }

    #[test]
    fn test_strip_level_cv_and_mute() {
        let mut strip = CableStrip::default();
        strip.try_update_params(json!({"level": 0.5})).unwrap();
        strip.set_input("in", PolyInput::poly(&[4.0, 4.0])).unwrap();
        strip.set_input("level-cv", PolyInput::poly(&[10.0, 5.0])).unwrap();
        strip.process(&args());
        let out = strip.get_output("out").unwrap();
        assert!(approx_eq(out.get(0), 1.0, 1e-6));
        assert!(approx_eq(out.get(1), 0.5, 1e-6));

        strip.handle_message(&Message::SetMuted(true)).unwrap();
        strip.process(&args());
        assert_eq!(strip.get_output("out").unwrap().get(0), 0.0);
        assert_eq!(strip.get_output("chain-out").unwrap().get(0), 0.0);
        assert_eq!(strip.light(LightId::Mute), 1.0);
    }

    #[test]
    fn test_master_clamps_and_mutes() {
        let mut master = CableMaster::default();
        master.set_input("chain-in", PolyInput::mono(2.0)).unwrap();
        master.process(&args());
        assert_eq!(master.get_output("out").unwrap().get(0), 12.0);

        master.set_state(json!({"muted": true})).unwrap();
        master.process(&args());
        let out = master.get_output("out").unwrap();
        assert_eq!(out.channels(), 1);
        assert_eq!(out.get(0), 0.0);
    }

    #[test]
    fn test_missing_state_keys_default() {
        let mut master = CableMaster::default();
        master.set_state(json!({})).unwrap();
        assert_eq!(master.get_state().unwrap(), json!({"muted": false}));
    }
}
