//! Channel strip - one stereo channel of the chained mixer.
//!
//! Applies squared level and constant-power pan to its inputs, then an
//! optional level CV fader. The result goes out the direct outs and, scaled
//! down by the chain divisor, onto the mix bus handed to the right neighbor.
//! Aux sends tap the signal after gain/pan and before the fader.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{AuxBus, CHAIN_DIVISOR, ChainIo, ChainLink, ParticipantKind, StereoVoltageBuffer},
    dsp::utils::pan_gains,
    poly::{PORT_MAX_CHANNELS, PolyInput, PolyOutput},
    types::{Clickless, LightId, ProcessArgs, StripMode, deserialize_unit},
};

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct ChannelStripParams {
    /// Channel level knob, 0..1, squared before use
    level: f32,
    /// Pan position, -1 (left) to +1 (right)
    pan: f32,
}

impl Default for ChannelStripParams {
    fn default() -> Self {
        Self {
            level: 1.0,
            pan: 0.0,
        }
    }
}

/// Persisted switch and menu state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelStripState {
    pub muted: bool,
    pub solo: bool,
    pub direct_outs_prefader: bool,
    pub level_slew: bool,
    #[serde(deserialize_with = "deserialize_unit")]
    pub aux1_send_amt: f32,
    #[serde(deserialize_with = "deserialize_unit")]
    pub aux2_send_amt: f32,
}

impl ChannelStripState {
    pub fn mode(&self) -> StripMode {
        if self.muted {
            StripMode::Mute
        } else if self.solo {
            StripMode::Solo
        } else {
            StripMode::Normal
        }
    }

    fn send_amount(&self, bus: AuxBus) -> f32 {
        match bus {
            AuxBus::One => self.aux1_send_amt,
            AuxBus::Two => self.aux2_send_amt,
        }
    }
}

#[derive(Inputs)]
struct ChannelStripInputs {
    #[input("in-l", "left input")]
    in_l: PolyInput,
    #[input("in-r", "right input, normalled to left")]
    in_r: PolyInput,
    #[input("level-cv", "level CV, 0..10V")]
    level_cv: PolyInput,
}

#[derive(Outputs)]
struct ChannelStripOutputs {
    #[output("out-l", "left direct out", default)]
    out_l: PolyOutput,
    #[output("out-r", "right direct out")]
    out_r: PolyOutput,
}

#[derive(Module)]
#[module(
    "channelStrip",
    "Chained stereo channel strip with pan, mute/solo and two aux sends",
    width = 2,
    participant = ChannelStrip,
    lights
)]
#[stateful]
pub struct ChannelStrip {
    outputs: ChannelStripOutputs,
    inputs: ChannelStripInputs,
    params: ChannelStripParams,
    state: ChannelStripState,
    link: ChainLink,
    cv_slew: [Clickless; PORT_MAX_CHANNELS],
    strip_index: u32,
}

impl Default for ChannelStrip {
    fn default() -> Self {
        Self {
            outputs: Default::default(),
            inputs: Default::default(),
            params: Default::default(),
            state: Default::default(),
            link: ChainLink::new(ParticipantKind::ChannelStrip),
            cv_slew: [Clickless::from(1.0); PORT_MAX_CHANNELS],
            strip_index: 1,
        }
    }
}

message_handlers!(impl ChannelStrip {
    SetStripMode(mode) => ChannelStrip::set_mode,
    SetMuted(muted) => ChannelStrip::set_muted,
    SetAuxSend(bus, amount) => ChannelStrip::set_aux_send,
    SetDirectOutsPrefader(enabled) => ChannelStrip::set_direct_outs_prefader,
    SetLevelSlew(enabled) => ChannelStrip::set_level_slew,
});

impl ChannelStrip {
    pub fn state(&self) -> &ChannelStripState {
        &self.state
    }

    /// Position in the chain as of the last tick, 1 at the head.
    pub fn strip_index(&self) -> u32 {
        self.strip_index
    }

    fn set_mode(&mut self, mode: StripMode) -> Result<()> {
        self.state.muted = mode == StripMode::Mute;
        self.state.solo = mode == StripMode::Solo;
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.state.muted = muted;
        if muted {
            self.state.solo = false;
        }
        Ok(())
    }

    fn set_aux_send(&mut self, bus: AuxBus, amount: f32) -> Result<()> {
        let amount = if amount.is_finite() {
            amount.clamp(0.0, 1.0)
        } else {
            0.0
        };
        match bus {
            AuxBus::One => self.state.aux1_send_amt = amount,
            AuxBus::Two => self.state.aux2_send_amt = amount,
        }
        Ok(())
    }

    fn set_direct_outs_prefader(&mut self, enabled: bool) -> Result<()> {
        self.state.direct_outs_prefader = enabled;
        Ok(())
    }

    fn set_level_slew(&mut self, enabled: bool) -> Result<()> {
        self.state.level_slew = enabled;
        Ok(())
    }

    fn process(&mut self, args: &ProcessArgs, mut chain: Option<&mut ChainIo<'_>>) {
        let mut msg = self.link.receive(args, chain.as_deref_mut());
        self.strip_index = msg.strip_index;

        let muted = self.state.muted;
        let soloed = self.state.solo && !muted;

        let channels = self
            .inputs
            .in_l
            .channels()
            .max(self.inputs.in_r.channels())
            .max(1);

        let gain = self.params.level.clamp(0.0, 1.0).powi(2);
        let (pan_l, pan_r) = pan_gains(self.params.pan);
        let cv_connected = self.inputs.level_cv.is_connected();
        let right_normalled = self.inputs.in_r.is_disconnected();

        let mut prefader = StereoVoltageBuffer::with_channels(channels);
        let mut local = StereoVoltageBuffer::with_channels(channels);

        for c in 0..channels {
            let in_l = self.inputs.in_l.get(c);
            let in_r = if right_normalled {
                in_l
            } else {
                self.inputs.in_r.get(c)
            };
            let pre_l = in_l * gain * pan_l;
            let pre_r = in_r * gain * pan_r;

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

            prefader.set(c, pre_l, pre_r);
            if !muted {
                local.set(c, pre_l * fader, pre_r * fader);
            }
        }

        let direct = if self.state.direct_outs_prefader {
            &prefader
        } else {
            &local
        };
        direct.write_outputs(&mut self.outputs.out_l, &mut self.outputs.out_r);
        msg.single = *direct;

        msg.mix.combine_with(&local, 1.0 / CHAIN_DIVISOR);
        if soloed {
            msg.solo.combine_with(&local, 1.0 / CHAIN_DIVISOR);
            msg.soloists += 1;
        }
        if !muted {
            for bus in [AuxBus::One, AuxBus::Two] {
                let amount = self.state.send_amount(bus);
                if amount > 0.0 {
                    msg.aux_mut(bus)
                        .combine_with(&prefader, amount / CHAIN_DIVISOR);
                }
            }
        }
        msg.strip_index = self.strip_index + 1;

        self.link.forward(chain, &msg);
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
            LightId::Solo => {
                if self.state.solo && !self.state.muted {
                    1.0
                } else {
                    0.0
                }
            }
            other => self.link.light(other),
        }
    }
}
