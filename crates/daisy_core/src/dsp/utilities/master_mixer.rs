use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    poly::{PORT_MAX_CHANNELS, PolyInput, PolyOutput},
    types::ProcessArgs,
};

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct MasterMixerParams {
    /// Mix level, 0..2
    level: f32,
    /// Channel levels, 0..√2, squared before use
    level1: f32,
    level2: f32,
    /// Sum both channels onto both outputs even when two inputs are patched
    mono: bool,
}

impl Default for MasterMixerParams {
    fn default() -> Self {
        Self {
            level: 1.0,
            level1: 1.0,
            level2: 1.0,
            mono: true,
        }
    }
}

#[derive(Inputs)]
struct MasterMixerInputs {
    #[input("in-1", "channel 1")]
    in_1: PolyInput,
    #[input("in-2", "channel 2")]
    in_2: PolyInput,
    #[input("mix-cv", "mix level CV, 0..10V")]
    mix_cv: PolyInput,
}

#[derive(Outputs)]
struct MasterMixerOutputs {
    #[output("mix-1", "mix out (left in stereo mode)", default)]
    mix_1: PolyOutput,
    #[output("mix-2", "mix out (right in stereo mode)")]
    mix_2: PolyOutput,
    #[output("out-1", "channel 1 after its level")]
    out_1: PolyOutput,
    #[output("out-2", "channel 2 after its level")]
    out_2: PolyOutput,
}

/// Two-channel polyphonic mixer with a stereo mode.
#[derive(Default, Module)]
#[module("masterMixer", "Two-channel polyphonic mixer", width = 5)]
pub struct MasterMixer {
    outputs: MasterMixerOutputs,
    inputs: MasterMixerInputs,
    params: MasterMixerParams,
}

message_handlers!(impl MasterMixer {});

impl MasterMixer {
    fn process(&mut self, _args: &ProcessArgs) {
        let max_level = std::f32::consts::SQRT_2;
        let gains = [
            self.params.level1.clamp(0.0, max_level).powi(2),
            self.params.level2.clamp(0.0, max_level).powi(2),
        ];

        let mut channel_out = [[0.0f32; PORT_MAX_CHANNELS]; 2];
        let mut channel_count = [1usize; 2];
        let mut max_channels = 1;

        for (i, input) in [&self.inputs.in_1, &self.inputs.in_2].into_iter().enumerate() {
            if input.is_connected() {
                channel_count[i] = input.channels();
                max_channels = max_channels.max(input.channels());
                for c in 0..input.channels() {
                    channel_out[i][c] = input.get(c) * gains[i];
                }
            }
        }
        self.outputs.out_1.write_voltages(&channel_out[0], channel_count[0]);
        self.outputs.out_2.write_voltages(&channel_out[1], channel_count[1]);

        let master = self.params.level.clamp(0.0, 2.0);
        let cv_connected = self.inputs.mix_cv.is_connected();
        let stereo = !self.params.mono
            && self.inputs.in_1.is_connected()
            && self.inputs.in_2.is_connected();

        let mut left = [0.0f32; PORT_MAX_CHANNELS];
        let mut right = [0.0f32; PORT_MAX_CHANNELS];
        for c in 0..max_channels {
            let cv = if cv_connected {
                (self.inputs.mix_cv.get_value(c) / 10.0).clamp(0.0, 1.0)
            } else {
                1.0
            };
            let attenuate = master * cv;
            if stereo {
                left[c] = channel_out[0][c] * attenuate;
                right[c] = channel_out[1][c] * attenuate;
            } else {
                let sum = (channel_out[0][c] + channel_out[1][c]) * attenuate;
                left[c] = sum;
                right[c] = sum;
            }
        }
        self.outputs.mix_1.write_voltages(&left, max_channels);
        self.outputs.mix_2.write_voltages(&right, max_channels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RackModule, Vec2};
    use serde_json::json;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    fn step(mixer: &mut MasterMixer) {
        mixer.process(&ProcessArgs::new(48000.0, 0, Vec2::default()));
    }

    #[test]
    fn test_mono_mode_sums_to_both() {
        let mut mixer = MasterMixer::default();
        mixer.set_input("in-1", PolyInput::mono(1.0)).unwrap();
        mixer.set_input("in-2", PolyInput::mono(2.0)).unwrap();
        step(&mut mixer);
        assert!(approx_eq(mixer.get_output("mix-1").unwrap().get(0), 3.0, 1e-6));
        assert!(approx_eq(mixer.get_output("mix-2").unwrap().get(0), 3.0, 1e-6));
    }

    #[test]
    fn test_stereo_needs_both_inputs() {
        let mut mixer = MasterMixer::default();
        mixer.try_update_params(json!({"mono": false})).unwrap();
        mixer.set_input("in-1", PolyInput::mono(1.0)).unwrap();
        step(&mut mixer);
        assert!(approx_eq(mixer.get_output("mix-2").unwrap().get(0), 1.0, 1e-6));

        mixer.set_input("in-2", PolyInput::mono(2.0)).unwrap();
        step(&mut mixer);
        assert!(approx_eq(mixer.get_output("mix-1").unwrap().get(0), 1.0, 1e-6));
        assert!(approx_eq(mixer.get_output("mix-2").unwrap().get(0), 2.0, 1e-6));
    }

    #[test]
    fn test_levels_and_poly_cv() {
        let mut mixer = MasterMixer::default();
        mixer
            .try_update_params(json!({"level": 2.0, "level1": 0.5}))
            .unwrap();
        mixer.set_input("in-1", PolyInput::poly(&[4.0, 4.0])).unwrap();
        mixer.set_input("mix-cv", PolyInput::poly(&[10.0, 5.0])).unwrap();
        step(&mut mixer);
        let out = mixer.get_output("mix-1").unwrap();
        assert_eq!(out.channels(), 2);
        assert!(approx_eq(out.get(0), 2.0, 1e-6));
        assert!(approx_eq(out.get(1), 1.0, 1e-6));
        assert!(approx_eq(mixer.get_output("out-1").unwrap().get(0), 1.0, 1e-6));
    }
}
