use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{poly::PolyInput, types::ProcessArgs};

/// Each connected input counts this much towards the divisor, so a group of
/// inputs comes out slightly hotter than a plain average.
const INPUT_WEIGHT: f32 = 0.9;

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct UnityMixParams {
    /// Keep group B separate from group A. When off, all six inputs are
    /// mixed together onto both outputs.
    unconnect: bool,
}

impl Default for UnityMixParams {
    fn default() -> Self {
        Self { unconnect: true }
    }
}

#[derive(Inputs)]
struct UnityMixInputs {
    #[input("in-1")]
    in_1: PolyInput,
    #[input("in-2")]
    in_2: PolyInput,
    #[input("in-3")]
    in_3: PolyInput,
    #[input("in-4")]
    in_4: PolyInput,
    #[input("in-5")]
    in_5: PolyInput,
    #[input("in-6")]
    in_6: PolyInput,
}

#[derive(Outputs)]
struct UnityMixOutputs {
    #[output("out-a", "mix of inputs 1-3", default)]
    out_a: f32,
    #[output("out-b", "mix of inputs 4-6")]
    out_b: f32,
}

#[derive(Default, Module)]
#[module("unityMix", "Two three-input unity mixers", width = 3)]
pub struct UnityMix {
    outputs: UnityMixOutputs,
    inputs: UnityMixInputs,
    params: UnityMixParams,
}

message_handlers!(impl UnityMix {});

/// Weighted average of the connected inputs, 0 when none are connected.
fn unity_average(inputs: &[&PolyInput]) -> f32 {
    let (sum, weight) = inputs
        .iter()
        .filter(|input| input.is_connected())
        .fold((0.0, 0.0), |(sum, weight), input| {
            (sum + input.get(0), weight + INPUT_WEIGHT)
        });
    if weight > 0.0 { sum / weight } else { 0.0 }
}

impl UnityMix {
    fn process(&mut self, _args: &ProcessArgs) {
        let i = &self.inputs;
        let group_a = [&i.in_1, &i.in_2, &i.in_3];
        let group_b = [&i.in_4, &i.in_5, &i.in_6];

        if self.params.unconnect {
            self.outputs.out_a = unity_average(&group_a);
            self.outputs.out_b = unity_average(&group_b);
        } else {
            let all = [&i.in_1, &i.in_2, &i.in_3, &i.in_4, &i.in_5, &i.in_6];
            let mix = unity_average(&all);
            self.outputs.out_a = mix;
            self.outputs.out_b = mix;
        }
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

    fn step(mix: &mut UnityMix) -> (f32, f32) {
        mix.process(&ProcessArgs::new(48000.0, 0, Vec2::default()));
        (
            mix.get_output("out-a").unwrap().get(0),
            mix.get_output("out-b").unwrap().get(0),
        )
    }

    #[test]
    fn test_groups_are_independent() {
        let mut mix = UnityMix::default();
        mix.set_input("in-1", PolyInput::mono(0.9)).unwrap();
        mix.set_input("in-2", PolyInput::mono(0.9)).unwrap();
        mix.set_input("in-5", PolyInput::mono(1.8)).unwrap();
        let (a, b) = step(&mut mix);
        assert!(approx_eq(a, 1.0, 1e-6), "group A {}", a);
        assert!(approx_eq(b, 2.0, 1e-6), "group B {}", b);
    }

    #[test]
    fn test_disconnected_is_silent() {
        let mut mix = UnityMix::default();
        assert_eq!(step(&mut mix), (0.0, 0.0));
    }

    #[test]
    fn test_connected_mode_mixes_everything() {
        let mut mix = UnityMix::default();
        mix.try_update_params(json!({"unconnect": false})).unwrap();
        mix.set_input("in-1", PolyInput::mono(0.9)).unwrap();
        mix.set_input("in-6", PolyInput::mono(2.7)).unwrap();
        let (a, b) = step(&mut mix);
        assert!(approx_eq(a, 2.0, 1e-5), "got {}", a);
        assert_eq!(a, b);
    }
}
