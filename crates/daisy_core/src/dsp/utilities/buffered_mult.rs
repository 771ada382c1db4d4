use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    poly::{PolyInput, PolyOutput},
    types::ProcessArgs,
};

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct BufferedMultParams {
    /// Outputs 4-6 follow input 2. When off they copy input 1.
    unconnect: bool,
}

impl Default for BufferedMultParams {
    fn default() -> Self {
        Self { unconnect: true }
    }
}

#[derive(Inputs)]
struct BufferedMultInputs {
    #[input("in-1", "feeds outputs 1-3")]
    in_1: PolyInput,
    #[input("in-2", "feeds outputs 4-6")]
    in_2: PolyInput,
}

#[derive(Outputs)]
struct BufferedMultOutputs {
    #[output("out-1", "copy of input 1", default)]
    out_1: PolyOutput,
    #[output("out-2")]
    out_2: PolyOutput,
    #[output("out-3")]
    out_3: PolyOutput,
    #[output("out-4")]
    out_4: PolyOutput,
    #[output("out-5")]
    out_5: PolyOutput,
    #[output("out-6")]
    out_6: PolyOutput,
}

#[derive(Default, Module)]
#[module("bufferedMult", "Two buffered 1-to-3 multiples", width = 2)]
pub struct BufferedMult {
    outputs: BufferedMultOutputs,
    inputs: BufferedMultInputs,
    params: BufferedMultParams,
}

message_handlers!(impl BufferedMult {});

fn copy_input(input: &PolyInput) -> PolyOutput {
    let mut out = PolyOutput::default();
    out.set_channels(input.channels());
    for c in 0..input.channels() {
        out.set(c, input.get(c));
    }
    out
}

impl BufferedMult {
    fn process(&mut self, _args: &ProcessArgs) {
        let a = copy_input(&self.inputs.in_1);
        let b = if self.params.unconnect {
            copy_input(&self.inputs.in_2)
        } else {
            a
        };

        let o = &mut self.outputs;
        o.out_1 = a;
        o.out_2 = a;
        o.out_3 = a;
        o.out_4 = b;
        o.out_5 = b;
        o.out_6 = b;
    }
}
