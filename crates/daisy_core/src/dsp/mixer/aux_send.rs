//! Aux send group - taps one of the two aux buses out of the chain.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    chain::{AuxBus, ChainIo, ChainLink, ParticipantKind, decode_buffer},
    poly::PolyOutput,
    types::{LightId, ProcessArgs},
};

#[derive(Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct AuxSendGroupParams {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxSendGroupState {
    pub group: AuxBus,
}

#[derive(Inputs)]
struct AuxSendGroupInputs {}

#[derive(Outputs)]
struct AuxSendGroupOutputs {
    #[output("out-l", "left aux return", default)]
    out_l: PolyOutput,
    #[output("out-r", "right aux return")]
    out_r: PolyOutput,
}

#[derive(Module)]
#[module(
    "auxSendGroup",
    "Outputs the selected aux bus of the chain",
    width = 2,
    participant = AuxSendGroup,
    lights
)]
#[stateful]
pub struct AuxSendGroup {
    outputs: AuxSendGroupOutputs,
    inputs: AuxSendGroupInputs,
    params: AuxSendGroupParams,
    state: AuxSendGroupState,
    link: ChainLink,
}

impl Default for AuxSendGroup {
    fn default() -> Self {
        Self {
            outputs: Default::default(),
            inputs: Default::default(),
            params: Default::default(),
            state: Default::default(),
            link: ChainLink::new(ParticipantKind::AuxSendGroup),
        }
    }
}

message_handlers!(impl AuxSendGroup {
    SetGroup(group) => AuxSendGroup::set_group,
    CycleGroup => AuxSendGroup::cycle_group,
});

impl AuxSendGroup {
    pub fn group(&self) -> AuxBus {
        self.state.group
    }

    fn set_group(&mut self, group: AuxBus) -> Result<()> {
        self.state.group = group;
        Ok(())
    }

    fn cycle_group(&mut self) -> Result<()> {
        self.state.group = self.state.group.next();
        Ok(())
    }

    fn process(&mut self, args: &ProcessArgs, mut chain: Option<&mut ChainIo<'_>>) {
        let mut msg = self.link.receive(args, chain.as_deref_mut());

        let output = decode_buffer(msg.aux(self.state.group));
        output.write_outputs(&mut self.outputs.out_l, &mut self.outputs.out_r);
        msg.single = output;

        self.link.forward(chain, &msg);
    }

    fn light(&self, light: LightId) -> f32 {
        self.link.light(light)
    }
}
