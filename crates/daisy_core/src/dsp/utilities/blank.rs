//! Plain blank panels. They carry no ports and take no part in the chain, so
//! one placed between participants splits the chain in two.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::ProcessArgs;

#[derive(Default, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct BlankParams {}

#[derive(Inputs)]
struct BlankInputs {}

#[derive(Outputs)]
struct BlankOutputs {}

#[derive(Default, Module)]
#[module("blank1", "1 HP blank panel", width = 1)]
pub struct Blank1 {
    outputs: BlankOutputs,
    inputs: BlankInputs,
    params: BlankParams,
}

#[derive(Default, Module)]
#[module("blank3", "3 HP blank panel", width = 3)]
pub struct Blank3 {
    outputs: BlankOutputs,
    inputs: BlankInputs,
    params: BlankParams,
}

#[derive(Default, Module)]
#[module("blank5", "5 HP blank panel", width = 5)]
pub struct Blank5 {
    outputs: BlankOutputs,
    inputs: BlankInputs,
    params: BlankParams,
}

message_handlers!(impl Blank1 {});
message_handlers!(impl Blank3 {});
message_handlers!(impl Blank5 {});

impl Blank1 {
    fn process(&mut self, _args: &ProcessArgs) {}
}

impl Blank3 {
    fn process(&mut self, _args: &ProcessArgs) {}
}

impl Blank5 {
    fn process(&mut self, _args: &ProcessArgs) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RackModule;

    #[test]
    fn test_widths_and_no_ports() {
        let blanks: [Box<dyn RackModule>; 3] = [
            Box::new(Blank1::default()),
            Box::new(Blank3::default()),
            Box::new(Blank5::default()),
        ];
        let widths: Vec<u32> = blanks.iter().map(|b| b.width_hp()).collect();
        assert_eq!(widths, vec![1, 3, 5]);
        for blank in &blanks {
            assert!(blank.participant().is_none());
            assert!(blank.get_output("out").is_err());
        }
    }
}
