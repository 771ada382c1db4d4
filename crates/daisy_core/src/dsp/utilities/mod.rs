use std::collections::HashMap;

use crate::types::{Module, ModuleConstructor, ModuleSchema};

pub mod blank;
pub mod buffered_mult;
pub mod cable_chain;
pub mod master_mixer;
pub mod unity_mix;

pub fn install_constructors(map: &mut HashMap<String, ModuleConstructor>) {
    unity_mix::UnityMix::install_constructor(map);
    master_mixer::MasterMixer::install_constructor(map);
    buffered_mult::BufferedMult::install_constructor(map);
    blank::Blank1::install_constructor(map);
    blank::Blank3::install_constructor(map);
    blank::Blank5::install_constructor(map);
    cable_chain::CableStrip::install_constructor(map);
    cable_chain::CableMaster::install_constructor(map);
}

pub fn schemas() -> Vec<ModuleSchema> {
    vec![
        unity_mix::UnityMix::get_schema(),
        master_mixer::MasterMixer::get_schema(),
        buffered_mult::BufferedMult::get_schema(),
        blank::Blank1::get_schema(),
        blank::Blank3::get_schema(),
        blank::Blank5::get_schema(),
        cable_chain::CableStrip::get_schema(),
        cable_chain::CableMaster::get_schema(),
    ]
}
