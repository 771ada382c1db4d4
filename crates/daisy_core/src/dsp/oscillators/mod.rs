use std::collections::HashMap;

use crate::types::{Module, ModuleConstructor, ModuleSchema};

pub mod horsehair;

pub fn install_constructors(map: &mut HashMap<String, ModuleConstructor>) {
    horsehair::Horsehair::install_constructor(map);
}

pub fn schemas() -> Vec<ModuleSchema> {
    vec![horsehair::Horsehair::get_schema()]
}
