use std::collections::HashMap;

use crate::types::{ModuleConstructor, ModuleSchema};

pub mod mixer;
pub mod oscillators;
pub mod utilities;
pub mod utils;

pub fn get_constructors() -> HashMap<String, ModuleConstructor> {
    let mut map = HashMap::new();
    mixer::install_constructors(&mut map);
    oscillators::install_constructors(&mut map);
    utilities::install_constructors(&mut map);
    map
}

pub fn schema() -> Vec<ModuleSchema> {
    [mixer::schemas(), oscillators::schemas(), utilities::schemas()].concat()
}
