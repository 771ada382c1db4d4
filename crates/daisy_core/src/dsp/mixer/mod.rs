use std::collections::HashMap;

use crate::types::{Module, ModuleConstructor, ModuleSchema};

pub mod aux_send;
pub mod channel_strip;
pub mod master;
pub mod separator;
pub mod vu_meter;

pub use aux_send::AuxSendGroup;
pub use channel_strip::ChannelStrip;
pub use master::Master;
pub use separator::Separator;
pub use vu_meter::ChannelStripVu;

pub fn install_constructors(map: &mut HashMap<String, ModuleConstructor>) {
    channel_strip::ChannelStrip::install_constructor(map);
    vu_meter::ChannelStripVu::install_constructor(map);
    aux_send::AuxSendGroup::install_constructor(map);
    separator::Separator::install_constructor(map);
    master::Master::install_constructor(map);
}

pub fn schemas() -> Vec<ModuleSchema> {
    vec![
        channel_strip::ChannelStrip::get_schema(),
        vu_meter::ChannelStripVu::get_schema(),
        aux_send::AuxSendGroup::get_schema(),
        separator::Separator::get_schema(),
        master::Master::get_schema(),
    ]
}
