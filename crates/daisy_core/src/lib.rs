//! Daisy-chain mixer core library
//!
//! Channel strips, aux send groups, VU meters, separators and a master pass an
//! accumulating stereo mix to each other through neighbor mailboxes, with no
//! central mixer object. A reference rack host drives them one sample at a time.

#[macro_use]
extern crate daisy_derive;

extern crate serde;
extern crate serde_json;

pub mod chain;
pub mod dsp;
pub mod error;
pub mod poly;
pub mod rack;
pub mod registry;
pub mod types;

pub use poly::PORT_MAX_CHANNELS;

// Re-export commonly used items
pub use chain::{ChainMessage, ParticipantKind, StereoVoltageBuffer};
pub use error::{RackError, SpawnError};
pub use rack::{GridPos, ModuleId, ProcessOrder, Rack, RackPatch};
pub use registry::ModuleRegistry;
pub use types::{LightId, Message, ModuleSchema, ProcessArgs, RackModule, Vec2};
