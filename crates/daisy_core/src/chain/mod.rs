//! The daisy-chain bus: buffers, the message payload, the double-buffered
//! mailbox, neighbor compatibility, and the per-tick link shared by every
//! participant.

pub mod buffer;
pub mod link;
pub mod mailbox;
pub mod message;
pub mod provision;
pub mod topology;

pub use buffer::StereoVoltageBuffer;
pub use link::{ChainIo, ChainLink};
pub use mailbox::Mailbox;
pub use message::{AuxBus, CHAIN_DIVISOR, ChainMessage, decode, decode_buffer, encode};
pub use provision::{ModulePlacer, SpawnRequest, spawn_run};
pub use topology::{Neighbor, ParticipantKind};
