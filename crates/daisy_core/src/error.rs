use thiserror::Error;

use crate::rack::{GridPos, ModuleId};

/// Errors from host-level rack operations. Nothing on the per-sample path
/// produces these.
#[derive(Error, Debug)]
pub enum RackError {
    #[error("no module with id {0}")]
    UnknownModule(ModuleId),

    #[error("module {id} ({model}) has no port named {port}")]
    UnknownPort {
        id: ModuleId,
        model: &'static str,
        port: String,
    },

    #[error("slot at column {} row {} overlaps module {occupant}", .pos.col, .pos.row)]
    SlotOccupied { pos: GridPos, occupant: ModuleId },

    #[error("module {id} ({model}) does not handle {message}")]
    UnhandledMessage {
        id: ModuleId,
        model: &'static str,
        message: String,
    },

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Module(#[from] anyhow::Error),
}

/// Failures of the master's "spawn channel strips" action.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("model {0} is not registered")]
    UnknownModel(String),

    #[error("module {0} is not a master")]
    NotAMaster(ModuleId),

    #[error("could not place module: {0}")]
    Placement(String),

    #[error("spawn aborted after placing {placed} of {requested} modules: {source}")]
    Aborted {
        placed: usize,
        requested: usize,
        #[source]
        source: Box<SpawnError>,
    },
}

pub type RackResult<T> = Result<T, RackError>;
