//! The master's "spawn channel strips" menu action.
//!
//! Runs against whatever host implements [`ModulePlacer`]. Modules are placed
//! one at a time; a failure stops the run and leaves the modules already
//! placed where they are.

use serde::{Deserialize, Serialize};

use super::message::AuxBus;
use crate::error::SpawnError;
use crate::rack::{GridPos, ModuleId};
use crate::types::Message;

pub const CHANNEL_STRIP_MODEL: &str = "channelStrip";
pub const CHANNEL_STRIP_VU_MODEL: &str = "channelStripVu";
pub const AUX_SEND_GROUP_MODEL: &str = "auxSendGroup";
pub const SEPARATOR_MODEL: &str = "separator";
pub const MASTER_MODEL: &str = "master";

/// Host facility for inserting modules into the rack.
pub trait ModulePlacer {
    fn position_of(&self, id: ModuleId) -> Option<GridPos>;
    fn width_of(&self, id: ModuleId) -> Option<u32>;
    /// Insert `model` at the nearest valid slot to `at`, making room to the
    /// right. Each placement is a separate undoable action.
    fn place_module(&mut self, model: &str, at: GridPos) -> Result<ModuleId, SpawnError>;
    fn send_message(&mut self, id: ModuleId, message: Message) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpawnRequest {
    pub strips: usize,
    pub with_vu: bool,
    pub aux_sends: bool,
}

impl Default for SpawnRequest {
    fn default() -> Self {
        Self {
            strips: 4,
            with_vu: false,
            aux_sends: false,
        }
    }
}

/// Where a planned module goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// At the run cursor, which starts at the chain origin
    ChainOrigin,
    /// Immediately left of the master
    BeforeMaster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedModule {
    pub model: &'static str,
    pub anchor: Anchor,
    pub group: Option<AuxBus>,
}

impl SpawnRequest {
    pub fn plan(&self) -> Vec<PlannedModule> {
        let mut plan = Vec::with_capacity(self.strips * 2 + 2);
        for _ in 0..self.strips {
            plan.push(PlannedModule {
                model: CHANNEL_STRIP_MODEL,
                anchor: Anchor::ChainOrigin,
                group: None,
            });
            if self.with_vu {
                plan.push(PlannedModule {
                    model: CHANNEL_STRIP_VU_MODEL,
                    anchor: Anchor::ChainOrigin,
                    group: None,
                });
            }
        }
        if self.aux_sends {
            for group in [AuxBus::One, AuxBus::Two] {
                plan.push(PlannedModule {
                    model: AUX_SEND_GROUP_MODEL,
                    anchor: Anchor::BeforeMaster,
                    group: Some(group),
                });
            }
        }
        plan
    }
}

/// Execute `request` for the master `master`, whose chain starts at `origin`.
/// Returns the ids of the placed modules in placement order.
pub fn spawn_run<P: ModulePlacer + ?Sized>(
    placer: &mut P,
    master: ModuleId,
    origin: GridPos,
    request: &SpawnRequest,
) -> Result<Vec<ModuleId>, SpawnError> {
    let plan = request.plan();
    let mut placed = Vec::with_capacity(plan.len());
    let mut cursor = origin;

    for step in &plan {
        match place_step(placer, master, &mut cursor, step) {
            Ok(id) => {
                tracing::debug!(model = step.model, id, "spawned chain module");
                placed.push(id);
            }
            Err(err) => {
                tracing::warn!(
                    model = step.model,
                    placed = placed.len(),
                    requested = plan.len(),
                    "spawn aborted: {}",
                    err
                );
                return Err(SpawnError::Aborted {
                    placed: placed.len(),
                    requested: plan.len(),
                    source: Box::new(err),
                });
            }
        }
    }

    tracing::info!(count = placed.len(), master, "spawned channel strips");
    Ok(placed)
}

fn place_step<P: ModulePlacer + ?Sized>(
    placer: &mut P,
    master: ModuleId,
    cursor: &mut GridPos,
    step: &PlannedModule,
) -> Result<ModuleId, SpawnError> {
    let at = match step.anchor {
        Anchor::ChainOrigin => *cursor,
        Anchor::BeforeMaster => placer
            .position_of(master)
            .ok_or(SpawnError::NotAMaster(master))?,
    };

    let id = placer.place_module(step.model, at)?;

    if step.anchor == Anchor::ChainOrigin {
        if let (Some(pos), Some(width)) = (placer.position_of(id), placer.width_of(id)) {
            *cursor = GridPos {
                col: pos.col + width as i32,
                row: pos.row,
            };
        }
    }

    if let Some(group) = step.group {
        if let Err(err) = placer.send_message(id, Message::SetGroup(group)) {
            tracing::warn!(id, "could not assign aux group: {}", err);
        }
    }

    Ok(id)
}
