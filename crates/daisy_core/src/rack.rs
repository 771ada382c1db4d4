//! Reference rack host.
//!
//! Modules live in an arena of slots on a grid of HP columns and rows.
//! Neighbors are modules in the same row whose panel edges touch. Every chain
//! participant owns one [`Mailbox`] in a parallel arena indexed by module id,
//! and the host lends a participant its own inbox plus its right neighbor's
//! for the duration of one tick.
//!
//! Cables are routed once per frame before any module runs, so a cable adds
//! one sample of latency.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chain::{ChainIo, Mailbox, ModulePlacer, Neighbor, SpawnRequest, spawn_run};
use crate::dsp::mixer::Master;
use crate::error::{RackError, RackResult, SpawnError};
use crate::poly::{PolyInput, PolyOutput};
use crate::registry::ModuleRegistry;
use crate::types::{LightId, Message, ProcessArgs, RackModule, Vec2};

pub type ModuleId = usize;

/// Pixel width of one HP column
pub const RACK_GRID_WIDTH: f32 = 15.0;
/// Pixel height of one rack row
pub const RACK_GRID_HEIGHT: f32 = 380.0;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub col: i32,
    pub row: i32,
}

impl GridPos {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn to_widget(self) -> Vec2 {
        Vec2::new(
            self.col as f32 * RACK_GRID_WIDTH,
            self.row as f32 * RACK_GRID_HEIGHT,
        )
    }

    /// Nearest grid position to a panel position.
    pub fn from_widget(position: Vec2) -> Self {
        Self {
            col: (position.x / RACK_GRID_WIDTH).round() as i32,
            row: (position.y / RACK_GRID_HEIGHT).round() as i32,
        }
    }
}

/// Order in which modules are ticked within a frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessOrder {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cable {
    pub from: ModuleId,
    pub output: String,
    pub to: ModuleId,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchModule {
    pub id: ModuleId,
    pub model: String,
    pub col: i32,
    pub row: i32,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
}

/// Serialized rack: module placement, knobs, persisted state and cables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RackPatch {
    pub sample_rate: f32,
    pub modules: Vec<PatchModule>,
    #[serde(default)]
    pub cables: Vec<Cable>,
}

struct Slot {
    module: Box<dyn RackModule>,
    pos: GridPos,
    width: u32,
}

impl Slot {
    fn right_edge(&self) -> i32 {
        self.pos.col + self.width as i32
    }

    fn covers(&self, pos: GridPos, width: u32) -> bool {
        self.pos.row == pos.row
            && self.pos.col < pos.col + width as i32
            && pos.col < self.right_edge()
    }
}

/// One undoable placement: the new module and where the modules it pushed aside used to be.
struct Placement {
    id: ModuleId,
    shifted: Vec<(ModuleId, GridPos)>,
}

pub struct Rack {
    registry: Arc<ModuleRegistry>,
    slots: Vec<Option<Slot>>,
    mailboxes: Vec<Option<Mailbox>>,
    neighbors: Vec<(Option<Neighbor>, Option<Neighbor>)>,
    layout_dirty: bool,
    cables: Vec<Cable>,
    history: Vec<Placement>,
    sample_rate: f32,
    frame: u64,
    order: ProcessOrder,
}

impl Rack {
    pub fn new(registry: Arc<ModuleRegistry>, sample_rate: f32) -> Self {
        Self {
            registry,
            slots: Vec::new(),
            mailboxes: Vec::new(),
            neighbors: Vec::new(),
            layout_dirty: true,
            cables: Vec::new(),
            history: Vec::new(),
            sample_rate,
            frame: 0,
            order: ProcessOrder::default(),
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn set_order(&mut self, order: ProcessOrder) {
        self.order = order;
    }

    /// Live module ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|_| id))
    }

    pub fn len(&self) -> usize {
        self.ids().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn module(&self, id: ModuleId) -> Option<&dyn RackModule> {
        self.slot(id).map(|slot| slot.module.as_ref())
    }

    pub fn cables(&self) -> &[Cable] {
        &self.cables
    }

    pub fn mailbox(&self, id: ModuleId) -> Option<&Mailbox> {
        self.mailboxes.get(id).and_then(Option::as_ref)
    }

    fn slot(&self, id: ModuleId) -> Option<&Slot> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: ModuleId) -> RackResult<&mut Slot> {
        self.slots
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(RackError::UnknownModule(id))
    }

    fn occupant(&self, pos: GridPos, width: u32) -> Option<ModuleId> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(id, slot)| match slot {
                Some(slot) if slot.covers(pos, width) => Some(id),
                _ => None,
            })
    }

    fn insert_slot(&mut self, module: Box<dyn RackModule>, pos: GridPos) -> ModuleId {
        let id = self.slots.len();
        let width = module.width_hp();
        let mailbox = module.participant().map(|_| Mailbox::new());
        tracing::debug!(id, model = module.model(), col = pos.col, row = pos.row, "module added");
        self.slots.push(Some(Slot { module, pos, width }));
        self.mailboxes.push(mailbox);
        self.layout_dirty = true;
        id
    }

    /// Put `model` exactly at `pos`. Fails if the panel would overlap another.
    pub fn add_module(&mut self, model: &str, pos: GridPos) -> RackResult<ModuleId> {
        let module = self.registry.create(model)?;
        if let Some(occupant) = self.occupant(pos, module.width_hp()) {
            return Err(RackError::SlotOccupied { pos, occupant });
        }
        Ok(self.insert_slot(module, pos))
    }

    /// Remove a module and every cable attached to it.
    pub fn remove_module(&mut self, id: ModuleId) -> RackResult<Box<dyn RackModule>> {
        let slot = self
            .slots
            .get_mut(id)
            .and_then(Option::take)
            .ok_or(RackError::UnknownModule(id))?;
        self.mailboxes[id] = None;
        self.layout_dirty = true;

        let (attached, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.cables)
            .into_iter()
            .partition(|c| c.from == id || c.to == id);
        self.cables = kept;
        for cable in attached.iter().filter(|c| c.to != id) {
            if let Some(Some(target)) = self.slots.get_mut(cable.to) {
                let _ = target.module.set_input(&cable.input, PolyInput::default());
            }
        }

        tracing::debug!(id, model = slot.module.model(), "module removed");
        Ok(slot.module)
    }

    pub fn position_of(&self, id: ModuleId) -> Option<GridPos> {
        self.slot(id).map(|slot| slot.pos)
    }

    pub fn width_of(&self, id: ModuleId) -> Option<u32> {
        self.slot(id).map(|slot| slot.width)
    }

    /// Insert `model` at the nearest valid column to `at`, pushing modules at or
    /// after that column in the row to the right. Recorded for [`Rack::undo`].
    pub fn place_module(&mut self, model: &str, at: GridPos) -> RackResult<ModuleId> {
        let module = self.registry.create(model)?;
        let width = module.width_hp() as i32;

        let mut pos = GridPos::new(at.col.max(0), at.row);
        // An insertion point inside a panel snaps to that panel's right edge
        if let Some(inside) = self.slots.iter().flatten().find(|s| {
            s.pos.row == pos.row && s.pos.col < pos.col && pos.col < s.right_edge()
        }) {
            pos.col = inside.right_edge();
        }

        let mut shifted = Vec::new();
        for (id, slot) in self.slots.iter_mut().enumerate() {
            if let Some(slot) = slot {
                if slot.pos.row == pos.row && slot.pos.col >= pos.col {
                    shifted.push((id, slot.pos));
                    slot.pos.col += width;
                }
            }
        }

        let id = self.insert_slot(module, pos);
        self.history.push(Placement { id, shifted });
        Ok(id)
    }

    /// Revert the last placement. Returns the id of the removed module.
    pub fn undo(&mut self) -> Option<ModuleId> {
        let placement = self.history.pop()?;
        if let Err(err) = self.remove_module(placement.id) {
            tracing::warn!("undo: {}", err);
        }
        for (id, pos) in placement.shifted {
            if let Ok(slot) = self.slot_mut(id) {
                slot.pos = pos;
            }
        }
        self.layout_dirty = true;
        Some(placement.id)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Patch `from.output` into `to.input`, replacing whatever fed that input.
    pub fn connect(
        &mut self,
        from: ModuleId,
        output: &str,
        to: ModuleId,
        input: &str,
    ) -> RackResult<()> {
        let source = self.slot(from).ok_or(RackError::UnknownModule(from))?;
        if source.module.get_output(output).is_err() {
            return Err(RackError::UnknownPort {
                id: from,
                model: source.module.model(),
                port: output.to_string(),
            });
        }
        let target = self.slot_mut(to)?;
        if target.module.set_input(input, PolyInput::default()).is_err() {
            return Err(RackError::UnknownPort {
                id: to,
                model: target.module.model(),
                port: input.to_string(),
            });
        }

        self.cables.retain(|c| !(c.to == to && c.input == input));
        self.cables.push(Cable {
            from,
            output: output.to_string(),
            to,
            input: input.to_string(),
        });
        tracing::debug!(from, output, to, input, "cable connected");
        Ok(())
    }

    /// Unpatch whatever feeds `to.input`. Returns whether there was a cable.
    pub fn disconnect(&mut self, to: ModuleId, input: &str) -> RackResult<bool> {
        let before = self.cables.len();
        self.cables.retain(|c| !(c.to == to && c.input == input));
        let removed = self.cables.len() != before;
        if removed {
            self.slot_mut(to)?
                .module
                .set_input(input, PolyInput::default())?;
            tracing::debug!(to, input, "cable disconnected");
        }
        Ok(removed)
    }

    /// Drive an input directly, as an external source would.
    pub fn set_input_voltage(&mut self, id: ModuleId, input: &str, value: PolyInput) -> RackResult<()> {
        let slot = self.slot_mut(id)?;
        let model = slot.module.model();
        slot.module
            .set_input(input, value)
            .map_err(|_| RackError::UnknownPort {
                id,
                model,
                port: input.to_string(),
            })
    }

    pub fn get_output(&self, id: ModuleId, output: &str) -> RackResult<PolyOutput> {
        let slot = self.slot(id).ok_or(RackError::UnknownModule(id))?;
        slot.module
            .get_output(output)
            .map_err(|_| RackError::UnknownPort {
                id,
                model: slot.module.model(),
                port: output.to_string(),
            })
    }

    pub fn update_params(&mut self, id: ModuleId, params: serde_json::Value) -> RackResult<()> {
        self.slot_mut(id)?.module.try_update_params(params)?;
        Ok(())
    }

    /// Deliver a panel or menu action.
    pub fn send_message(&mut self, id: ModuleId, message: Message) -> RackResult<()> {
        let slot = self.slot_mut(id)?;
        if !slot.module.handled_message_tags().contains(&message.tag()) {
            return Err(RackError::UnhandledMessage {
                id,
                model: slot.module.model(),
                message: format!("{:?}", message.tag()),
            });
        }
        slot.module.handle_message(&message)?;
        Ok(())
    }

    /// Indicator brightness, 0 for unknown modules.
    pub fn light(&self, id: ModuleId, light: LightId) -> f32 {
        self.module(id).map(|m| m.light(light)).unwrap_or(0.0)
    }

    /// Left and right neighbor as of the last layout change.
    pub fn neighbors(&mut self, id: ModuleId) -> (Option<Neighbor>, Option<Neighbor>) {
        self.refresh_layout();
        self.neighbors.get(id).copied().unwrap_or((None, None))
    }

    fn refresh_layout(&mut self) {
        if !self.layout_dirty {
            return;
        }
        let mut edges: HashMap<(i32, i32), ModuleId> = HashMap::new();
        let mut starts: HashMap<(i32, i32), ModuleId> = HashMap::new();
        for (id, slot) in self.slots.iter().enumerate() {
            if let Some(slot) = slot {
                edges.insert((slot.pos.row, slot.right_edge()), id);
                starts.insert((slot.pos.row, slot.pos.col), id);
            }
        }

        let neighbor = |id: ModuleId| -> Option<Neighbor> {
            self.slot(id).map(|slot| Neighbor {
                id,
                kind: slot.module.participant(),
            })
        };

        let neighbors = self
            .slots
            .iter()
            .map(|slot| match slot {
                Some(slot) => (
                    edges
                        .get(&(slot.pos.row, slot.pos.col))
                        .and_then(|&id| neighbor(id)),
                    starts
                        .get(&(slot.pos.row, slot.right_edge()))
                        .and_then(|&id| neighbor(id)),
                ),
                None => (None, None),
            })
            .collect();
        self.neighbors = neighbors;
        self.layout_dirty = false;
    }

    /// Advance the whole rack by one sample.
    pub fn process_frame(&mut self) {
        profiling::scope!("process_frame");
        self.refresh_layout();
        self.route_cables();
        self.process_modules();
        self.frame += 1;
    }

    fn route_cables(&mut self) {
        profiling::scope!("route_cables");
        for cable in &self.cables {
            let value = match self.slots.get(cable.from).and_then(Option::as_ref) {
                Some(source) => source.module.get_output(&cable.output).unwrap_or_default(),
                None => continue,
            };
            if let Some(Some(target)) = self.slots.get_mut(cable.to) {
                let _ = target.module.set_input(&cable.input, value.into());
            }
        }
    }

    fn process_modules(&mut self) {
        profiling::scope!("process_modules");
        let Rack {
            slots,
            mailboxes,
            neighbors,
            sample_rate,
            frame,
            order,
            ..
        } = self;

        let count = slots.len();
        for step in 0..count {
            let id = match order {
                ProcessOrder::Forward => step,
                ProcessOrder::Reverse => count - 1 - step,
            };
            let Some(slot) = slots[id].as_mut() else {
                continue;
            };
            let args = ProcessArgs::new(*sample_rate, *frame, slot.pos.to_widget());

            if slot.module.participant().is_none() {
                slot.module.process(&args, None);
                continue;
            }

            let (left, right) = neighbors.get(id).copied().unwrap_or((None, None));
            let right_id = right.filter(|n| n.kind.is_some()).map(|n| n.id);
            let Some((inbox, right_inbox)) = mailbox_pair(mailboxes, id, right_id) else {
                slot.module.process(&args, None);
                continue;
            };
            let mut io = ChainIo::new(left, right, inbox, right_inbox);
            slot.module.process(&args, Some(&mut io));
        }
    }

    /// Run the master's spawn action for `master`.
    pub fn spawn(&mut self, master: ModuleId, request: &SpawnRequest) -> RackResult<Vec<ModuleId>> {
        let slot = self.slot(master).ok_or(RackError::UnknownModule(master))?;
        let Some(m) = slot.module.as_any().downcast_ref::<Master>() else {
            return Err(SpawnError::NotAMaster(master).into());
        };
        let origin = m
            .chain_origin()
            .map(GridPos::from_widget)
            .unwrap_or(slot.pos);
        tracing::info!(master, col = origin.col, row = origin.row, "spawning channel strips");
        Ok(spawn_run(self, master, origin, request)?)
    }

    pub fn to_patch(&self) -> RackPatch {
        let modules = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| {
                slot.as_ref().map(|slot| PatchModule {
                    id,
                    model: slot.module.model().to_string(),
                    col: slot.pos.col,
                    row: slot.pos.row,
                    params: slot.module.get_params(),
                    state: slot.module.get_state(),
                })
            })
            .collect();
        RackPatch {
            sample_rate: self.sample_rate,
            modules,
            cables: self.cables.clone(),
        }
    }

    /// Build a rack from a patch. Module ids are reassigned; cables follow them.
    pub fn from_patch(registry: Arc<ModuleRegistry>, patch: &RackPatch) -> RackResult<Self> {
        let mut rack = Rack::new(registry, patch.sample_rate);
        let mut ids = HashMap::new();

        for entry in &patch.modules {
            let id = rack.add_module(&entry.model, GridPos::new(entry.col, entry.row))?;
            ids.insert(entry.id, id);

            let slot = rack.slot_mut(id)?;
            if !entry.params.is_null() {
                slot.module.try_update_params(entry.params.clone())?;
            }
            if let Some(state) = &entry.state {
                if let Err(err) = slot.module.set_state(state.clone()) {
                    tracing::warn!(id, model = %entry.model, "state not loaded, using defaults: {}", err);
                }
            }
        }

        for cable in &patch.cables {
            let from = *ids.get(&cable.from).ok_or(RackError::UnknownModule(cable.from))?;
            let to = *ids.get(&cable.to).ok_or(RackError::UnknownModule(cable.to))?;
            rack.connect(from, &cable.output, to, &cable.input)?;
        }

        tracing::info!(
            modules = patch.modules.len(),
            cables = patch.cables.len(),
            "rack loaded"
        );
        Ok(rack)
    }
}

/// Borrow a participant's inbox together with its right neighbor's.
fn mailbox_pair(
    mailboxes: &mut [Option<Mailbox>],
    id: ModuleId,
    right: Option<ModuleId>,
) -> Option<(&mut Mailbox, Option<&mut Mailbox>)> {
    match right {
        Some(right) if right != id && right < mailboxes.len() => {
            let (own, other) = if id < right {
                let (head, tail) = mailboxes.split_at_mut(right);
                (&mut head[id], &mut tail[0])
            } else {
                let (head, tail) = mailboxes.split_at_mut(id);
                (&mut tail[0], &mut head[right])
            };
            Some((own.as_mut()?, other.as_mut()))
        }
        _ => mailboxes.get_mut(id)?.as_mut().map(|own| (own, None)),
    }
}

impl ModulePlacer for Rack {
    fn position_of(&self, id: ModuleId) -> Option<GridPos> {
        Rack::position_of(self, id)
    }

    fn width_of(&self, id: ModuleId) -> Option<u32> {
        Rack::width_of(self, id)
    }

    fn place_module(&mut self, model: &str, at: GridPos) -> Result<ModuleId, SpawnError> {
        match Rack::place_module(self, model, at) {
            Ok(id) => Ok(id),
            Err(RackError::Spawn(err)) => Err(err),
            Err(other) => Err(SpawnError::Placement(other.to_string())),
        }
    }

    fn send_message(&mut self, id: ModuleId, message: Message) -> anyhow::Result<()> {
        Rack::send_message(self, id, message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ParticipantKind;

    fn rack() -> Rack {
        Rack::new(Arc::new(ModuleRegistry::builtin()), 48000.0)
    }

    #[test]
    fn test_neighbors_touch_edges() {
        let mut rack = rack();
        let a = rack.add_module("channelStrip", GridPos::new(0, 0)).unwrap();
        let b = rack.add_module("separator", GridPos::new(2, 0)).unwrap();
        let c = rack.add_module("master", GridPos::new(4, 0)).unwrap();
        let other_row = rack.add_module("channelStrip", GridPos::new(3, 1)).unwrap();

        let (left, right) = rack.neighbors(b);
        assert_eq!(left.map(|n| n.id), Some(a));
        // one column gap between the separator and the master
        assert_eq!(right, None);
        assert_eq!(rack.neighbors(c).0, None);
        assert_eq!(rack.neighbors(other_row), (None, None));
    }

    #[test]
    fn test_foreign_neighbor_has_no_kind() {
        let mut rack = rack();
        let strip = rack.add_module("channelStrip", GridPos::new(0, 0)).unwrap();
        let osc = rack.add_module("horsehair", GridPos::new(2, 0)).unwrap();
        let (_, right) = rack.neighbors(strip);
        assert_eq!(right, Some(Neighbor { id: osc, kind: None }));
        assert!(rack.mailbox(osc).is_none());
        assert!(rack.mailbox(strip).is_some());
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut rack = rack();
        let master = rack.add_module("master", GridPos::new(0, 0)).unwrap();
        match rack.add_module("separator", GridPos::new(2, 0)) {
            Err(RackError::SlotOccupied { occupant, .. }) => assert_eq!(occupant, master),
            other => panic!("expected SlotOccupied, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_place_pushes_right_and_undo_restores() {
        let mut rack = rack();
        let strip = rack.add_module("channelStrip", GridPos::new(0, 0)).unwrap();
        let master = rack.add_module("master", GridPos::new(2, 0)).unwrap();

        // column 1 is inside the strip, so the new module snaps to column 2
        let sep = rack.place_module("separator", GridPos::new(1, 0)).unwrap();
        assert_eq!(rack.position_of(sep), Some(GridPos::new(2, 0)));
        assert_eq!(rack.position_of(master), Some(GridPos::new(3, 0)));
        assert_eq!(rack.position_of(strip), Some(GridPos::new(0, 0)));
        assert_eq!(
            rack.neighbors(master).0.and_then(|n| n.kind),
            Some(ParticipantKind::Separator)
        );

        assert_eq!(rack.undo(), Some(sep));
        assert!(rack.module(sep).is_none());
        assert_eq!(rack.position_of(master), Some(GridPos::new(2, 0)));
        assert_eq!(rack.undo(), None);
    }

    #[test]
    fn test_unknown_ports_and_messages() {
        let mut rack = rack();
        let strip = rack.add_module("channelStrip", GridPos::new(0, 0)).unwrap();
        let sep = rack.add_module("separator", GridPos::new(2, 0)).unwrap();

        assert!(matches!(
            rack.connect(strip, "nope", sep, "in"),
            Err(RackError::UnknownPort { .. })
        ));
        assert!(matches!(
            rack.send_message(sep, Message::SetMuted(true)),
            Err(RackError::UnhandledMessage { .. })
        ));
        assert!(rack.send_message(strip, Message::SetMuted(true)).is_ok());
        assert!(matches!(
            rack.send_message(99, Message::CycleGroup),
            Err(RackError::UnknownModule(99))
        ));
    }

    #[test]
    fn test_cable_latency_and_disconnect() {
        let mut rack = rack();
        let mult = rack.add_module("bufferedMult", GridPos::new(0, 1)).unwrap();
        let strip = rack.add_module("channelStrip", GridPos::new(0, 0)).unwrap();
        rack.set_input_voltage(mult, "in-1", PolyInput::mono(2.0)).unwrap();
        rack.connect(mult, "out-1", strip, "in-l").unwrap();

        rack.process_frame();
        // the cable was routed before the mult produced anything
        assert_eq!(rack.get_output(strip, "out-l").unwrap().get(0), 0.0);
        rack.process_frame();
        assert!((rack.get_output(strip, "out-l").unwrap().get(0) - 2.0).abs() < 1e-6);

        assert!(rack.disconnect(strip, "in-l").unwrap());
        assert!(!rack.disconnect(strip, "in-l").unwrap());
        rack.process_frame();
        assert_eq!(rack.get_output(strip, "out-l").unwrap().get(0), 0.0);
    }

    #[test]
    fn test_remove_drops_cables() {
        let mut rack = rack();
        let mult = rack.add_module("bufferedMult", GridPos::new(0, 1)).unwrap();
        let strip = rack.add_module("channelStrip", GridPos::new(0, 0)).unwrap();
        rack.connect(mult, "out-1", strip, "in-l").unwrap();
        rack.remove_module(mult).unwrap();
        assert!(rack.cables().is_empty());
        assert!(matches!(
            rack.remove_module(mult),
            Err(RackError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_spawn_needs_a_master() {
        let mut rack = rack();
        let strip = rack.add_module("channelStrip", GridPos::new(0, 0)).unwrap();
        assert!(matches!(
            rack.spawn(strip, &SpawnRequest::default()),
            Err(RackError::Spawn(SpawnError::NotAMaster(_)))
        ));
    }

    #[test]
    fn test_grid_widget_conversion() {
        let pos = GridPos::new(4, 2);
        assert_eq!(pos.to_widget(), Vec2::new(60.0, 760.0));
        assert_eq!(GridPos::from_widget(Vec2::new(61.0, 759.0)), pos);
    }

    #[test]
    fn test_mailbox_pair_both_directions() {
        let mut boxes = vec![Some(Mailbox::new()), None, Some(Mailbox::new())];
        let (_, right) = mailbox_pair(&mut boxes, 0, Some(2)).unwrap();
        assert!(right.is_some());
        let (_, right) = mailbox_pair(&mut boxes, 2, Some(0)).unwrap();
        assert!(right.is_some());
        let (_, right) = mailbox_pair(&mut boxes, 0, Some(1)).unwrap();
        assert!(right.is_none());
        assert!(mailbox_pair(&mut boxes, 1, None).is_none());
    }
}
