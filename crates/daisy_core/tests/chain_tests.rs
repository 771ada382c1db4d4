//! Daisy-chain behaviour driven through a real rack.
//!
//! Every chain hop adds at most one sample of latency depending on tick
//! order, so each test settles the rack for a few frames before reading.

use daisy_core::chain::AuxBus;
use daisy_core::dsp::mixer::{ChannelStripVu, Master};
use daisy_core::poly::PolyInput;
use daisy_core::types::StripMode;
use daisy_core::{GridPos, LightId, Message, ModuleId, ModuleRegistry, ProcessOrder, Rack, Vec2};
use serde_json::json;
use std::sync::Arc;

const SAMPLE_RATE: f32 = 48000.0;
const SETTLE_FRAMES: usize = 16;

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
    (a - b).abs() < tol
}

fn new_rack() -> Rack {
    Rack::new(Arc::new(ModuleRegistry::builtin()), SAMPLE_RATE)
}

/// Lay out `models` left to right in row 0, edges touching.
fn lay_out(rack: &mut Rack, models: &[&str]) -> Vec<ModuleId> {
    let mut col = 0;
    models
        .iter()
        .map(|model| {
            let id = rack
                .add_module(model, GridPos::new(col, 0))
                .unwrap_or_else(|e| panic!("could not add {model}: {e}"));
            col += rack.width_of(id).unwrap() as i32;
            id
        })
        .collect()
}

fn settle(rack: &mut Rack) {
    for _ in 0..SETTLE_FRAMES {
        rack.process_frame();
    }
}

fn feed(rack: &mut Rack, id: ModuleId, volts: f32) {
    rack.set_input_voltage(id, "in-l", PolyInput::mono(volts))
        .unwrap();
}

fn stereo_out(rack: &Rack, id: ModuleId) -> (f32, f32) {
    (
        rack.get_output(id, "out-l").unwrap().get(0),
        rack.get_output(id, "out-r").unwrap().get(0),
    )
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn unity_chain_reaches_master() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "master"]);
    feed(&mut rack, ids[0], 5.0);
    settle(&mut rack);

    let (l, r) = stereo_out(&rack, ids[1]);
    assert!(approx_eq(l, 5.0, 1e-4), "left should be 5V, got {}", l);
    assert!(approx_eq(r, 5.0, 1e-4), "right should be 5V, got {}", r);
}

#[test]
fn hard_right_pan() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "master"]);
    rack.update_params(ids[0], json!({"level": 1.0, "pan": 1.0}))
        .unwrap();
    feed(&mut rack, ids[0], 5.0);
    settle(&mut rack);

    let (l, r) = stereo_out(&rack, ids[1]);
    assert!(approx_eq(l, 0.0, 1e-4), "left should be silent, got {}", l);
    assert!(approx_eq(r, 5.0, 1e-4), "right should be 5V, got {}", r);
}

#[test]
fn aux_send_reaches_group() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "auxSendGroup", "master"]);
    rack.send_message(ids[0], Message::SetAuxSend(AuxBus::One, 0.5))
        .unwrap();
    feed(&mut rack, ids[0], 4.0);
    settle(&mut rack);

    let (l, r) = stereo_out(&rack, ids[1]);
    assert!(approx_eq(l, 2.0, 1e-4), "aux out should be 2V, got {}", l);
    assert!(approx_eq(r, 2.0, 1e-4), "aux out should be 2V, got {}", r);

    // The aux group does not contribute to the mix
    let (master_l, _) = stereo_out(&rack, ids[2]);
    assert!(approx_eq(master_l, 4.0, 1e-4), "mix should be 4V, got {}", master_l);
}

#[test]
fn aux_group_selects_bus() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "auxSendGroup"]);
    rack.send_message(ids[0], Message::SetAuxSend(AuxBus::Two, 0.25))
        .unwrap();
    feed(&mut rack, ids[0], 4.0);
    settle(&mut rack);
    assert_eq!(stereo_out(&rack, ids[1]).0, 0.0);

    rack.send_message(ids[1], Message::CycleGroup).unwrap();
    settle(&mut rack);
    let (l, _) = stereo_out(&rack, ids[1]);
    assert!(approx_eq(l, 1.0, 1e-4), "aux 2 should carry 1V, got {}", l);
}

#[test]
fn foreign_right_neighbor_breaks_chain() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "horsehair"]);
    feed(&mut rack, ids[0], 5.0);
    for _ in 0..600 {
        rack.process_frame();
    }

    assert_eq!(rack.light(ids[0], LightId::LinkRight), 0.0);
    assert_eq!(rack.light(ids[0], LightId::LinkLeft), 0.0);
    assert!(rack.mailbox(ids[1]).is_none());
    // direct outs still work at the end of a broken chain
    let (l, _) = stereo_out(&rack, ids[0]);
    assert!(approx_eq(l, 5.0, 1e-4));
}

#[test]
fn link_lights_follow_topology() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "separator", "master"]);
    settle(&mut rack);
    assert_eq!(rack.light(ids[0], LightId::LinkRight), 0.8);
    assert_eq!(rack.light(ids[1], LightId::LinkLeft), 0.8);
    assert_eq!(rack.light(ids[1], LightId::LinkRight), 0.8);
    assert_eq!(rack.light(ids[2], LightId::LinkLeft), 0.8);
    // nothing to the right of the master
    assert_eq!(rack.light(ids[2], LightId::LinkRight), 0.0);
}

#[test]
fn blank_panel_splits_chain() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "blank1", "master"]);
    feed(&mut rack, ids[0], 5.0);
    settle(&mut rack);
    assert_eq!(stereo_out(&rack, ids[2]).0, 0.0);
}

#[test]
fn separator_bridges_chain() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "separator", "separator", "master"]);
    feed(&mut rack, ids[0], 3.0);
    settle(&mut rack);
    assert!(approx_eq(stereo_out(&rack, ids[3]).0, 3.0, 1e-4));
}

// ─── Solo ────────────────────────────────────────────────────────────────────

#[test]
fn solo_overrides_mix() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "channelStrip", "master"]);
    feed(&mut rack, ids[0], 5.0);
    feed(&mut rack, ids[1], 3.0);
    settle(&mut rack);
    assert!(approx_eq(stereo_out(&rack, ids[2]).0, 8.0, 1e-4));

    rack.send_message(ids[1], Message::SetStripMode(StripMode::Solo))
        .unwrap();
    settle(&mut rack);
    let (l, r) = stereo_out(&rack, ids[2]);
    assert!(approx_eq(l, 3.0, 1e-4), "only the soloed strip, got {}", l);
    assert!(approx_eq(r, 3.0, 1e-4), "only the soloed strip, got {}", r);
    assert_eq!(rack.light(ids[1], LightId::Solo), 1.0);

    let master = rack.module(ids[2]).unwrap();
    let master = master.as_any().downcast_ref::<Master>().unwrap();
    assert!(master.soloing());
}

#[test]
fn soloed_strips_sum() {
    let mut rack = new_rack();
    let ids = lay_out(
        &mut rack,
        &["channelStrip", "channelStrip", "channelStrip", "master"],
    );
    for (id, volts) in ids.iter().zip([1.0, 2.0, 4.0]) {
        feed(&mut rack, *id, volts);
    }
    rack.send_message(ids[0], Message::SetStripMode(StripMode::Solo))
        .unwrap();
    rack.send_message(ids[2], Message::SetStripMode(StripMode::Solo))
        .unwrap();
    settle(&mut rack);
    assert!(approx_eq(stereo_out(&rack, ids[3]).0, 5.0, 1e-4));
}

#[test]
fn muted_soloist_does_not_solo() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "channelStrip", "master"]);
    feed(&mut rack, ids[0], 5.0);
    feed(&mut rack, ids[1], 3.0);
    rack.send_message(ids[1], Message::SetStripMode(StripMode::Solo))
        .unwrap();
    rack.send_message(ids[1], Message::SetMuted(true)).unwrap();
    settle(&mut rack);
    assert!(approx_eq(stereo_out(&rack, ids[2]).0, 5.0, 1e-4));
}

// ─── Chain head ──────────────────────────────────────────────────────────────

#[test]
fn chain_head_resets_index_and_origin() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "channelStrip", "separator"]);
    settle(&mut rack);
    let msg = rack.mailbox(ids[2]).unwrap().consumer();
    assert_eq!(msg.strip_index, 3);
    assert_eq!(msg.chain_origin, Vec2::new(0.0, 0.0));

    // Without its left neighbor the second strip becomes the head
    rack.remove_module(ids[0]).unwrap();
    settle(&mut rack);
    let msg = rack.mailbox(ids[2]).unwrap().consumer();
    assert_eq!(msg.strip_index, 2);
    assert_eq!(msg.chain_origin, GridPos::new(2, 0).to_widget());
}

#[test]
fn master_tracks_chain_origin() {
    let mut rack = new_rack();
    let master = rack.add_module("master", GridPos::new(10, 0)).unwrap();
    rack.add_module("channelStrip", GridPos::new(6, 0)).unwrap();
    rack.add_module("channelStrip", GridPos::new(8, 0)).unwrap();
    settle(&mut rack);
    let module = rack.module(master).unwrap();
    let master = module.as_any().downcast_ref::<Master>().unwrap();
    assert_eq!(master.chain_origin(), Some(GridPos::new(6, 0).to_widget()));
}

// ─── Properties ──────────────────────────────────────────────────────────────

#[test]
fn single_hop_round_trip() {
    for volts in [-12.0, -7.5, 0.3, 4.0, 11.9] {
        let mut rack = new_rack();
        let ids = lay_out(&mut rack, &["channelStrip", "master"]);
        feed(&mut rack, ids[0], volts);
        settle(&mut rack);
        let (l, r) = stereo_out(&rack, ids[1]);
        assert!(approx_eq(l, volts, 1e-4), "{} V came back as {}", volts, l);
        assert!(approx_eq(r, volts, 1e-4), "{} V came back as {}", volts, r);
    }
}

#[test]
fn master_clamps_hot_mix() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "channelStrip", "master"]);
    feed(&mut rack, ids[0], 10.0);
    feed(&mut rack, ids[1], 10.0);
    settle(&mut rack);
    assert_eq!(stereo_out(&rack, ids[2]).0, 12.0);
}

#[test]
fn pass_through_is_idempotent() {
    let mut rack = new_rack();
    let ids = lay_out(
        &mut rack,
        &["channelStrip", "separator", "auxSendGroup", "master"],
    );
    rack.send_message(ids[0], Message::SetAuxSend(AuxBus::One, 1.0))
        .unwrap();
    feed(&mut rack, ids[0], 2.0);
    settle(&mut rack);

    let first = *rack.mailbox(ids[3]).unwrap().consumer();
    rack.process_frame();
    let second = *rack.mailbox(ids[3]).unwrap().consumer();
    assert_eq!(first, second);
}

#[test]
fn tick_order_does_not_change_steady_state() {
    let models = [
        "channelStrip",
        "channelStripVu",
        "channelStrip",
        "auxSendGroup",
        "separator",
        "master",
        "channelStripVu",
    ];
    let run = |order: ProcessOrder| {
        let mut rack = new_rack();
        rack.set_order(order);
        let ids = lay_out(&mut rack, &models);
        feed(&mut rack, ids[0], 2.0);
        feed(&mut rack, ids[2], -1.5);
        rack.send_message(ids[2], Message::SetAuxSend(AuxBus::One, 0.5))
            .unwrap();
        settle(&mut rack);
        (stereo_out(&rack, ids[3]), stereo_out(&rack, ids[5]))
    };

    let forward = run(ProcessOrder::Forward);
    let reverse = run(ProcessOrder::Reverse);
    assert_eq!(forward, reverse);
    assert!(approx_eq(forward.1.0, 0.5, 1e-4));
    assert!(approx_eq(forward.0.0, -0.75, 1e-4));
}

// ─── Metering ────────────────────────────────────────────────────────────────

fn vu_levels(rack: &Rack, id: ModuleId) -> (f32, f32) {
    rack.module(id)
        .unwrap()
        .as_any()
        .downcast_ref::<ChannelStripVu>()
        .unwrap()
        .levels()
}

#[test]
fn vu_meters_its_left_neighbor_only() {
    let mut rack = new_rack();
    let ids = lay_out(
        &mut rack,
        &["channelStrip", "channelStripVu", "channelStrip", "channelStripVu", "master"],
    );
    feed(&mut rack, ids[0], 10.0);
    feed(&mut rack, ids[2], 1.0);
    settle(&mut rack);

    let (first, _) = vu_levels(&rack, ids[1]);
    let (second, _) = vu_levels(&rack, ids[3]);
    assert!(approx_eq(first, 1.0, 1e-4), "first meter at {}", first);
    assert!(approx_eq(second, 0.1, 1e-4), "second meter at {}", second);
}

#[test]
fn vu_right_of_master_meters_output() {
    let mut rack = new_rack();
    let ids = lay_out(&mut rack, &["channelStrip", "master", "channelStripVu"]);
    rack.update_params(ids[1], json!({"level": 0.5})).unwrap();
    feed(&mut rack, ids[0], 8.0);
    settle(&mut rack);
    let (l, r) = vu_levels(&rack, ids[2]);
    assert!(approx_eq(l, 0.4, 1e-4), "meter at {}", l);
    assert!(approx_eq(r, 0.4, 1e-4), "meter at {}", r);
    assert_eq!(rack.light(ids[1], LightId::LinkRight), 0.8);
}
