use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::ops::{Deref, Mul};

use anyhow::Result;

use crate::chain::{AuxBus, ChainIo, ParticipantKind};
use crate::poly::{PolyInput, PolyOutput};

/// One-pole lowpass filter for parameter smoothing to prevent clicking
/// Coefficient of 0.99 gives roughly 5ms smoothing time at 48kHz
const SMOOTHING_COEFF: f32 = 0.99;

pub fn smooth_value(current: f32, target: f32) -> f32 {
    current * SMOOTHING_COEFF + target * (1.0 - SMOOTHING_COEFF)
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Clickless {
    value: f32,
}

impl Clickless {
    pub fn update(&mut self, input: f32) {
        self.value = smooth_value(self.value, input);
    }

    /// Jump straight to `input`, skipping the ramp.
    pub fn reset(&mut self, input: f32) {
        self.value = input;
    }
}

impl From<Clickless> for f32 {
    fn from(clickless: Clickless) -> Self {
        clickless.value
    }
}

impl From<f32> for Clickless {
    fn from(value: f32) -> Self {
        Clickless { value }
    }
}

impl Deref for Clickless {
    type Target = f32;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl Mul<f32> for Clickless {
    type Output = f32;
    fn mul(self, rhs: f32) -> Self::Output {
        self.value * rhs
    }
}

/// Screen position of a module panel, in pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Everything the host hands a module for one sample tick.
#[derive(Debug, Clone, Copy)]
pub struct ProcessArgs {
    pub sample_rate: f32,
    pub sample_time: f32,
    pub frame: u64,
    /// Current panel position of the module being ticked
    pub position: Vec2,
}

impl ProcessArgs {
    pub fn new(sample_rate: f32, frame: u64, position: Vec2) -> Self {
        Self {
            sample_rate,
            sample_time: 1.0 / sample_rate,
            frame,
            position,
        }
    }
}

/// Panel indicators a module may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightId {
    Mute,
    Solo,
    LinkLeft,
    LinkRight,
    VuLeft(usize),
    VuRight(usize),
}

/// Channel strip switch position. `muted` wins over `solo` when both are persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum StripMode {
    #[default]
    Normal,
    Mute,
    Solo,
}

/// Panel and menu actions.
#[derive(Copy, Clone, Debug, PartialEq, EnumTag, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Message {
    SetStripMode(StripMode),
    SetAuxSend(AuxBus, f32),
    SetDirectOutsPrefader(bool),
    SetLevelSlew(bool),
    SetMuted(bool),
    SetGroup(AuxBus),
    CycleGroup,
}

pub trait MessageHandler {
    fn handled_message_tags(&self) -> &'static [MessageTag] {
        &[]
    }

    fn handle_message(&mut self, _message: &Message) -> Result<()> {
        Ok(())
    }
}

/// A module instance as the rack host sees it.
pub trait RackModule: MessageHandler + Send {
    fn model(&self) -> &'static str;
    fn width_hp(&self) -> u32;
    /// Chain role, or `None` for modules that never join a chain
    fn participant(&self) -> Option<ParticipantKind>;
    /// Runs one sample tick. `chain` is only supplied to chain participants.
    fn process(&mut self, args: &ProcessArgs, chain: Option<&mut ChainIo<'_>>);
    fn set_input(&mut self, port: &str, value: PolyInput) -> Result<()>;
    fn get_output(&self, port: &str) -> Result<PolyOutput>;
    fn try_update_params(&mut self, params: serde_json::Value) -> Result<()>;
    fn get_params(&self) -> serde_json::Value;
    fn get_state(&self) -> Option<serde_json::Value>;
    fn set_state(&mut self, state: serde_json::Value) -> Result<()>;
    fn light(&self, light: LightId) -> f32;
    fn as_any(&self) -> &dyn Any;
}

pub type ModuleConstructor = fn() -> Box<dyn RackModule>;

pub trait Module {
    fn install_constructor(map: &mut HashMap<String, ModuleConstructor>);
    fn get_schema() -> ModuleSchema;
}

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSchema {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
    pub polyphonic: bool,
}

pub trait OutputStruct: Default + Send + 'static {
    fn get_output(&self, port: &str) -> Option<PolyOutput>;
    fn schemas() -> Vec<PortSchema>
    where
        Self: Sized;
}

pub trait InputStruct: Default + Send + 'static {
    /// Returns false when the port does not exist.
    fn set_input(&mut self, port: &str, value: PolyInput) -> bool;
    fn schemas() -> Vec<PortSchema>
    where
        Self: Sized;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaContainer {
    pub schema: schemars::Schema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSchema {
    pub name: String,
    pub description: String,
    pub width_hp: u32,
    pub participant: Option<ParticipantKind>,
    pub params_schema: SchemaContainer,
    pub inputs: Vec<PortSchema>,
    pub outputs: Vec<PortSchema>,
    pub state_keys: Vec<String>,
}

/// Reads a persisted amount, clamping it into 0..=1.
pub fn deserialize_unit<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    Ok(if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, json};

    #[test]
    fn test_clickless_converges() {
        let mut c = Clickless::from(0.0);
        for _ in 0..2000 {
            c.update(1.0);
        }
        assert!((*c - 1.0).abs() < 1e-4, "expected ~1.0, got {}", *c);
    }

    #[test]
    fn test_message_tags() {
        assert_eq!(Message::CycleGroup.tag(), MessageTag::CycleGroup);
        assert_eq!(
            Message::SetAuxSend(AuxBus::Two, 0.5).tag(),
            MessageTag::SetAuxSend
        );
    }

    #[test]
    fn test_message_serde_shape() {
        let m: Message = from_value(json!({"type": "setMuted", "data": true})).unwrap();
        assert_eq!(m, Message::SetMuted(true));

        let m: Message = from_value(json!({"type": "setAuxSend", "data": [2, 0.25]})).unwrap();
        assert_eq!(m, Message::SetAuxSend(AuxBus::Two, 0.25));
    }

    #[test]
    fn test_deserialize_unit_clamps() {
        #[derive(Deserialize)]
        struct Amount {
            #[serde(deserialize_with = "deserialize_unit")]
            amt: f32,
        }
        let a: Amount = from_value(json!({"amt": 3.0})).unwrap();
        assert_eq!(a.amt, 1.0);
        let a: Amount = from_value(json!({"amt": -1.0})).unwrap();
        assert_eq!(a.amt, 0.0);
    }
}
