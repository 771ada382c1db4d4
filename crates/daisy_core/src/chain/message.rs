use serde::{Deserialize, Serialize};

use super::buffer::StereoVoltageBuffer;
use crate::types::Vec2;

/// Hypothetical maximum number of chained contributors. Every participant
/// scales its contribution down by this before summing; consumers scale back up.
pub const CHAIN_DIVISOR: f32 = 16.0;

/// Ceiling applied after decoding a chained bus back to full scale.
pub const DECODE_CLAMP: f32 = 12.0;

/// Bring a full-scale voltage down to chain level.
#[inline]
pub fn encode(voltage: f32) -> f32 {
    voltage / CHAIN_DIVISOR
}

/// Bring a chain-level voltage back to full scale, clamped to ±12 V.
#[inline]
pub fn decode(voltage: f32) -> f32 {
    (voltage * CHAIN_DIVISOR).clamp(-DECODE_CLAMP, DECODE_CLAMP)
}

/// One of the two auxiliary send buses. Persisted as the integer 1 or 2.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub enum AuxBus {
    #[default]
    One,
    Two,
}

impl AuxBus {
    pub fn next(self) -> Self {
        match self {
            AuxBus::One => AuxBus::Two,
            AuxBus::Two => AuxBus::One,
        }
    }
}

impl From<i64> for AuxBus {
    fn from(value: i64) -> Self {
        if value == 2 { AuxBus::Two } else { AuxBus::One }
    }
}

impl From<AuxBus> for u8 {
    fn from(bus: AuxBus) -> Self {
        match bus {
            AuxBus::One => 1,
            AuxBus::Two => 2,
        }
    }
}

/// Mailbox payload handed from a participant to its right neighbor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChainMessage {
    /// Accumulated divisor-scaled chain sum
    pub mix: StereoVoltageBuffer,
    /// Full-scale signal of the sending participant alone, for metering
    pub single: StereoVoltageBuffer,
    pub aux1: StereoVoltageBuffer,
    pub aux2: StereoVoltageBuffer,
    /// Divisor-scaled sum of soloed strips
    pub solo: StereoVoltageBuffer,
    /// Number of soloed strips upstream
    pub soloists: u32,
    /// Panel position of the leftmost participant
    pub chain_origin: Vec2,
    /// 1-based position of the receiving participant in the chain
    pub strip_index: u32,
}

impl Default for ChainMessage {
    fn default() -> Self {
        Self::head(Vec2::default())
    }
}

impl ChainMessage {
    /// The message a participant synthesizes when it has no linked left neighbor.
    pub fn head(origin: Vec2) -> Self {
        Self {
            mix: StereoVoltageBuffer::default(),
            single: StereoVoltageBuffer::default(),
            aux1: StereoVoltageBuffer::default(),
            aux2: StereoVoltageBuffer::default(),
            solo: StereoVoltageBuffer::default(),
            soloists: 0,
            chain_origin: origin,
            strip_index: 1,
        }
    }

    pub fn aux(&self, bus: AuxBus) -> &StereoVoltageBuffer {
        match bus {
            AuxBus::One => &self.aux1,
            AuxBus::Two => &self.aux2,
        }
    }

    pub fn aux_mut(&mut self, bus: AuxBus) -> &mut StereoVoltageBuffer {
        match bus {
            AuxBus::One => &mut self.aux1,
            AuxBus::Two => &mut self.aux2,
        }
    }

    /// True when any strip upstream is soloed; the master then plays the
    /// solo bus instead of the mix.
    pub fn has_solo(&self) -> bool {
        self.soloists > 0
    }

    /// Bus the master should decode.
    pub fn audible(&self) -> &StereoVoltageBuffer {
        if self.has_solo() { &self.solo } else { &self.mix }
    }
}

/// Decode a divisor-scaled bus into a full-scale copy.
pub fn decode_buffer(bus: &StereoVoltageBuffer) -> StereoVoltageBuffer {
    let mut out = *bus;
    out.map_lanes(|_, v| decode(v));
    out
}
