//! Polyphonic port buffers.
//!
//! A cable carries up to 16 independent voltage lanes plus an authoritative
//! lane count, following the VCV Rack convention.
//!
//! - `PolyOutput`: what a module writes to an output port
//! - `PolyInput`: what the host delivers to an input port

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

/// Maximum channels per cable (matches VCV Rack / MIDI convention)
pub const PORT_MAX_CHANNELS: usize = 16;

/// A polyphonic output buffer with channel count metadata.
///
/// The `channels` field indicates how many channels are semantically valid:
/// - 0 = nothing written
/// - 1 = monophonic
/// - 2-16 = polyphonic
#[derive(Clone, Copy, Debug)]
pub struct PolyOutput {
    voltages: [f32; PORT_MAX_CHANNELS],
    channels: usize,
}

impl Default for PolyOutput {
    fn default() -> Self {
        Self {
            voltages: [0.0; PORT_MAX_CHANNELS],
            channels: 0,
        }
    }
}

impl PartialEq for PolyOutput {
    fn eq(&self, other: &Self) -> bool {
        self.channels == other.channels
            && self.voltages[..self.channels] == other.voltages[..other.channels]
    }
}

impl PolyOutput {
    /// Create a monophonic signal with a single value
    pub fn mono(value: f32) -> Self {
        let mut sig = Self::default();
        sig.voltages[0] = value;
        sig.channels = 1;
        sig
    }

    /// Get voltage for a specific channel (returns 0.0 if out of range)
    pub fn get(&self, channel: usize) -> f32 {
        if channel < self.channels {
            self.voltages[channel]
        } else {
            0.0
        }
    }

    /// Set voltage for a specific channel. Indices past the cap are dropped.
    pub fn set(&mut self, channel: usize, value: f32) {
        if channel < PORT_MAX_CHANNELS {
            self.voltages[channel] = value;
        }
    }

    /// Get voltage with modulo cycling: a mono signal cycles to all channels.
    pub fn get_cycling(&self, channel: usize) -> f32 {
        if self.channels == 0 {
            0.0
        } else {
            self.voltages[channel % self.channels]
        }
    }

    /// Set the number of active channels (clears higher channels to 0)
    pub fn set_channels(&mut self, channels: usize) {
        let channels = channels.min(PORT_MAX_CHANNELS);
        for c in channels..self.channels {
            self.voltages[c] = 0.0;
        }
        self.channels = channels;
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Write `channels` lanes from a slice, zeroing the rest.
    pub fn write_voltages(&mut self, voltages: &[f32], channels: usize) {
        let channels = channels.min(PORT_MAX_CHANNELS);
        for c in 0..PORT_MAX_CHANNELS {
            self.voltages[c] = if c < channels {
                voltages.get(c).copied().unwrap_or(0.0)
            } else {
                0.0
            };
        }
        self.channels = channels;
    }

    pub fn voltages(&self) -> &[f32] {
        &self.voltages[..self.channels]
    }
}

impl Serialize for PolyOutput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("PolyOutput", 2)?;
        state.serialize_field("channels", &self.channels)?;
        state.serialize_field("voltages", &self.voltages[..self.channels])?;
        state.end()
    }
}

impl JsonSchema for PolyOutput {
    fn schema_name() -> Cow<'static, str> {
        Cow::Borrowed("PolyOutput")
    }

    fn json_schema(r#gen: &mut schemars::SchemaGenerator) -> schemars::Schema {
        #[derive(JsonSchema)]
        #[allow(dead_code)]
        struct PolyOutputSchema {
            channels: usize,
            voltages: Vec<f32>,
        }
        PolyOutputSchema::json_schema(r#gen)
    }
}

// =============================================================================
// PolyInput - what arrives at an input jack
// =============================================================================

/// A polyphonic input buffer. Zero channels means nothing is patched in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolyInput {
    signal: PolyOutput,
}

impl PolyInput {
    pub fn mono(value: f32) -> Self {
        Self {
            signal: PolyOutput::mono(value),
        }
    }

    pub fn poly(values: &[f32]) -> Self {
        let mut signal = PolyOutput::default();
        signal.write_voltages(values, values.len());
        Self { signal }
    }

    /// Get the number of active channels
    pub fn channels(&self) -> usize {
        self.signal.channels()
    }

    /// Check if disconnected (no active channels)
    pub fn is_disconnected(&self) -> bool {
        self.signal.channels() == 0
    }

    pub fn is_connected(&self) -> bool {
        !self.is_disconnected()
    }

    /// Raw lane value, 0.0 past the lane count
    pub fn get(&self, channel: usize) -> f32 {
        self.signal.get(channel)
    }

    /// Lane value with cycling, so a mono cable feeds every lane
    pub fn get_value(&self, channel: usize) -> f32 {
        self.signal.get_cycling(channel)
    }

    /// Get value with fallback for disconnected inputs (normalled input)
    pub fn get_value_or(&self, channel: usize, default: f32) -> f32 {
        if self.is_disconnected() {
            default
        } else {
            self.get_value(channel)
        }
    }

    /// Sum of all active lanes
    pub fn sum(&self) -> f32 {
        self.signal.voltages().iter().sum()
    }

    /// Calculate the maximum channel count across multiple inputs
    pub fn max_channels(inputs: &[&PolyInput]) -> usize {
        inputs.iter().map(|i| i.channels()).max().unwrap_or(0)
    }
}

impl From<PolyOutput> for PolyInput {
    fn from(signal: PolyOutput) -> Self {
        Self { signal }
    }
}

impl Serialize for PolyInput {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.signal.voltages().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PolyInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Accept either a single voltage or an array of voltages
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum PolyInputDe {
            Single(f32),
            Array(Vec<f32>),
        }

        Ok(match PolyInputDe::deserialize(deserializer)? {
            PolyInputDe::Single(v) => PolyInput::mono(v),
            PolyInputDe::Array(values) => PolyInput::poly(&values),
        })
    }
}
