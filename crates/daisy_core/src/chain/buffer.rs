use crate::poly::{PORT_MAX_CHANNELS, PolyOutput};

/// Lane count of a freshly cleared buffer. An absent chain reads as one
/// silent lane rather than zero lanes.
pub const DEFAULT_CHANNELS: usize = 1;

/// Fixed-capacity polyphonic stereo voltages.
///
/// Only lanes `[0, channels)` carry meaning; every lane at or above `channels`
/// is kept at zero so whole-buffer comparisons stay exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StereoVoltageBuffer {
    channels: usize,
    left: [f32; PORT_MAX_CHANNELS],
    right: [f32; PORT_MAX_CHANNELS],
}

impl Default for StereoVoltageBuffer {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS,
            left: [0.0; PORT_MAX_CHANNELS],
            right: [0.0; PORT_MAX_CHANNELS],
        }
    }
}

impl StereoVoltageBuffer {
    /// Silent buffer with `channels` lanes (capped at 16).
    pub fn with_channels(channels: usize) -> Self {
        let mut buffer = Self::default();
        buffer.channels = channels.min(PORT_MAX_CHANNELS);
        buffer
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Resize, zeroing any lanes that fall outside the new count.
    pub fn set_channels(&mut self, channels: usize) {
        let channels = channels.min(PORT_MAX_CHANNELS);
        for c in channels..PORT_MAX_CHANNELS {
            self.left[c] = 0.0;
            self.right[c] = 0.0;
        }
        self.channels = channels;
    }

    pub fn left(&self, channel: usize) -> f32 {
        if channel < self.channels {
            self.left[channel]
        } else {
            0.0
        }
    }

    pub fn right(&self, channel: usize) -> f32 {
        if channel < self.channels {
            self.right[channel]
        } else {
            0.0
        }
    }

    /// Writes one lane pair. Lanes outside the current count are ignored.
    pub fn set(&mut self, channel: usize, left: f32, right: f32) {
        if channel < self.channels {
            self.left[channel] = left;
            self.right[channel] = right;
        }
    }

    /// Replace contents with `channels` lanes taken from the slices. Lanes the
    /// slices do not cover read as zero.
    pub fn write_from(&mut self, left: &[f32], right: &[f32], channels: usize) {
        let channels = channels.min(PORT_MAX_CHANNELS);
        for c in 0..PORT_MAX_CHANNELS {
            if c < channels {
                self.left[c] = left.get(c).copied().unwrap_or(0.0);
                self.right[c] = right.get(c).copied().unwrap_or(0.0);
            } else {
                self.left[c] = 0.0;
                self.right[c] = 0.0;
            }
        }
        self.channels = channels;
    }

    /// Copy lanes out, zero-filling whatever the destination holds past the
    /// lane count. Returns the lane count.
    pub fn read_into(&self, left: &mut [f32], right: &mut [f32]) -> usize {
        for (c, slot) in left.iter_mut().enumerate() {
            *slot = self.left(c);
        }
        for (c, slot) in right.iter_mut().enumerate() {
            *slot = self.right(c);
        }
        self.channels
    }

    /// Add `other * scale` lane by lane, widening to the larger lane count.
    pub fn combine_with(&mut self, other: &StereoVoltageBuffer, scale: f32) {
        for c in 0..other.channels {
            self.left[c] += other.left[c] * scale;
            self.right[c] += other.right[c] * scale;
        }
        self.channels = self.channels.max(other.channels);
    }

    /// Multiply every active lane by `gain`.
    pub fn scale(&mut self, gain: f32) {
        for c in 0..self.channels {
            self.left[c] *= gain;
            self.right[c] *= gain;
        }
    }

    /// Apply `f` to every active lane of both sides.
    pub fn map_lanes(&mut self, mut f: impl FnMut(usize, f32) -> f32) {
        for c in 0..self.channels {
            self.left[c] = f(c, self.left[c]);
            self.right[c] = f(c, self.right[c]);
        }
    }

    /// Zero every lane but keep the lane count.
    pub fn silence(&mut self) {
        self.left = [0.0; PORT_MAX_CHANNELS];
        self.right = [0.0; PORT_MAX_CHANNELS];
    }

    pub fn left_sum(&self) -> f32 {
        self.left[..self.channels].iter().sum()
    }

    pub fn right_sum(&self) -> f32 {
        self.right[..self.channels].iter().sum()
    }

    /// Split into a pair of port outputs.
    pub fn write_outputs(&self, left: &mut PolyOutput, right: &mut PolyOutput) {
        left.write_voltages(&self.left, self.channels);
        right.write_voltages(&self.right, self.channels);
    }
}
