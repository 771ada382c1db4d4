use std::f32::consts::{FRAC_PI_4, PI, SQRT_2};

/// Map a value from one range to another. If the input range is degenerate, returns `y0`.
pub fn map_range(x: f32, x0: f32, x1: f32, y0: f32, y1: f32) -> f32 {
    let denom = x1 - x0;
    if denom.abs() < f32::EPSILON {
        return y0;
    }
    (x - x0) * (y1 - y0) / denom + y0
}

/// Linear blend: `a` at 0, `b` at 1.
#[inline]
pub fn crossfade(a: f32, b: f32, p: f32) -> f32 {
    a + (b - a) * p
}

pub fn amplitude_to_db(amplitude: f32) -> f32 {
    20.0 * amplitude.log10()
}

/// Constant-power pan gains for `pan` in -1..=1.
///
/// Uses cos/sin of `(pan + 1)·π/4`, rescaled by √2 and capped at 1 so the
/// center position passes unity on both sides. The extremes are the plain
/// cos/sin law.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let theta = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    let left = (SQRT_2 * theta.cos()).min(1.0);
    let right = (SQRT_2 * theta.sin()).min(1.0);
    (left.max(0.0), right.max(0.0))
}

/// Fires once every `division` ticks, starting with the first one.
#[derive(Debug, Clone, Copy)]
pub struct ClockDivider {
    division: u32,
    clock: u32,
}

impl ClockDivider {
    pub fn new(division: u32) -> Self {
        Self {
            division: division.max(1),
            clock: 0,
        }
    }

    pub fn tick(&mut self) -> bool {
        let fire = self.clock == 0;
        self.clock += 1;
        if self.clock >= self.division {
            self.clock = 0;
        }
        fire
    }

    pub fn division(&self) -> u32 {
        self.division
    }
}

pub const VU_GREEN_BINS: usize = 32;
pub const VU_YELLOW_BINS: usize = 8;
pub const VU_RED_BINS: usize = 4;
pub const VU_BINS: usize = VU_GREEN_BINS + VU_YELLOW_BINS + VU_RED_BINS;

const VU_FLOOR_DB: f32 = -60.0;
const VU_BIN_DB: f32 = 1.5;

/// Lower dB edge of every VU bin.
pub const VU_BIN_FLOORS: [f32; VU_BINS] = {
    let mut floors = [0.0; VU_BINS];
    let mut i = 0;
    while i < VU_BINS {
        floors[i] = VU_FLOOR_DB + VU_BIN_DB * i as f32;
        i += 1;
    }
    floors
};

/// Peak envelope follower for meter lights: instant attack, exponential release.
#[derive(Debug, Clone, Copy, Default)]
pub struct VuEnvelope {
    value: f32,
}

impl VuEnvelope {
    /// Release rate in 1/s
    pub const LAMBDA: f32 = 30.0;

    pub fn process(&mut self, delta_time: f32, input: f32) {
        let input = input.abs();
        if input >= self.value {
            self.value = input;
        } else {
            self.value += (input - self.value) * Self::LAMBDA * delta_time;
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// 0 below `db_min`, 1 above `db_max`, linear in between.
    pub fn brightness(&self, db_min: f32, db_max: f32) -> f32 {
        if self.value <= 0.0 {
            return 0.0;
        }
        let db = amplitude_to_db(self.value);
        if db >= db_max {
            1.0
        } else if db <= db_min {
            0.0
        } else {
            map_range(db, db_min, db_max, 0.0, 1.0)
        }
    }

    pub fn bin_brightness(&self, bin: usize) -> f32 {
        match VU_BIN_FLOORS.get(bin) {
            Some(&floor) => self.brightness(floor, floor + VU_BIN_DB),
            None => 0.0,
        }
    }
}

/// Windowed-sinc FIR that turns `oversample` sub-samples into one output sample.
///
/// Buffers are sized once at construction; `process` never allocates.
#[derive(Debug, Clone)]
pub struct Decimator {
    oversample: usize,
    kernel: Vec<f32>,
    buffer: Vec<f32>,
    index: usize,
}

impl Decimator {
    pub fn new(oversample: usize, quality: usize) -> Self {
        let len = (oversample * quality).max(1);
        let cutoff = 0.9 * 0.5 / oversample.max(1) as f32;
        let mut kernel = vec![0.0; len];
        let center = (len as f32 - 1.0) / 2.0;
        let window_factor = 2.0 * PI / (len as f32 - 1.0).max(1.0);
        for (i, k) in kernel.iter_mut().enumerate() {
            let t = i as f32 - center;
            let x = 2.0 * cutoff * t;
            let sinc = if x == 0.0 { 1.0 } else { (PI * x).sin() / (PI * x) };
            let p = window_factor * i as f32;
            let window = 0.35875 - 0.48829 * p.cos() + 0.14128 * (2.0 * p).cos()
                - 0.01168 * (3.0 * p).cos();
            *k = 2.0 * cutoff * sinc * window;
        }
        Self {
            oversample: oversample.max(1),
            kernel,
            buffer: vec![0.0; len],
            index: 0,
        }
    }

    pub fn oversample(&self) -> usize {
        self.oversample
    }

    /// Feed `oversample` new sub-samples and return one decimated sample.
    pub fn process(&mut self, input: &[f32]) -> f32 {
        let len = self.buffer.len();
        for &x in input.iter().take(self.oversample) {
            self.buffer[self.index] = x;
            self.index = (self.index + 1) % len;
        }
        let mut out = 0.0;
        for (i, k) in self.kernel.iter().enumerate() {
            let j = (self.index + len - 1 - i) % len;
            out += k * self.buffer[j];
        }
        out
    }
}
