use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    dsp::utils::{Decimator, crossfade},
    types::ProcessArgs,
};

const OVERSAMPLE: usize = 16;
const QUALITY: usize = 16;
/// C4
const BASE_FREQ: f32 = 261.626;
const MAX_FREQ: f32 = 20000.0;
const PW_MIN: f32 = 0.01;

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
struct HorsehairParams {
    /// fine pitch in octaves, shared by both oscillators (-2..2)
    pitch: f32,
    /// octave of oscillator 1, rounded (-5..4)
    octave1: f32,
    /// octave of oscillator 2, rounded (-5..4)
    octave2: f32,
    /// 0 = square, 1 = saw
    shape1: f32,
    shape2: f32,
    /// pulse width of the square (0..1)
    pw1: f32,
    pw2: f32,
    /// crossfade from oscillator 1 to oscillator 2
    mix: f32,
}

impl Default for HorsehairParams {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            octave1: -2.0,
            octave2: -1.0,
            shape1: 0.0,
            shape2: 1.0,
            pw1: 0.5,
            pw2: 0.5,
            mix: 0.5,
        }
    }
}

#[derive(Inputs)]
struct HorsehairInputs {
    #[input("voct", "pitch CV in V/Oct")]
    voct: f32,
    #[input("shape-cv-1", "shape CV for oscillator 1, /10")]
    shape_cv_1: f32,
    #[input("shape-cv-2", "shape CV for oscillator 2, /10")]
    shape_cv_2: f32,
    #[input("pw-cv-1", "pulse width CV for oscillator 1, /10")]
    pw_cv_1: f32,
    #[input("pw-cv-2", "pulse width CV for oscillator 2, /10")]
    pw_cv_2: f32,
    #[input("mix-cv", "mix CV, /10")]
    mix_cv: f32,
}

#[derive(Outputs)]
struct HorsehairOutputs {
    #[output("sin", "sine of oscillator 1")]
    sin: f32,
    #[output("mix", "mixed oscillator output", default)]
    mix: f32,
}

/// Oversampled naive oscillator, band-limited by decimation.
#[derive(Clone)]
struct Oscillator {
    phase: f32,
    freq: f32,
    pw: f32,
    sin_decimator: Decimator,
    saw_decimator: Decimator,
    sqr_decimator: Decimator,
    sin_buffer: [f32; OVERSAMPLE],
    saw_buffer: [f32; OVERSAMPLE],
    sqr_buffer: [f32; OVERSAMPLE],
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            phase: 0.0,
            freq: BASE_FREQ,
            pw: 0.5,
            sin_decimator: Decimator::new(OVERSAMPLE, QUALITY),
            saw_decimator: Decimator::new(OVERSAMPLE, QUALITY),
            sqr_decimator: Decimator::new(OVERSAMPLE, QUALITY),
            sin_buffer: [0.0; OVERSAMPLE],
            saw_buffer: [0.0; OVERSAMPLE],
            sqr_buffer: [0.0; OVERSAMPLE],
        }
    }
}

impl Oscillator {
    fn set_pitch(&mut self, octave: f32, pitch: f32, voct: f32) {
        let pitch = 1.0 + octave.round() + pitch + voct;
        self.freq = (BASE_FREQ * 2f32.powf(pitch)).clamp(0.0, MAX_FREQ);
    }

    fn set_pulse_width(&mut self, pw: f32) {
        self.pw = pw.clamp(PW_MIN, 1.0 - PW_MIN);
    }

    fn process(&mut self, sample_time: f32) {
        let delta = (self.freq * sample_time).clamp(1e-6, 0.5) / OVERSAMPLE as f32;
        for i in 0..OVERSAMPLE {
            self.sin_buffer[i] = (std::f32::consts::TAU * self.phase).sin();
            self.saw_buffer[i] = if self.phase < 0.5 {
                2.0 * self.phase
            } else {
                -2.0 + 2.0 * self.phase
            };
            self.sqr_buffer[i] = if self.phase < self.pw { 1.0 } else { -1.0 };

            self.phase = (self.phase + delta).rem_euclid(1.0);
        }
    }

    fn sin(&mut self) -> f32 {
        self.sin_decimator.process(&self.sin_buffer)
    }

    fn saw(&mut self) -> f32 {
        self.saw_decimator.process(&self.saw_buffer)
    }

    fn sqr(&mut self) -> f32 {
        self.sqr_decimator.process(&self.sqr_buffer)
    }
}

/// Two-oscillator drone voice with square/saw morphing.
#[derive(Default, Module)]
#[module("horsehair", "Dual square/saw oscillator", width = 7)]
pub struct Horsehair {
    outputs: HorsehairOutputs,
    inputs: HorsehairInputs,
    params: HorsehairParams,
    oscillators: [Oscillator; 2],
}

message_handlers!(impl Horsehair {});

impl Horsehair {
    fn process(&mut self, args: &ProcessArgs) {
        let p = &self.params;
        let i = &self.inputs;

        let [osc1, osc2] = &mut self.oscillators;
        osc1.set_pitch(p.octave1, p.pitch, i.voct);
        osc1.set_pulse_width(p.pw1 + i.pw_cv_1 / 10.0);
        osc1.process(args.sample_time);

        osc2.set_pitch(p.octave2, p.pitch, i.voct);
        osc2.set_pulse_width(p.pw2 + i.pw_cv_2 / 10.0);
        osc2.process(args.sample_time);

        let shape1 = (p.shape1.clamp(0.0, 1.0) + i.shape_cv_1 / 10.0).clamp(0.0, 1.0);
        let shape2 = (p.shape2.clamp(0.0, 1.0) + i.shape_cv_2 / 10.0).clamp(0.0, 1.0);

        let out1 = crossfade(osc1.sqr(), osc1.saw(), shape1);
        let out2 = crossfade(osc2.sqr(), osc2.saw(), shape2);
        let mix = (p.mix + i.mix_cv / 10.0).clamp(0.0, 1.0);

        self.outputs.mix = 5.0 * crossfade(out1, out2, mix);
        self.outputs.sin = 5.0 * osc1.sin();
    }
}
