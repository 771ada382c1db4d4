use anyhow::{Context, Result};
use daisy_core::Rack;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Rack voltages are written at 10 V = full scale.
const VOLTS_PER_UNIT: f32 = 10.0;

/// Render `seconds` of the first lane of `module`'s stereo outputs.
///
/// Modules with an `out-l`/`out-r` pair are recorded in stereo; anything else
/// has its default output copied to both channels.
pub fn render(mut rack: Rack, module: usize, seconds: f32, out: &Path) -> Result<()> {
    let sample_rate = rack.sample_rate();
    let (left_port, right_port) = stereo_ports(&rack, module)?;

    let spec = WavSpec {
        channels: 2,
        sample_rate: sample_rate as u32,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer =
        WavWriter::create(out, spec).with_context(|| format!("creating {}", out.display()))?;

    let frames = (seconds.max(0.0) * sample_rate) as u64;
    let mut peak = 0.0f32;
    for _ in 0..frames {
        rack.process_frame();
        let left = rack.get_output(module, &left_port)?.get(0);
        let right = rack.get_output(module, &right_port)?.get(0);
        peak = peak.max(left.abs()).max(right.abs());
        writer.write_sample(left / VOLTS_PER_UNIT)?;
        writer.write_sample(right / VOLTS_PER_UNIT)?;
    }
    writer.finalize()?;

    tracing::info!(
        frames,
        peak_volts = peak,
        path = %out.display(),
        "render finished"
    );
    Ok(())
}

fn stereo_ports(rack: &Rack, module: usize) -> Result<(String, String)> {
    let model = rack
        .module(module)
        .with_context(|| format!("no module with id {}", module))?
        .model();
    let schema = rack
        .registry()
        .schema(model)
        .with_context(|| format!("no schema for {}", model))?;

    let has = |name: &str| schema.outputs.iter().any(|p| p.name == name);
    if has("out-l") && has("out-r") {
        return Ok(("out-l".to_string(), "out-r".to_string()));
    }
    let default = schema
        .outputs
        .iter()
        .find(|p| p.default)
        .or_else(|| schema.outputs.first())
        .with_context(|| format!("{} has no outputs to record", model))?;
    Ok((default.name.clone(), default.name.clone()))
}
