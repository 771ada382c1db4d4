use colored::Colorize;
use daisy_core::Rack;
use std::hint::black_box;
use std::path::Path;
use std::time::Instant;

pub const DEFAULT_FRAMES: u64 = 48000 * 10; // 10 seconds at 48kHz

pub fn run_benchmark(mut rack: Rack, patch_path: &Path, frames: u64, warmup: u64) {
    let sample_rate = rack.sample_rate();
    println!("Loaded {}: {} modules", patch_path.display(), rack.len());
    for id in rack.ids() {
        if let (Some(module), Some(pos)) = (rack.module(id), rack.position_of(id)) {
            println!(
                "  - {:3} {:16} col {:3} row {}",
                id,
                module.model(),
                pos.col,
                pos.row
            );
        }
    }

    println!(
        "\nRunning benchmark: {} frames ({:.2}s at {}Hz)",
        frames,
        frames as f64 / sample_rate as f64,
        sample_rate
    );
    println!("  Warmup: {} frames", warmup);

    print!("Warming up...");
    for _ in 0..warmup {
        rack.process_frame();
    }
    println!(" done");

    print!("Benchmarking...");
    let start = Instant::now();
    for _ in 0..frames {
        rack.process_frame();
        black_box(rack.frame());
    }
    let elapsed = start.elapsed();
    println!(" done\n");

    let ns_per_frame = elapsed.as_nanos() as f64 / frames.max(1) as f64;
    let frames_per_sec = 1_000_000_000.0 / ns_per_frame;
    let realtime_budget_ns = 1_000_000_000.0 / sample_rate as f64;
    let budget_usage = (ns_per_frame / realtime_budget_ns) * 100.0;

    println!("Results:");
    println!("  Total time:     {:?}", elapsed);
    println!("  Frames:         {}", frames);
    println!("  ns/frame:       {:.2}", ns_per_frame);
    println!("  frames/sec:     {:.0}", frames_per_sec);
    println!(
        "  Real-time budget: {:.2} ns/frame @ {}Hz",
        realtime_budget_ns, sample_rate
    );
    println!("  Budget usage:   {:.2}%", budget_usage);

    if budget_usage > 100.0 {
        println!("\n  {}", "WARNING: exceeds real-time budget!".red());
    } else {
        println!(
            "\n  {}",
            format!(
                "Within real-time budget ({:.1}x headroom)",
                100.0 / budget_usage
            )
            .green()
        );
    }
}
