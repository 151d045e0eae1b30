//! Plot an instrument's gain envelope to SVG.
//!
//! The curve is taken from the synth engine itself: a note is started, the
//! engine is rendered one millisecond at a time, and the voice gain is
//! sampled until the voice ends.

use anyhow::{anyhow, Result};
use clap::Parser;
use plotters::prelude::*;

use pianola::pipeline::{Instrument, SynthEngine, Tone, ToneEngine};

const SAMPLE_RATE: u32 = 8000;
/// Samples per millisecond at `SAMPLE_RATE`
const FRAME_SIZE: usize = 8;
const MAX_MS: u64 = 60_000;
const DISCONTINUITY_THRESHOLD: f32 = 0.05;

#[derive(Parser)]
#[command(name = "plot-envelope")]
#[command(about = "Plot an instrument's gain envelope to SVG", long_about = None)]
struct Args {
    /// Instrument to plot
    instrument: Instrument,

    /// Output SVG path
    output: String,

    /// Master volume (0.0 to 1.0)
    #[arg(short, long, default_value_t = 0.7)]
    volume: f32,

    /// Hold the note in sustain mode
    #[arg(short, long)]
    sustain: bool,

    /// Release the note after this many ms
    #[arg(short, long)]
    release_at: Option<u64>,
}

/// Gain per millisecond plus the release point, if one happened
fn generate_envelope(args: &Args) -> Result<(Vec<f32>, Option<u64>)> {
    let profile = args.instrument.profile();
    let mut engine = SynthEngine::new(SAMPLE_RATE)?;
    let voice = engine.start(Tone {
        frequency: 440.0,
        profile,
        master_volume: args.volume.clamp(0.0, 1.0),
        sustain: args.sustain,
    });

    let mut samples = Vec::new();
    let mut frame = [0.0f32; FRAME_SIZE];
    let mut released = None;

    for ms in 0..MAX_MS {
        if args.release_at == Some(ms) {
            engine.stop(voice, profile.release);
            released = Some(ms);
        }
        match engine.gain(voice) {
            Some(gain) if engine.is_sounding(voice) => samples.push(gain),
            _ => return Ok((samples, released)),
        }
        engine.render(&mut frame);
    }

    Err(anyhow!(
        "envelope did not end within {}ms; use --release-at with --sustain",
        MAX_MS
    ))
}

/// Look for jumps after the attack, which may legitimately be a single step
fn check_discontinuities(samples: &[f32], attack: f64) -> Result<()> {
    let skip = (attack * 1000.0).ceil() as usize + 1;
    let mut max_diff: f32 = 0.0;
    let mut max_diff_idx: usize = 0;

    for (i, pair) in samples.windows(2).enumerate().skip(skip) {
        let diff = (pair[1] - pair[0]).abs();
        if diff > max_diff {
            max_diff = diff;
            max_diff_idx = i + 1;
        }
    }

    if max_diff > DISCONTINUITY_THRESHOLD {
        return Err(anyhow!(
            "discontinuity at {}ms: diff = {}",
            max_diff_idx,
            max_diff
        ));
    }
    println!(
        "  ✓ Max step: {:.6} at {}ms (below threshold {})",
        max_diff, max_diff_idx, DISCONTINUITY_THRESHOLD
    );
    Ok(())
}

fn create_plot(args: &Args, samples: &[f32], released: Option<u64>) -> Result<()> {
    let root = SVGBackend::new(&args.output, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let max_time = samples.len().max(1) as f32;
    let max_gain = samples.iter().copied().fold(0.0f32, f32::max).max(0.01) * 1.1;
    let profile = args.instrument.profile();

    let title = format!(
        "{} ({}): A={}s, D={}s, S={:.2}, R={}s{}",
        args.instrument,
        profile.waveform,
        profile.attack,
        profile.decay,
        profile.sustain,
        profile.release,
        if args.sustain { ", sustain on" } else { "" }
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f32..max_time, 0f32..max_gain)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Gain")
        .x_labels(10)
        .y_labels(10)
        .draw()?;

    chart.draw_series(LineSeries::new(
        samples.iter().enumerate().map(|(i, &g)| (i as f32, g)),
        BLUE.stroke_width(2),
    ))?;

    if let Some(ms) = released {
        let gain = samples.get(ms as usize).copied().unwrap_or(0.0);
        chart.draw_series(std::iter::once(Circle::new(
            (ms as f32, gain),
            5,
            RED.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Envelope Plot");
    println!("=============");
    println!("  Instrument: {}", args.instrument);
    println!("  Volume: {:.2}", args.volume);
    println!("  Sustain mode: {}", args.sustain);
    if let Some(ms) = args.release_at {
        println!("  Release at: {}ms", ms);
    }
    println!();

    print!("  Generating envelope... ");
    let (samples, released) = generate_envelope(&args)?;
    println!("done ({}ms)", samples.len());

    check_discontinuities(&samples, args.instrument.profile().attack)?;

    print!("  Creating plot... ");
    create_plot(&args, &samples, released)?;
    println!("done");

    println!();
    println!("Output: {}", args.output);
    Ok(())
}
