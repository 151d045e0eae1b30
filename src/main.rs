//! pianola - play and practice songs on the virtual piano from a terminal.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pianola::pipeline::router::{code_for_char, label_for, LAYOUT};
use pianola::pipeline::{Clock, Instrument, NoteKey, SynthEngine, SystemClock};
use pianola::presentation::{Feedback, Message, Presentation, Status};
use pianola::{Piano, PianoConfig};

#[derive(Parser)]
#[command(name = "pianola")]
#[command(author, version, about = "Two-octave virtual piano", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in songs
    Songs,

    /// List instruments and their envelopes
    Instruments,

    /// Show which computer key plays which piano key
    Keys,

    /// Print the effective configuration as TOML
    Config,

    /// Play a song in real time
    Play {
        /// Song id (see `pianola songs`)
        song: String,

        /// Instrument to play it with
        #[arg(short, long)]
        instrument: Option<Instrument>,
    },

    /// Learn a song: type the glowing keys, one line at a time
    Teach {
        /// Song id (see `pianola songs`)
        song: String,
    },
}

/// Prints the piano's visual state to the terminal
#[derive(Default)]
struct ConsolePresentation;

fn describe(key: NoteKey) -> String {
    match label_for(key) {
        Some(label) => format!("{} [{}]", key, label),
        None => key.to_string(),
    }
}

impl Presentation for ConsolePresentation {
    fn highlight(&mut self, key: NoteKey, on: bool) {
        if on {
            println!("  ♪ {}", describe(key));
        }
    }

    fn add_cue(&mut self, key: NoteKey) {
        println!("  -> next: {}", describe(key));
    }

    fn flash(&mut self, key: NoteKey, feedback: Feedback) {
        match feedback {
            Feedback::Correct => println!("  ✓ {}", describe(key)),
            Feedback::Wrong => println!("  ✗ {}", describe(key)),
        }
    }

    fn set_message(&mut self, message: Option<&Message>) {
        if let Some(message) = message {
            println!("{}", message);
        }
    }

    fn set_status(&mut self, status: Option<&Status>) {
        if let Some(status) = status {
            println!("{}", status);
        }
    }

    fn notice(&mut self, text: &str) {
        eprintln!("{}", text);
    }
}

type ConsolePiano = Piano<SynthEngine, ConsolePresentation, SystemClock>;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => PianoConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PianoConfig::default(),
    };

    match cli.command {
        Commands::Songs => list_songs(&config),
        Commands::Instruments => list_instruments(),
        Commands::Keys => list_keys(),
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Commands::Play { song, instrument } => play(&config, &song, instrument),
        Commands::Teach { song } => teach(&config, &song),
    }
}

fn new_piano(config: &PianoConfig) -> ConsolePiano {
    Piano::with_config(
        SynthEngine::new(config.audio.sample_rate),
        ConsolePresentation,
        SystemClock::new(),
        config,
    )
}

fn list_songs(config: &PianoConfig) -> Result<()> {
    let piano = new_piano(config);
    for song in piano.songs().iter() {
        println!(
            "{:<12} {} ({} notes, {:.1}s)",
            song.id(),
            song.name(),
            song.notes().len(),
            song.length_ms() as f64 / 1000.0
        );
    }
    Ok(())
}

fn list_instruments() -> Result<()> {
    println!(
        "{:<12} {:<9} {:>7} {:>7} {:>7} {:>7}",
        "name", "waveform", "attack", "decay", "sustain", "release"
    );
    for instrument in Instrument::ALL {
        let p = instrument.profile();
        println!(
            "{:<12} {:<9} {:>7.3} {:>7.3} {:>7.2} {:>7.3}",
            instrument.name(),
            p.waveform.name(),
            p.attack,
            p.decay,
            p.sustain,
            p.release
        );
    }
    Ok(())
}

fn list_keys() -> Result<()> {
    for binding in LAYOUT.iter() {
        println!("{:<3} {:<13} {}", binding.label, binding.code, binding.key);
    }
    Ok(())
}

/// Keeps engine time in step with the wall clock by rendering the frames
/// that are due. There is no audio device, so the samples are dropped.
struct AudioPump {
    frame: Vec<f32>,
    rendered: u64,
}

impl AudioPump {
    fn new(frame_size: usize) -> Self {
        Self {
            frame: vec![0.0; frame_size.max(1)],
            rendered: 0,
        }
    }

    fn run(&mut self, piano: &mut ConsolePiano) {
        let now_ms = piano.clock().now_ms();
        let Some(engine) = piano.engine_mut() else {
            return;
        };
        let target = now_ms * u64::from(engine.sample_rate()) / 1000;
        while self.rendered + self.frame.len() as u64 <= target {
            engine.render(&mut self.frame);
            self.rendered += self.frame.len() as u64;
        }
    }
}

fn wait_for_timer(piano: &ConsolePiano) -> Duration {
    let now = piano.clock().now_ms();
    let next = piano.next_deadline().unwrap_or(now + 20);
    Duration::from_millis(next.saturating_sub(now).clamp(1, 20))
}

fn play(config: &PianoConfig, song: &str, instrument: Option<Instrument>) -> Result<()> {
    let mut piano = new_piano(config);
    if piano.songs().get(song).is_none() {
        return Err(anyhow!("unknown song '{}', try `pianola songs`", song));
    }
    if let Some(instrument) = instrument {
        piano.set_instrument(instrument);
    }

    let mut pump = AudioPump::new(config.audio.frame_size);
    piano.play_song(song);
    while piano.is_song_playing() {
        thread::sleep(wait_for_timer(&piano));
        piano.tick();
        pump.run(&mut piano);
    }
    Ok(())
}

/// Lines typed on stdin, read on a separate thread
fn spawn_stdin_reader() -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn teach(config: &PianoConfig, song: &str) -> Result<()> {
    let mut piano = new_piano(config);
    if piano.songs().get(song).is_none() {
        return Err(anyhow!("unknown song '{}', try `pianola songs`", song));
    }

    let input = spawn_stdin_reader();
    let mut pump = AudioPump::new(config.audio.frame_size);
    piano.start_teaching(song);

    while piano.is_teaching() {
        match input.recv_timeout(wait_for_timer(&piano)) {
            Ok(line) => {
                for c in line.chars().filter(|c| !c.is_whitespace()) {
                    match code_for_char(c) {
                        Some(code) => {
                            piano.key_down(code, false);
                            piano.key_up(code);
                        }
                        None => println!("  '{}' is not a piano key", c),
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => piano.stop_teaching(),
        }
        piano.tick();
        pump.run(&mut piano);
    }
    Ok(())
}
