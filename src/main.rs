use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parley_gateway::config::{CaptureConfig, EngineKind};
use parley_gateway::daemon::assemble_table;
use parley_gateway::synth::{SpeechSynthesisOrchestrator, SynthesisOutcome, build_backends};
use parley_gateway::translate::{TranslationOrchestrator, TranslationResult, build_engine};
use parley_gateway::voice::{AudioCapture, AudioPlayback, Player, SAMPLE_RATE};
use parley_gateway::{Config, Daemon};

/// Parley - offline-first voice-to-voice translation gateway
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    /// Port for the HTTP API (overrides the config file)
    #[arg(long, env = "PARLEY_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Synthesize and play text through the backend chain
    Speak {
        /// Text to speak
        text: String,
        /// Language of the text
        #[arg(short, long, default_value = "en")]
        lang: String,
    },
    /// Translate text without audio capture
    TranslateText {
        /// Text to translate
        text: String,
        /// Source language code
        #[arg(short, long, default_value = "en")]
        source: String,
        /// Target language code
        #[arg(short, long, default_value = "hi")]
        target: String,
    },
    /// Report installed models, translation languages, and TTS backends
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley_gateway=info",
        1 => "info,parley_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.api.port = port;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(config.capture, duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::Speak { text, lang } => speak(config, &text, &lang).await,
            Command::TranslateText {
                text,
                source,
                target,
            } => translate_text(config, &text, &source, &target).await,
            Command::Check => check(config).await,
        };
    }

    tracing::info!(port = config.api.port, "starting parley gateway");

    let daemon = Daemon::new(config).await?;
    tracing::info!("parley gateway ready");

    // Run until interrupted
    daemon.run().await?;

    Ok(())
}

/// Test microphone input
async fn test_mic(capture: CaptureConfig, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    tokio::task::spawn_blocking(move || mic_meter(&capture, duration)).await??;

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Drain capture frames and print a level meter once per second
fn mic_meter(config: &CaptureConfig, duration: u64) -> parley_gateway::Result<()> {
    let mut capture = AudioCapture::new(config)?;
    let rx = capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for second in 0..duration {
        let mut samples: Vec<i16> = Vec::new();
        let start = Instant::now();

        while start.elapsed() < Duration::from_secs(1) {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(frame) => samples.extend(frame),
                Err(parley_gateway::Error::Timeout { .. }) => {}
                Err(e) => {
                    capture.stop();
                    return Err(e);
                }
            }
        }

        let energy = rms(&samples);
        let peak = samples
            .iter()
            .map(|&s| (f32::from(s) / 32768.0).abs())
            .fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            second + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();
    Ok(())
}

/// RMS energy of captured PCM, normalized to [0, 1]
#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples
        .iter()
        .map(|&s| {
            let normalized = f32::from(s) / 32768.0;
            normalized * normalized
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let tone = tempfile::Builder::new()
        .prefix("parley-tone-")
        .suffix(".wav")
        .tempfile()?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    {
        let mut writer = hound::WavWriter::create(tone.path(), spec)?;
        #[allow(clippy::cast_precision_loss)]
        for i in 0..(SAMPLE_RATE * 2) {
            let t = i as f32 / SAMPLE_RATE as f32;
            let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3; // 30% volume
            #[allow(clippy::cast_possible_truncation)]
            writer.write_sample((sample * 32767.0) as i16)?;
        }
        writer.finalize()?;
    }

    let playback = AudioPlayback::new()?;
    playback.play(tone.path()).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Synthesize and play text through the backend chain
async fn speak(config: Config, text: &str, lang: &str) -> anyhow::Result<()> {
    let backends = build_backends(&config.synthesis);
    let orchestrator = SpeechSynthesisOrchestrator::new(backends, &config.synthesis);
    let player = AudioPlayback::new()?;

    let result = orchestrator.speak(text, lang, &player).await?;

    for attempt in &result.attempts {
        tracing::debug!(backend = %attempt.backend, outcome = ?attempt.outcome, "attempt");
    }

    match result.outcome {
        SynthesisOutcome::Spoken { backend } => println!("Spoken via {backend}"),
        SynthesisOutcome::Degraded { reason } => println!("No audio produced: {reason}"),
        SynthesisOutcome::NoText => println!("Nothing to speak"),
    }

    Ok(())
}

/// Translate text without audio capture
async fn translate_text(
    config: Config,
    text: &str,
    source: &str,
    target: &str,
) -> anyhow::Result<()> {
    let engine = build_engine(&config.translator)?;
    let table = Arc::new(assemble_table(&config, engine.as_ref()).await);
    let orchestrator = TranslationOrchestrator::new(engine, table);

    match orchestrator.translate(text, source, target).await {
        TranslationResult::Success { text, via } => {
            println!("[{via}] {text}");
            Ok(())
        }
        TranslationResult::Failure { cause, via } => {
            anyhow::bail!("translation failed (last path tried: {via}): {cause}")
        }
    }
}

/// Report installed models, translation languages, and TTS backends
async fn check(config: Config) -> anyhow::Result<()> {
    println!("=== recognizer ===");
    match config.recognizer.kind {
        EngineKind::Command => {
            match which::which(&config.recognizer.program) {
                Ok(path) => println!(
                    "✓ {} found at {}",
                    config.recognizer.program,
                    path.display()
                ),
                Err(_) => println!("✗ {} not found on PATH", config.recognizer.program),
            }

            let mut missing = false;
            for (code, name) in &config.languages {
                match config.recognizer.model_dirs.get(code) {
                    Some(dir) if dir.exists() => {
                        println!("✓ {code} ({name}): model at {}", dir.display());
                    }
                    Some(dir) => {
                        println!("✗ {code} ({name}): model NOT found at {}", dir.display());
                        missing = true;
                    }
                    None => {
                        println!("✗ {code} ({name}): no model directory configured");
                        missing = true;
                    }
                }
            }
            if missing {
                println!("\nDownload missing models from https://alphacephei.com/vosk/models");
            }
        }
        EngineKind::Http => {
            if std::env::var(&config.recognizer.api_key_env).is_ok() {
                println!(
                    "✓ transcription endpoint {} ({} is set)",
                    config.recognizer.url, config.recognizer.api_key_env
                );
            } else {
                println!(
                    "✗ {} not set; transcription endpoint unusable",
                    config.recognizer.api_key_env
                );
            }
        }
    }

    println!("\n=== translation ===");
    let engine = build_engine(&config.translator)?;
    match engine.installed_languages().await {
        Ok(installed) => {
            for (code, name) in &config.languages {
                if installed.contains(code) {
                    println!("✓ {code} ({name}) installed");
                } else {
                    println!("✗ {code} ({name}) not installed");
                }
            }
        }
        Err(e) => println!("✗ could not query installed languages: {e}"),
    }
    println!("Pivot language: {}", config.translator.pivot);

    println!("\n=== synthesis backends ===");
    for backend in build_backends(&config.synthesis) {
        if backend.available() {
            println!("✓ {}", backend.id());
        } else {
            println!("✗ {} (program or API key missing)", backend.id());
        }
    }

    Ok(())
}
