use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lingua_voice::assistant::{
    INPUT_AUDIO_FILE, TEXT_REPLY_AUDIO_FILE, build_synthesizer, build_transcriber,
};
use lingua_voice::voice::{MicRecorder, Recorder, Synthesizer, Transcriber};
use lingua_voice::{Assistant, Config};

/// Lingua - Multilingual voice assistant
#[derive(Parser)]
#[command(name = "lingua", version, about)]
struct Cli {
    /// Session language code (e.g. "pt", "en", "ja")
    #[arg(short, long, global = true)]
    language: Option<String>,

    /// Chat model
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Transcription model
    #[arg(long, global = true)]
    whisper_model: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send one typed message and print the reply
    Ask {
        /// Message to send
        message: String,
        /// Don't speak the reply
        #[arg(long)]
        mute: bool,
    },
    /// Record a spoken question and speak the answer
    Listen {
        /// Recording duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Record a clip from the microphone
    Record {
        /// Recording duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,
        /// Output WAV path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Transcribe an audio file
    Transcribe {
        /// Audio file to transcribe
        file: PathBuf,
        /// Print detected language and timed segments
        #[arg(long)]
        detailed: bool,
    },
    /// Synthesize speech from text
    Speak {
        /// Text to speak
        text: String,
        /// Output WAV path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Play the result after writing it
        #[arg(long)]
        play: bool,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,lingua_voice=info",
        1 => "info,lingua_voice=debug",
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

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = Overrides {
        language: cli.language,
        model: cli.model,
        whisper_model: cli.whisper_model,
    };

    match cli.command {
        Some(Command::Setup) => lingua_voice::setup::run_setup(),
        None => {
            let config = overrides.load()?;
            let mut assistant = Assistant::from_config(&config)?;
            lingua_voice::menu::run_menu(&mut assistant, config.voice.recording_duration()).await
        }
        Some(Command::Ask { message, mute }) => {
            let config = overrides.load()?;
            let mut assistant = Assistant::from_config(&config)?;
            let reply = assistant.converse_by_text(&message, !mute).await?;
            println!("{reply}");
            if !mute {
                println!("\nAudio: {}", assistant.text_reply_path().display());
            }
            Ok(())
        }
        Some(Command::Listen { duration }) => {
            let config = overrides.load()?;
            let mut assistant = Assistant::from_config(&config)?;
            let duration = duration_or(duration, &config);
            println!("Recording for {} seconds... speak now.", duration.as_secs());

            let turn = assistant.converse_by_voice(duration, None).await?;
            println!("You: {}", turn.user_text);
            println!("Assistant: {}", turn.assistant_text);
            println!("\nAudio: {}", turn.output_audio.display());
            Ok(())
        }
        Some(Command::Record { duration, output }) => {
            let config = overrides.load()?;
            let duration = duration_or(duration, &config);
            let output = output.unwrap_or_else(|| config.voice.output_dir.join(INPUT_AUDIO_FILE));
            ensure_parent(&output)?;

            let recorder = MicRecorder::new(config.voice.sample_rate);
            println!("Recording for {} seconds...", duration.as_secs());
            let path = recorder.record(duration, &output).await?;
            println!("Saved {}", path.display());
            Ok(())
        }
        Some(Command::Transcribe { file, detailed }) => {
            let config = overrides.load()?;
            let transcriber = build_transcriber(&config)?;
            if detailed {
                let result = transcriber.transcribe_detailed(&file, None).await?;
                println!("Language: {}", result.language);
                if let Some(duration) = result.duration {
                    println!("Duration: {duration:.2}s");
                }
                for segment in &result.segments {
                    println!(
                        "[{:>7.2} - {:>7.2}] {}",
                        segment.start,
                        segment.end,
                        segment.text.trim()
                    );
                }
                println!("\n{}", result.text);
            } else {
                println!("{}", transcriber.transcribe(&file, None).await?);
            }
            Ok(())
        }
        Some(Command::Speak { text, output, play }) => {
            let config = overrides.load()?;
            let synthesizer = build_synthesizer(&config)?;
            let output =
                output.unwrap_or_else(|| config.voice.output_dir.join(TEXT_REPLY_AUDIO_FILE));
            ensure_parent(&output)?;

            let path = synthesizer.synthesize(&text, &output, None, play).await?;
            println!("Saved {}", path.display());
            Ok(())
        }
    }
}

/// Command-line values that take precedence over env and the config file
struct Overrides {
    language: Option<String>,
    model: Option<String>,
    whisper_model: Option<String>,
}

impl Overrides {
    fn load(self) -> lingua_voice::Result<Config> {
        let mut config = Config::load()?;
        if let Some(language) = self.language {
            config.language = language;
        }
        if let Some(model) = self.model {
            config.chat.model = model;
        }
        if let Some(model) = self.whisper_model {
            config.voice.stt_model = model;
        }
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }
}

fn duration_or(secs: Option<u64>, config: &Config) -> Duration {
    secs.filter(|s| *s > 0)
        .map_or_else(|| config.voice.recording_duration(), Duration::from_secs)
}

fn ensure_parent(path: &std::path::Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
        _ => Ok(()),
    }
}
