use clap::Parser;
use roomscribe::audio::wav::decode_wav;
use roomscribe::config::Config;
use roomscribe::correction::{Corrector, DiscardCorrector, HttpCorrector};
use roomscribe::streaming::pipeline::Pipeline;
use roomscribe::stt::http::HttpTranscriber;
use roomscribe::stt::language::SUPPORTED_LANGUAGES;
use roomscribe::transport::{RoomAudioFrame, StdoutChannel};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

fn version() -> &'static str {
    option_env!("GIT_HASH").unwrap_or(env!("CARGO_PKG_VERSION"))
}

#[derive(Parser, Debug)]
#[command(name = "roomscribe", version = version(), about = "Live media-room transcription worker")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Replay a WAV file through the full pipeline, envelopes to stdout
    Pipe {
        /// WAV file to read; stdin when omitted
        file: Option<PathBuf>,
        /// Frame size fed to the pipeline (ms)
        #[arg(long, default_value_t = 100)]
        frame_ms: u32,
    },
    /// Validate the configuration and print the resolved values
    CheckConfig,
    /// List the supported language codes
    Languages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("roomscribe=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?.with_env_overrides();
    config.validate()?;

    match cli.command {
        Commands::Pipe { file, frame_ms } => pipe(config, file, frame_ms).await,
        Commands::CheckConfig => {
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Languages => {
            for language in SUPPORTED_LANGUAGES {
                println!("{}", language);
            }
            Ok(())
        }
    }
}

/// Replays a WAV file as room frames through the live pipeline.
async fn pipe(config: Config, file: Option<PathBuf>, frame_ms: u32) -> anyhow::Result<()> {
    let reader: Box<dyn Read + Send> = match file {
        Some(path) => Box::new(std::fs::File::open(path)?),
        None => {
            let mut buffer = Vec::new();
            std::io::stdin().lock().read_to_end(&mut buffer)?;
            Box::new(std::io::Cursor::new(buffer))
        }
    };
    let contents = decode_wav(reader)?;

    let corrector: Arc<dyn Corrector> = match &config.correction.endpoint {
        Some(endpoint) if config.correction.enabled => Arc::new(HttpCorrector::new(endpoint)),
        _ => Arc::new(DiscardCorrector),
    };

    let config = Arc::new(config);
    let pipeline = Pipeline::new(
        config.clone(),
        Arc::new(HttpTranscriber::new(&config.stt)),
        Arc::new(StdoutChannel),
        corrector,
    )?;
    let handle = pipeline.start();
    let track = handle.subscribe_track(None)?;

    // Feed interleaved samples in frame_ms blocks at the file's own rate and
    // layout; normalization happens inside the pipeline.
    let samples_per_channel = (contents.sample_rate * frame_ms / 1000).max(1) as usize;
    let frame_len = samples_per_channel * contents.channels as usize;

    for block in contents.samples.chunks(frame_len) {
        let mut data = Vec::with_capacity(block.len() * 2);
        for &sample in block {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        let frame = RoomAudioFrame {
            sample_rate: contents.sample_rate,
            channels: contents.channels,
            samples_per_channel: (block.len() / contents.channels as usize) as u32,
            data,
        };
        if track.send(frame).await.is_err() {
            break;
        }
    }

    drop(track);
    handle.join().await;
    Ok(())
}
