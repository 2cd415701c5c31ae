//! Keytone CLI - serve key-press events and play them as notes

use clap::{Parser, Subcommand};
use keytone::audio::{CpalSink, OutputStream};
use keytone::config::Config;
use keytone::event::Envelope;
use keytone::pitch_map::PitchMap;
use keytone::queue::{DrainReport, PlaybackQueue, QueueDrain};
use keytone::server::{run_session, EventServer, SessionFactory};
use keytone::sink::{AudioSink, NullSink};
use keytone::timbre::Timbre;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keytone")]
#[command(about = "Keyboard synthesizer driven by key-press events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct OutputArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Wave type new sessions start with
    #[arg(short, long)]
    wave: Option<String>,

    /// Playback queue capacity
    #[arg(short, long)]
    queue_capacity: Option<usize>,

    /// Discard notes instead of opening the audio device
    #[arg(long)]
    no_audio: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept key-press sessions over TCP, one JSON or single-byte message per line
    Serve {
        #[command(flatten)]
        output: OutputArgs,

        /// Address to listen on (default: 127.0.0.1:8080)
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Run a single session reading messages from stdin
    Play {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the key layout and pitches
    Keys,

    /// List wave types
    Waves,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { output, listen } => {
            let mut config = load_config(&output)?;
            if let Some(listen) = listen {
                config.listen = listen;
            }
            serve(config)
        }
        Commands::Play { output } => {
            let config = load_config(&output)?;
            play_stdin(config)
        }
        Commands::Keys => {
            for (key, freq) in PitchMap::standard().iter() {
                println!("{:>4}  {:8.2} Hz", format!("{:?}", key), freq);
            }
            Ok(())
        }
        Commands::Waves => {
            for timbre in Timbre::ALL {
                let marker = if timbre == Timbre::default() { " (default)" } else { "" };
                println!("{}{}", timbre, marker);
            }
            Ok(())
        }
    }
}

fn load_config(args: &OutputArgs) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(wave) = &args.wave {
        config.default_wave = wave.clone();
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }
    if args.no_audio {
        config.audio = false;
    }
    config.validate()?;
    Ok(config)
}

/// Start the drain thread. The returned stream guard must stay on this thread.
fn start_playback(
    config: &Config,
    drain: QueueDrain,
) -> Result<(JoinHandle<DrainReport>, Option<OutputStream>), Box<dyn std::error::Error>> {
    let (sink, stream): (Box<dyn AudioSink>, Option<OutputStream>) = if config.audio {
        match CpalSink::open(config.sample_rate, config.ring_seconds) {
            Ok((sink, stream)) => {
                info!(
                    "Playing through {} ({} Hz, {} channels)",
                    stream.device_name(),
                    stream.sample_rate(),
                    stream.channels()
                );
                (Box::new(sink), Some(stream))
            }
            Err(e) => {
                warn!("Audio unavailable ({}), notes will be discarded", e);
                (Box::new(NullSink), None)
            }
        }
    } else {
        info!("Audio disabled, notes will be discarded");
        (Box::new(NullSink), None)
    };

    let handle = drain.spawn(sink)?;
    Ok((handle, stream))
}

fn session_factory(
    config: &Config,
    queue: &PlaybackQueue,
) -> Result<SessionFactory, Box<dyn std::error::Error>> {
    let settings = config.note_settings()?;
    info!(
        "Notes: {} samples at {} Hz, sessions start on {}",
        settings.samples_per_note(),
        settings.sample_rate,
        config.default_timbre()
    );
    Ok(SessionFactory::new(
        Arc::new(PitchMap::build()),
        queue.clone(),
        settings,
        config.default_timbre(),
    ))
}

fn finish_playback(queue: PlaybackQueue, handle: JoinHandle<DrainReport>) {
    queue.close();
    match handle.join() {
        Ok(report) => {
            let stats = queue.stats();
            info!(
                "Played {} notes ({} dropped, {} sink errors)",
                report.delivered, stats.dropped, report.sink_errors
            );
        }
        Err(_) => warn!("Playback thread panicked"),
    }
}

fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let (queue, drain) = PlaybackQueue::with_capacity(config.queue_capacity);
    let (handle, _stream) = start_playback(&config, drain)?;
    let sessions = session_factory(&config, &queue)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        let server = EventServer::bind(config.listen.as_str(), sessions).await?;
        server
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            })
            .await
    });

    // Sessions still running hold queue clones; closing stops them queueing more
    finish_playback(queue, handle);
    runtime.shutdown_background();
    result.map_err(Into::into)
}

fn play_stdin(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let (queue, drain) = PlaybackQueue::with_capacity(config.queue_capacity);
    let (handle, _stream) = start_playback(&config, drain)?;
    let sessions = session_factory(&config, &queue)?;

    println!("Keys: {}", PitchMap::standard().keys().collect::<String>());
    println!(
        "Type a key and press Enter, or {}; Ctrl-D quits",
        Envelope::wave("organ").to_json()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async {
        let mut dispatcher = sessions.new_session();
        run_session(tokio::io::BufReader::new(tokio::io::stdin()), &mut dispatcher).await
    });

    finish_playback(queue, handle);
    result.map_err(Into::into)
}
