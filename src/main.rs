use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};

use audio_cue_service::audio_system::player::{open_output, ClipBank, RodioVoiceFactory};
use audio_cue_service::audio_system::{HeadlessVoiceFactory, VoiceFactory};
use audio_cue_service::{AppResult, AudioService, CueLibrary, PlayOrder, ServiceConfig};

const LOG_TARGET_STARTUP: &str = "audio_cue_service::startup";

/// Fade applied when `--fade-ms` cuts playback short
const FADE_OUT: Duration = Duration::from_millis(500);

const USAGE: &str = "Usage: cue-service <config.json> <cue> [--headless] [--fade-ms N] [--seed N]";

#[derive(Debug)]
struct CliArgs {
    config_path: PathBuf,
    cue: String,
    headless: bool,
    fade_after: Option<Duration>,
    seed: Option<u64>,
}

impl CliArgs {
    fn parse(args: &[String]) -> AppResult<Self> {
        let mut positional = Vec::new();
        let mut headless = false;
        let mut fade_after = None;
        let mut seed = None;

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--headless" => headless = true,
                "--fade-ms" => {
                    let value = iter.next().context("--fade-ms needs a value")?;
                    let ms: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid --fade-ms value '{}'", value))?;
                    fade_after = Some(Duration::from_millis(ms));
                }
                "--seed" => {
                    let value = iter.next().context("--seed needs a value")?;
                    seed = Some(
                        value
                            .parse()
                            .with_context(|| format!("Invalid --seed value '{}'", value))?,
                    );
                }
                flag if flag.starts_with("--") => bail!("Unknown option '{}'", flag),
                _ => positional.push(arg.clone()),
            }
        }

        let [config_path, cue] = positional.as_slice() else {
            bail!("Expected a config path and a cue name");
        };

        Ok(Self {
            config_path: PathBuf::from(config_path),
            cue: cue.clone(),
            headless,
            fade_after,
            seed,
        })
    }
}

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/AudioCueService/logs/`, one file per day
/// (`cue-service.YYYY-MM-DD.log`). Debug builds also log to the console.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("AudioCueService").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "cue-service.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn main() {
    initialize_tracing();
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting cue-service v{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match CliArgs::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&cli) {
        tracing::error!("cue-service failed: {:#}", e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &CliArgs) -> AppResult<()> {
    let config = ServiceConfig::load(&cli.config_path).context("Failed to load configuration")?;
    println!("✓ Configuration loaded");
    println!("  Clips: {}  Cues: {}", config.clips.len(), config.cues.len());

    let mut library = CueLibrary::from_config(&config).context("Invalid cue definitions")?;
    if let Some(seed) = cli.seed {
        library.reseed(seed);
    }

    if cli.headless {
        let service = AudioService::with_library(&config, library, HeadlessVoiceFactory::default())
            .context("Failed to start headless service")?;
        println!("✓ Headless backend ready");
        return play_once(&service, cli);
    }

    let base_dir = cli.config_path.parent().unwrap_or(Path::new("."));
    let bank = ClipBank::from_config(&config, base_dir).context("Failed to load clips")?;
    let (_stream, handle) = open_output().context("No audio output device")?;
    let factory = RodioVoiceFactory::new(handle, config.listener, bank);

    let service = AudioService::with_library(&config, library, factory)
        .context("Failed to start audio service")?;
    println!("✓ Audio output ready");
    play_once(&service, cli)
}

fn play_once<F>(service: &AudioService<F>, cli: &CliArgs) -> AppResult<()>
where
    F: VoiceFactory + Send + 'static,
    F::Voice: Send,
{
    service.start();

    let orders = service
        .play_cue(&cli.cue)
        .with_context(|| format!("Failed to play cue '{}'", cli.cue))?;
    for order in &orders {
        println!("▶ {} '{}'", order.id(), order.clip());
    }

    if let Some(fade_after) = cli.fade_after {
        thread::sleep(fade_after);
        for order in &orders {
            service.fade_stop(order, FADE_OUT);
        }
    }

    while !orders.iter().all(|o| o.state().is_terminal()) {
        thread::sleep(Duration::from_millis(10));
    }

    report(&orders);
    service.shutdown();
    Ok(())
}

fn report(orders: &[PlayOrder]) {
    for order in orders {
        println!("  {} '{}': {}", order.id(), order.clip(), order.state().description());
    }
}
