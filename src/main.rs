use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod audio;
mod color;
mod config;
mod control;
mod display;
mod ipc;
mod renderer;

use audio::Pattern;
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "bitwave")]
#[command(author, version, about = "Audio player with a real-time spectrum visualizer")]
pub struct Args {
    /// Config file path (default: ~/.config/bitwave/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a default config file to ~/.config/bitwave/config.toml and exit
    #[arg(long)]
    init_config: bool,

    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completions: Option<clap_complete::Shell>,

    /// Send a command to a running instance (e.g. "toggle emboss", "volume 0.3")
    #[arg(long, value_name = "COMMAND")]
    send: Option<String>,

    /// Track to play; repeat to build the track list
    #[arg(short, long)]
    pub track: Vec<PathBuf>,

    /// Analysis window size (power of two, 32-32768)
    #[arg(long)]
    pub fft_size: Option<usize>,

    /// Output volume (0.0-1.0)
    #[arg(short, long)]
    pub gain: Option<f32>,

    /// Canvas width in pixels
    #[arg(long)]
    pub width: Option<usize>,

    /// Canvas height in pixels
    #[arg(long)]
    pub height: Option<usize>,

    /// Target frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Chance that a pixel turns red when noise is on (0.0-1.0)
    #[arg(long)]
    pub noise_probability: Option<f64>,

    /// Gradient overlay on/off
    #[arg(long, value_name = "BOOL")]
    pub gradient: Option<bool>,

    /// Frequency bars on/off
    #[arg(long, value_name = "BOOL")]
    pub bars: Option<bool>,

    /// Concentric circles on/off
    #[arg(long, value_name = "BOOL")]
    pub circles: Option<bool>,

    /// Red pixel noise on/off
    #[arg(long, value_name = "BOOL")]
    pub noise: Option<bool>,

    /// Colour inversion on/off
    #[arg(long, value_name = "BOOL")]
    pub invert: Option<bool>,

    /// Emboss filter on/off
    #[arg(long, value_name = "BOOL")]
    pub emboss: Option<bool>,

    /// Render headlessly and write the final frame to this PNG file
    #[arg(long, value_name = "PNG")]
    snapshot: Option<PathBuf>,

    /// Frames to render in snapshot mode
    #[arg(long, default_value = "60")]
    frames: u32,

    /// Synthetic spectrum used in snapshot mode
    #[arg(long, value_enum, default_value_t = Pattern::Alternate)]
    pattern: Pattern,

    /// Write logs to this file while the terminal UI is running
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Log to stderr for headless commands. The terminal UI owns the screen, so
/// interactive runs log to `--log-file` or nowhere.
fn init_logging(args: &Args, interactive: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("bitwave=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match (&args.log_file, interactive) {
        (Some(path), _) => {
            let file = std::fs::File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        (None, true) => builder.with_writer(std::io::sink).init(),
        (None, false) => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "bitwave", &mut std::io::stdout());
        return Ok(());
    }

    let interactive = args.send.is_none() && args.snapshot.is_none() && !args.init_config;
    init_logging(&args, interactive)?;

    if args.init_config {
        let path = Config::init_default_config()?;
        println!("Config written to {}", path.display());
        return Ok(());
    }

    if let Some(command) = &args.send {
        let response = ipc::send_command(command).await?;
        println!("{}", response);
        return Ok(());
    }

    // Load config: explicit path > XDG default > built-in defaults
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default_path().unwrap_or_default(),
    };
    config.merge_args(&args);
    config.validate()?;

    if let Some(path) = &args.snapshot {
        return display::snapshot::run(&config, path, args.frames, args.pattern);
    }

    info!("Starting bitwave with {} track(s)", config.tracks.len());
    display::terminal::run(config).await
}
