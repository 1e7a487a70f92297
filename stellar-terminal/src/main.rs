/// Stellar Terminal - rotating star, flowers and a starfield in the terminal
///
/// Controls:
///   - WASD / Arrow Keys: Orbit the camera
///   - +/-: Zoom
///   - HJKL: Pan
///   - R: Reset the view
///   - Q/ESC: Quit
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Mutex;
use stellar_core::{AppContext, AssetLoader, SceneConfig};
use stellar_terminal::{AsciiRenderer, TerminalApp};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stellar-terminal", version, about = "Render the Stellar scene in a terminal")]
struct Cli {
    /// Scene configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Starfield seed, overriding the config
    #[arg(long)]
    seed: Option<u64>,

    /// Target frame rate, overriding the config
    #[arg(long)]
    fps: Option<u32>,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Write logs here instead of stderr (stderr is hidden while the scene is drawn)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_ref())?;

    tracing::info!("Starting stellar-terminal v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.starfield.seed = seed;
    }
    if let Some(fps) = cli.fps {
        config.frame.fps = fps;
    }
    config.validate()?;

    if cli.print_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let (width, height) = crossterm::terminal::size().context("not running in a terminal")?;
    let viewport = AsciiRenderer::new(width as usize, height as usize).viewport();
    let context = AppContext::init(config, &AssetLoader::threaded(), viewport)?;

    let mut app = TerminalApp::new(context, cli.frames)?;
    let frames = app.run()?;

    println!("Rendered {frames} frames. Goodbye from Stellar!");
    Ok(())
}
