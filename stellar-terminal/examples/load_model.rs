/// Example: Render an STL file as the floating star
///
/// Usage: cargo run --example load_model -- path/to/file.stl
use std::env;
use std::path::PathBuf;
use stellar_core::{assets, AppContext, AssetLoader, ModelSource, SceneConfig};
use stellar_terminal::{AsciiRenderer, TerminalApp};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = SceneConfig::default();
    match env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            // Parse up front so a bad file fails before the screen switches
            let mesh = assets::load_model_source(&ModelSource::Path(path.clone()))?;
            println!("Loaded {} triangles from {}", mesh.triangles.len(), path.display());
            if let Some((min, max)) = mesh.bounds() {
                let size = max - min;
                println!("Extent: {:.2} x {:.2} x {:.2}", size.x, size.y, size.z);
            }
            config.star.model = ModelSource::Path(path);
        }
        None => {
            eprintln!("Usage: load_model <stl-file>");
            eprintln!("\nNo STL file provided, using the built-in star...");
        }
    }

    let (width, height) = crossterm::terminal::size()?;
    let viewport = AsciiRenderer::new(width as usize, height as usize).viewport();
    let context = AppContext::init(config, &AssetLoader::threaded(), viewport)?;

    let mut app = TerminalApp::new(context, None)?;
    app.run()?;

    println!("Thank you for using Stellar!");
    Ok(())
}
