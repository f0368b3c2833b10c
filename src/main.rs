use clap::Parser;
use log::{error, info, warn};

mod cli;
mod logger;

use cli::Args;
use ctray::output::save_image;
use ctray::scene::Scene;
use logger::init_logger;

fn run(args: &Args) -> ctray::Result<()> {
    if args.threads > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(args.threads).build_global() {
            warn!("Could not configure {} worker threads: {}", args.threads, e);
        }
    }

    let mut scene = match &args.scene {
        Some(path) => {
            info!("Loading scene {}", path.display());
            Scene::load(path)?
        }
        None => {
            info!("No scene given, rendering the built-in demo scene");
            Scene::demo()?
        }
    };
    if let Some(width) = args.width {
        scene.width = width;
    }
    if let Some(height) = args.height {
        scene.height = height;
    }
    if scene.width == 0 || scene.height == 0 {
        return Err(ctray::Error::InvalidScene("image size must be positive".into()));
    }

    let (tracer, camera, width, height) = scene.into_tracer();
    let image = tracer.with_progress(!args.quiet).render(&camera, width, height);

    save_image(&image, &args.output)
}

fn main() {
    let args = Args::parse();

    init_logger(args.debug_level.clone().into());

    // Log application startup with version information
    info!("ctray - Git Version {} ({})", env!("GIT_HASH"), env!("GIT_DATE"));

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
