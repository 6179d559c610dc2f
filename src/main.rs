use clap::{Parser, Subcommand};
use iconcut::editor::Unrendered;
use iconcut::export::DirectorySink;
use iconcut::geometry::CropRect;
use iconcut::imaging::RustBackend;
use iconcut::session::{Completion, Session};
use iconcut::upload::Upload;
use iconcut::{config, output};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ICONCUT_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("ICONCUT_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "iconcut")]
#[command(about = "Crop one image into a full set of platform icons")]
#[command(long_about = "\
Crop one image into a full set of platform icons

Pick a PNG or JPEG, choose the square (or any rectangle) to keep, and render
it at every size a platform needs. Outputs are PNG with transparency kept.

  iconcut platforms                         # list presets and their sizes
  iconcut check logo.png                    # validate, show the default crop
  iconcut generate logo.png --platform ios  # render and bundle as a zip
  iconcut generate logo.png --platform favicon --crop 100,0,600,600 --files

Without --crop the centered largest square is used.

Run 'iconcut gen-config' to generate a documented iconcut.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Directory holding iconcut.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the platform presets
    Platforms {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate and decode an image without rendering
    Check {
        image: PathBuf,
    },
    /// Render a platform's icon set from an image
    Generate {
        image: PathBuf,
        /// Preset id, see `iconcut platforms`
        #[arg(long, short)]
        platform: String,
        /// Crop rectangle in source pixels: X,Y,WIDTH,HEIGHT
        #[arg(long, value_parser = parse_crop)]
        crop: Option<CropRect>,
        /// Output directory (default: [export] output_dir)
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Write each icon as its own file instead of one zip
        #[arg(long)]
        files: bool,
    },
    /// Print a stock iconcut.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Platforms { json } => {
            let config = config::load_config(&cli.config_dir)?;
            let catalog = config.catalog();
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                output::print_platforms(&catalog);
            }
        }
        Command::Check { image } => {
            let config = config::load_config(&cli.config_dir)?;
            let upload = Upload::from_path(&image, &config.upload)?;
            let media_type = upload.effective_media_type().unwrap_or_default();
            let mut session: Session<Unrendered, RustBackend> =
                Session::new(config, RustBackend::new());
            let source = session.load(&upload, Unrendered)?;
            let dimensions = (source.width(), source.height());
            let crop = session.crop().ok_or("no crop after load")?;
            for line in output::format_check(
                &upload.name,
                &media_type,
                upload.bytes.len(),
                dimensions,
                &crop,
            ) {
                println!("{}", line);
            }
        }
        Command::Generate {
            image,
            platform,
            crop,
            out,
            files,
        } => {
            let config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&config.processing);
            let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
            generate(config, &image, &platform, crop, &out_dir, files)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load, crop, render on a worker thread while printing progress, then export.
fn generate(
    config: config::AppConfig,
    image: &Path,
    platform: &str,
    crop: Option<CropRect>,
    out_dir: &Path,
    files: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let upload = Upload::from_path(image, &config.upload)?;
    let mut session: Session<Unrendered, RustBackend> = Session::new(config, RustBackend::new());
    session.load(&upload, Unrendered)?;
    if let Some(rect) = crop {
        session.place_crop(rect)?;
        if let Some(adjusted) = session.crop().filter(|c| *c != rect) {
            log::warn!("crop adjusted to fit the image: {adjusted:?}");
        }
    }

    let job = session.select_platform_id(platform)?;
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let worker = std::thread::spawn(move || job.run(Some(tx)));
    let outcome = worker.join().map_err(|_| "render thread panicked")?;
    printer.join().map_err(|_| "progress printer panicked")?;

    if session.finish(outcome)? == Completion::Stale {
        return Err("render result was superseded".into());
    }
    output::print_outputs(session.outputs());

    let sink = DirectorySink::new(out_dir);
    let written = if files {
        (0..session.outputs().len())
            .map(|i| session.export_single(i, &sink))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        vec![session.export_bundle(&sink)?]
    };
    output::print_export(&written, out_dir);
    Ok(())
}

/// Parse `X,Y,WIDTH,HEIGHT`.
fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid number in crop '{s}': {e}"))?;
    match parts[..] {
        [x, y, w, h] if parts.iter().all(|v| v.is_finite()) => Ok(CropRect::new(x, y, w, h)),
        [_, _, _, _] => Err(format!("crop '{s}' must be finite")),
        _ => Err(format!("crop '{s}' must be X,Y,WIDTH,HEIGHT")),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
