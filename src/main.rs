use clap::{Parser, Subcommand};
use model_gal::config::{self, BuildSettings};
use model_gal::{output, pipeline};
use std::path::{Path, PathBuf};

/// Shared flags for commands that publish images.
#[derive(clap::Args, Clone)]
struct CacheArgs {
    /// Ignore the build cache and reprocess every model's image
    #[arg(long)]
    no_cache: bool,
}

#[derive(Parser)]
#[command(name = "model-gal")]
#[command(about = "Catalog builder for a static 3D model gallery")]
#[command(long_about = "\
Catalog builder for a static 3D model gallery

Your filesystem is the data source. Each directory may hold a config.orynt3d
document describing either a model or a release. Release attributes and tags
are inherited by every model nested below the release directory.

Library structure:

  models/
  ├── Collection1/
  │   ├── config.orynt3d           # Release (scanMeta declares release/subscription)
  │   ├── Goblin/
  │   │   ├── config.orynt3d       # Model (modelMeta.name or modelMeta.cover)
  │   │   ├── cover.png            # Preview image
  │   │   └── goblin.stl
  │   └── Orc/
  │       ├── config.orynt3d
  │       └── images/orc.jpg       # Preview found in an image subdirectory
  └── Loose/
      └── config.orynt3d           # Model without a release

Output:

  public/
  ├── data/models.json             # The catalog
  ├── data/build-cache.json        # Incremental build cache (safe to delete)
  └── images/models/               # Published preview images

Preview image search (first match wins):
  fn*.png or *preview*.png → any .png → configured cover → any image
  → images/, thumbnails/, preview/, previews/

Run 'model-gal gen-config' to generate a documented model-gal.toml.")]
#[command(version)]
struct Cli {
    /// Model library root
    #[arg(long, env = "MODELS_ROOT", default_value = "models", global = true)]
    source: PathBuf,

    /// Output directory (catalog, cache, published images)
    #[arg(long, env = "MODEL_GAL_OUTPUT", default_value = "public", global = true)]
    output: PathBuf,

    /// Build config file (ignored when absent)
    #[arg(long, env = "MODEL_GAL_CONFIG", default_value = "model-gal.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the catalog and print it without writing anything
    Scan,
    /// Build the catalog and publish preview images
    Build(CacheArgs),
    /// Print a stock model-gal.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Scan => {
            let settings = load_settings(&cli.config, &cli.source, &cli.output)?;
            println!("==> Scanning {}", settings.source_root.display());
            let (tx, printer) = spawn_printer();
            let catalog = pipeline::dry_run(&settings, Some(&tx));
            drop(tx);
            printer.join().ok();
            output::print_scan_report(&catalog?);
        }
        Command::Build(cache_args) => {
            let settings = load_settings(&cli.config, &cli.source, &cli.output)?;
            println!("==> Building {}", settings.source_root.display());
            let (tx, printer) = spawn_printer();
            let result = pipeline::build(&settings, !cache_args.no_cache, Some(&tx));
            drop(tx);
            printer.join().ok();
            output::print_build_summary(&result?, &settings.catalog_path);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_settings(
    config_path: &Path,
    source: &Path,
    output: &Path,
) -> Result<BuildSettings, config::ConfigError> {
    Ok(config::load_config(config_path)?.settings(source, output))
}

/// Drain build events to stdout on a separate thread.
fn spawn_printer() -> (
    std::sync::mpsc::Sender<pipeline::BuildEvent>,
    std::thread::JoinHandle<()>,
) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_build_event(&event);
        }
    });
    (tx, printer)
}
