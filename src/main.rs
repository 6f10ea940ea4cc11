mod cli;
mod config;
mod detector;
mod error;
mod model;
mod pipeline;
mod present;

use clap::Parser;
use cli::{Cli, Commands, DetectArgs};
use config::{Config, DetectConfig};
use detector::InferenceRunner;
use error::Result;
use model::{AssetResolver, HfHub, ModelReference};
use pipeline::ModelSource;
use present::OutputFormat;
use std::process::ExitCode;

fn apply_overrides(detect: &mut DetectConfig, args: &DetectArgs) -> Result<()> {
    if let Some(conf) = args.conf {
        detect.confidence = conf;
    }
    if let Some(iou) = args.iou {
        detect.iou = iou;
    }
    if let Some(max_det) = args.max_det {
        detect.max_detections = max_det;
    }
    if let Some(imgsz) = args.imgsz {
        detect.input_size = imgsz;
    }
    if let Some(labels) = &args.labels {
        detect.labels = Some(labels.clone());
    }
    if let Some(device) = &args.device {
        detect.device = device.parse()?;
    }
    detect.validate()
}

fn check_output(args: &DetectArgs) -> Result<()> {
    if args.save.is_some() && matches!(args.format, OutputFormat::Table | OutputFormat::Json) {
        return Err(error::Error::InvalidInput(
            "--save only applies to --format annotate or show".to_string(),
        ));
    }
    Ok(())
}

fn model_source(args: &DetectArgs) -> Result<ModelSource> {
    match (&args.repo, &args.file, &args.model) {
        (Some(repo), Some(file), None) => Ok(ModelSource::Reference(ModelReference::new(
            repo,
            file,
            args.revision.as_deref(),
        )?)),
        (None, None, Some(name)) => Ok(ModelSource::Name(name.clone())),
        _ => Err(error::Error::InvalidInput(
            "Specify the checkpoint with --repo and --file, or with --model".to_string(),
        )),
    }
}

fn resolver(config: &Config) -> Result<AssetResolver<HfHub>> {
    let hub = HfHub::new(&config.hub)?;
    AssetResolver::new(hub, config.registry_path.clone(), config.hub.offline)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if config.config_path.exists() {
        tracing::debug!("Loaded settings from {:?}", config.config_path);
    }

    match cli.command {
        Commands::Pull {
            repo,
            file,
            revision,
            alias,
            offline,
        } => {
            config.hub.offline |= offline;
            let reference = ModelReference::new(&repo, &file, revision.as_deref())?;

            let mut resolver = resolver(&config)?;
            let model = resolver.resolve(&reference, alias)?;

            println!("✓ Successfully pulled model: {}", reference);
            println!("  Repository: {}", model.reference.repo_id());
            println!("  Revision: {}", model.reference.revision());
            println!("  Path: {:?}", model.model_path);
            if let Some(alias) = model.alias {
                println!("  Alias: {}", alias);
            }
        }

        Commands::Detect(args) => {
            config.hub.offline |= args.offline;
            apply_overrides(&mut config.detect, &args)?;
            check_output(&args)?;
            let source = model_source(&args)?;

            let mut resolver = resolver(&config)?;
            let presenter =
                present::presenter_for(args.format, args.save.clone(), &config.scratch_dir());
            let detect_config = config.detect.clone();

            pipeline::detect_once(
                &mut resolver,
                &source,
                |path, model| InferenceRunner::load(path, model, &detect_config),
                &args.image,
                presenter.as_ref(),
            )?;
        }

        Commands::List => {
            let registry = model::ModelRegistry::load(&config.registry_path)?;
            let models = registry.list_models();

            if models.is_empty() {
                println!("No models resolved yet.");
                println!("Use 'hubdetect pull <repo-id> --file <filename>' to download one.");
            } else {
                println!("Resolved models:\n");
                for model in models {
                    println!("  {}", model.key());
                    println!("    Repository: {}", model.reference.repo_id());
                    println!("    File: {}", model.reference.filename());
                    println!("    Revision: {}", model.reference.revision());
                    println!("    Path: {:?}", model.model_path);
                    if !model.model_path.exists() {
                        println!("    (evicted from cache; will be fetched again on use)");
                    }
                    println!("    Resolved: {}", model.resolved_at);
                    println!();
                }
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
