//! Etiquetar CLI
//!
//! Per-node training and prediction entry point.
//!
//! # Usage
//!
//! ```bash
//! # Train a node, then predict its test split
//! etiquetar train config.yaml
//!
//! # Train with overrides
//! etiquetar train config.yaml --node science --epochs 30
//!
//! # Predict from previously trained weights
//! etiquetar predict config.yaml
//!
//! # Validate config
//! etiquetar validate config.yaml
//!
//! # Show config info
//! etiquetar info config.yaml --format json
//! ```

use clap::Parser;
use etiquetar::config::{
    apply_overrides, apply_predict_overrides, load_config, validate_config, Cli, Command,
    OutputFormat,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    let result = match cli.command {
        Command::Train(args) => run_train(args, log_level),
        Command::Predict(args) => run_predict(args, log_level),
        Command::Validate(args) => run_validate(args, log_level),
        Command::Info(args) => run_info(args, log_level),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

fn run_train(args: etiquetar::config::TrainArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Etiquetar: training from {}", args.config.display()),
    );

    // Load and validate config
    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    // Apply command-line overrides
    apply_overrides(&mut spec, &args);

    if args.dry_run {
        log(
            level,
            LogLevel::Normal,
            "Dry run - config validated successfully",
        );
        log(level, LogLevel::Verbose, &format!("  Node: {}", spec.node));
        log(
            level,
            LogLevel::Verbose,
            &format!("  Architecture: {}", spec.model.architecture),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!(
                "  Optimizer: {} (lr={})",
                spec.optimizer.name, spec.optimizer.lr
            ),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!("  Epochs: {}", spec.training.epochs),
        );
        log(
            level,
            LogLevel::Verbose,
            &format!("  Batch size: {}", spec.training.batch_size),
        );
        return Ok(());
    }

    let quiet = level == LogLevel::Quiet;
    etiquetar::pipeline::train(&spec, quiet).map_err(|e| format!("Training error: {e}"))?;

    log(level, LogLevel::Normal, "Training complete!");
    Ok(())
}

fn run_predict(args: etiquetar::config::PredictArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Etiquetar: predicting from {}", args.config.display()),
    );

    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    apply_predict_overrides(&mut spec, &args);

    let quiet = level == LogLevel::Quiet;
    etiquetar::pipeline::predict(&spec, quiet).map_err(|e| format!("Prediction error: {e}"))?;

    log(level, LogLevel::Normal, "Prediction complete!");
    Ok(())
}

fn run_validate(args: etiquetar::config::ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    validate_config(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        println!();
        println!("Configuration Summary:");
        println!("  Node: {}", spec.node);
        println!("  Mode: {}", spec.mode);
        if let Some(parent) = &spec.parent_node {
            println!("  Parent node: {parent}");
        }
        println!();
        println!("  Dataset: {}", spec.data.dataset.display());
        println!("  Embeddings: {}", spec.data.embeddings.display());
        println!("  Categories: {}", spec.data.categories.display());
        println!();
        println!("  Architecture: {}", spec.model.architecture);
        println!("  Out channels: {}", spec.model.out_channels);
        println!("  Hidden units: {}", spec.model.hidden_units);
        println!("  Filter widths: {:?}", spec.model.filter_widths);
        if spec.model.architecture.eq_ignore_ascii_case("xml-cnn") {
            println!("  Pool chunks: {}", spec.model.pool_chunks);
        }
        println!();
        println!("  Optimizer: {}", spec.optimizer.name);
        println!("  Learning rate: {}", spec.optimizer.lr);
        println!();
        println!("  Epochs: {}", spec.training.epochs);
        println!("  Batch size: {}", spec.training.batch_size);
        println!("  Patience: {}", spec.training.patience);
        if let Some(clip) = spec.training.grad_clip {
            println!("  Gradient clipping: {clip}");
        }
        println!("  Output dir: {}", spec.training.output_dir.display());
    }

    Ok(())
}

fn run_info(args: etiquetar::config::InfoArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Configuration Info:");
            println!();
            println!("Node: {} ({})", spec.node, spec.mode);
            println!("Architecture: {}", spec.model.architecture);
            println!(
                "Optimizer: {} (lr={})",
                spec.optimizer.name, spec.optimizer.lr
            );
            println!("Epochs: {}", spec.training.epochs);
            println!("Batch size: {}", spec.training.batch_size);
            println!("Output dir: {}", spec.training.output_dir.display());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&spec)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&spec)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
