//! End-to-end per-node runs.
//!
//! [`train`] takes a validated spec through the whole cycle: echo the
//! configuration, build the model for the requested mode, fit with early
//! stopping while snapshotting the best validation epoch, promote that
//! snapshot into the params directory, then reload it and predict the
//! test split. [`predict`] runs the test phase alone from a previously
//! promoted snapshot.

mod plot;
mod report;

pub use plot::{render_loss_plot, write_loss_plot};
pub use report::{
    announce_test_phase, configuration_lines, echo_configuration, print_test_summary,
};

use crate::config::{build_optimizer, validate_config, PipelineSpec};
use crate::data::{load_categories, load_dataset, load_embeddings, validate_tokens, Dataset};
use crate::error::{Error, Result};
use crate::eval::{run_test_phase, write_label_csv, write_probability_csv, Prediction};
use crate::io::load_snapshot;
use crate::model::{build_model, restore_parameters, transfer_parameters, ModelParams};
use crate::train::{
    BatchProgress, BceWithLogits, ConsoleReport, EarlyStopping, Evaluator, LogReport, TrainConfig,
    Trainer,
};
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Directory layout of one run.
///
/// Everything lives under the configured output directory: logs and the
/// loss chart under `log/`, promoted weights under `params/`, prediction
/// files under `result/`. The trainer writes its working snapshot at the
/// root until it is promoted.
pub struct RunPaths {
    out: PathBuf,
}

impl RunPaths {
    pub fn new(out: impl Into<PathBuf>) -> Self {
        Self { out: out.into() }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out
    }

    pub fn log_dir(&self) -> PathBuf {
        self.out.join("log")
    }

    pub fn params_dir(&self) -> PathBuf {
        self.out.join("params")
    }

    pub fn result_dir(&self) -> PathBuf {
        self.out.join("result")
    }

    /// Create the full directory tree.
    pub fn create_all(&self) -> Result<()> {
        fs::create_dir_all(&self.out)?;
        fs::create_dir_all(self.log_dir())?;
        fs::create_dir_all(self.params_dir())?;
        fs::create_dir_all(self.result_dir())?;
        Ok(())
    }

    pub fn configuration_file(&self, node: &str) -> PathBuf {
        self.log_dir().join(format!("configuration_{node}.txt"))
    }

    pub fn log_report(&self, node: &str) -> PathBuf {
        self.log_dir().join(format!("log_{node}.json"))
    }

    pub fn loss_plot(&self, node: &str) -> PathBuf {
        self.log_dir().join(format!("loss_{node}.svg"))
    }

    /// Where the trainer drops the best snapshot while fitting.
    pub fn working_snapshot(&self, node: &str) -> PathBuf {
        self.out.join(format!("model_{node}.safetensors"))
    }

    /// Final home of a node's weights after training finishes.
    pub fn snapshot(&self, node: &str) -> PathBuf {
        self.params_dir().join(format!("model_{node}.safetensors"))
    }

    pub fn probability_csv(&self, node: &str) -> PathBuf {
        self.result_dir().join(format!("probability_{node}.csv"))
    }

    pub fn label_csv(&self, node: &str) -> PathBuf {
        self.result_dir().join(format!("labels_{node}.csv"))
    }
}

/// Train one node's classifier, then predict the test split.
///
/// Returns the thresholded predictions; the probability and label CSVs,
/// the per-epoch log, the configuration echo, and the loss chart are all
/// written under the run's output directory along the way.
pub fn train(spec: &PipelineSpec, quiet: bool) -> Result<Prediction> {
    validate_config(spec).map_err(|e| Error::Config(e.to_string()))?;
    let paths = RunPaths::new(&spec.training.output_dir);
    paths.create_all()?;

    let (dataset, embeddings, categories) = load_inputs(spec)?;
    let embed_dim = embeddings.ncols();
    let n_classes = dataset.n_classes();

    echo_configuration(
        spec,
        embed_dim,
        n_classes,
        &paths.configuration_file(&spec.node),
        quiet,
    )?;

    let params = model_params(spec, embeddings, n_classes);
    let mut model = build_model(&spec.model.architecture, &params, spec.model.seed);

    if spec.mode == "fine-tune" {
        let Some(parent) = spec.parent_node.as_deref() else {
            return Err(Error::Config(
                "mode 'fine-tune' requires parent_node".to_string(),
            ));
        };
        let parent_path = paths.snapshot(parent);
        if !parent_path.exists() {
            return Err(Error::Config(format!(
                "no snapshot for parent node '{parent}' at {}",
                parent_path.display()
            )));
        }
        let snapshot = load_snapshot(&parent_path)?;
        let moved = transfer_parameters(model.as_mut(), &snapshot);
        if !quiet {
            println!("Transferred {moved} parameters from node '{parent}'");
        }
    }

    let optimizer = build_optimizer(&spec.optimizer)?;
    let mut config = TrainConfig::new(spec.training.epochs, spec.training.batch_size)
        .with_snapshot(paths.working_snapshot(&spec.node), &spec.node);
    if let Some(clip) = spec.training.grad_clip {
        config = config.with_grad_clip(clip);
    }

    let mut trainer = Trainer::new(model, optimizer, Box::new(BceWithLogits), config);
    if !quiet {
        trainer.add_callback(ConsoleReport);
    }
    trainer.add_callback(BatchProgress::new(spec.training.progress && !quiet));
    trainer.add_callback(LogReport::new(paths.log_report(&spec.node)));
    trainer.add_callback(EarlyStopping::new(
        spec.training.patience,
        spec.training.min_delta,
    ));

    let evaluator = Evaluator::new(&dataset.x_val, &dataset.y_val, spec.training.batch_size);
    trainer.train(&dataset.x_train, &dataset.y_train, Some(&evaluator))?;

    write_loss_plot(
        paths.loss_plot(&spec.node),
        &trainer.metrics.losses,
        &trainer.metrics.val_losses,
    )?;

    promote_snapshot(
        &paths.working_snapshot(&spec.node),
        &paths.snapshot(&spec.node),
    )?;

    run_saved_model(spec, &paths, &params, &dataset, &categories, quiet)
}

/// Predict the test split from a node's promoted snapshot, without
/// training. Fails when the node has not been trained yet.
pub fn predict(spec: &PipelineSpec, quiet: bool) -> Result<Prediction> {
    validate_config(spec).map_err(|e| Error::Config(e.to_string()))?;
    let paths = RunPaths::new(&spec.training.output_dir);
    paths.create_all()?;

    let (dataset, embeddings, categories) = load_inputs(spec)?;
    let params = model_params(spec, embeddings, dataset.n_classes());
    run_saved_model(spec, &paths, &params, &dataset, &categories, quiet)
}

/// Load the three input files and cross-check them against each other
/// and the model configuration.
fn load_inputs(spec: &PipelineSpec) -> Result<(Dataset, Array2<f32>, Vec<String>)> {
    let dataset = load_dataset(&spec.data.dataset)?;
    let embeddings = load_embeddings(&spec.data.embeddings)?;
    let categories = load_categories(&spec.data.categories)?;

    validate_tokens(&dataset, embeddings.nrows())?;

    if categories.len() != dataset.n_classes() {
        return Err(Error::Data(format!(
            "category list has {} names but the dataset has {} label columns",
            categories.len(),
            dataset.n_classes()
        )));
    }

    check_sequence_lengths(spec, &dataset)?;

    Ok((dataset, embeddings, categories))
}

/// Every non-empty split must be long enough for the widest filter, and
/// for xml-cnn also for the pooling chunks cut from its positions.
fn check_sequence_lengths(spec: &PipelineSpec, dataset: &Dataset) -> Result<()> {
    let max_width = spec.model.filter_widths.iter().copied().max().unwrap_or(1);
    let needed = if spec.model.architecture.eq_ignore_ascii_case("xml-cnn") {
        max_width + spec.model.pool_chunks - 1
    } else {
        max_width
    };

    for (name, rows, seq_len) in [
        ("x_train", dataset.x_train.rows(), dataset.x_train.seq_len()),
        ("x_val", dataset.x_val.rows(), dataset.x_val.seq_len()),
        ("x_test", dataset.x_test.rows(), dataset.x_test.seq_len()),
    ] {
        if rows > 0 && seq_len < needed {
            return Err(Error::Data(format!(
                "{name} sequences are {seq_len} tokens long but the model needs at least {needed}"
            )));
        }
    }
    Ok(())
}

fn model_params(spec: &PipelineSpec, embeddings: Array2<f32>, n_classes: usize) -> ModelParams {
    ModelParams {
        out_channels: spec.model.out_channels,
        hidden_units: spec.model.hidden_units,
        n_classes,
        batch_size: spec.training.batch_size,
        filter_widths: spec.model.filter_widths.clone(),
        pool_chunks: spec.model.pool_chunks,
        embeddings,
    }
}

/// Move the trainer's working snapshot into the params directory.
fn promote_snapshot(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems; copy and remove instead
    fs::copy(from, to)?;
    fs::remove_file(from)?;
    Ok(())
}

/// Rebuild the model from the promoted snapshot and run the test phase,
/// writing the probability and label CSVs.
fn run_saved_model(
    spec: &PipelineSpec,
    paths: &RunPaths,
    params: &ModelParams,
    dataset: &Dataset,
    categories: &[String],
    quiet: bool,
) -> Result<Prediction> {
    let snapshot_path = paths.snapshot(&spec.node);
    if !snapshot_path.exists() {
        return Err(Error::Config(format!(
            "no trained snapshot for node '{}' at {}; run train first",
            spec.node,
            snapshot_path.display()
        )));
    }
    let snapshot = load_snapshot(&snapshot_path)?;
    let mut model = build_model(&spec.model.architecture, params, spec.model.seed);
    restore_parameters(model.as_mut(), &snapshot)?;

    announce_test_phase(quiet);
    let started = Instant::now();
    let prediction = run_test_phase(
        model.as_ref(),
        &dataset.x_test,
        spec.training.batch_size,
        spec.training.progress && !quiet,
    );

    write_probability_csv(paths.probability_csv(&spec.node), categories, &prediction)?;
    write_label_csv(paths.label_csv(&spec.node), categories, &prediction)?;

    if !quiet {
        print_test_summary(
            &prediction,
            dataset.y_test.as_ref(),
            started.elapsed().as_secs_f64(),
        );
    }
    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, ModelConfig, OptimSpec, TrainingParams};
    use crate::data::{LabelMatrix, TokenMatrix};

    fn spec_with_arch(architecture: &str) -> PipelineSpec {
        PipelineSpec {
            node: "root".to_string(),
            mode: "scratch".to_string(),
            parent_node: None,
            data: DataConfig {
                dataset: PathBuf::from("d.safetensors"),
                embeddings: PathBuf::from("e.safetensors"),
                categories: PathBuf::from("c.json"),
            },
            model: ModelConfig {
                architecture: architecture.to_string(),
                filter_widths: vec![2, 4],
                pool_chunks: 2,
                ..ModelConfig::default()
            },
            optimizer: OptimSpec::default(),
            training: TrainingParams::default(),
        }
    }

    fn dataset_with_seq_len(seq_len: usize) -> Dataset {
        let x = TokenMatrix::new(1, seq_len, vec![0; seq_len]);
        let y = LabelMatrix::new(1, 2, vec![1.0, 0.0]);
        Dataset {
            x_train: x.clone(),
            y_train: y.clone(),
            x_val: x.clone(),
            y_val: y.clone(),
            x_test: x,
            y_test: Some(y),
        }
    }

    #[test]
    fn paths_follow_the_node_naming_scheme() {
        let paths = RunPaths::new("/tmp/run");

        assert_eq!(
            paths.configuration_file("3"),
            PathBuf::from("/tmp/run/log/configuration_3.txt")
        );
        assert_eq!(
            paths.log_report("3"),
            PathBuf::from("/tmp/run/log/log_3.json")
        );
        assert_eq!(
            paths.loss_plot("3"),
            PathBuf::from("/tmp/run/log/loss_3.svg")
        );
        assert_eq!(
            paths.working_snapshot("3"),
            PathBuf::from("/tmp/run/model_3.safetensors")
        );
        assert_eq!(
            paths.snapshot("3"),
            PathBuf::from("/tmp/run/params/model_3.safetensors")
        );
        assert_eq!(
            paths.probability_csv("3"),
            PathBuf::from("/tmp/run/result/probability_3.csv")
        );
        assert_eq!(
            paths.label_csv("3"),
            PathBuf::from("/tmp/run/result/labels_3.csv")
        );
    }

    #[test]
    fn create_all_builds_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::new(dir.path().join("run"));

        paths.create_all().unwrap();

        assert!(paths.log_dir().is_dir());
        assert!(paths.params_dir().is_dir());
        assert!(paths.result_dir().is_dir());
    }

    #[test]
    fn promote_moves_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("model_0.safetensors");
        let to = dir.path().join("params").join("model_0.safetensors");
        fs::create_dir_all(to.parent().unwrap()).unwrap();
        fs::write(&from, b"weights").unwrap();

        promote_snapshot(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"weights");
    }

    #[test]
    fn sequence_length_checked_against_widest_filter() {
        let spec = spec_with_arch("cnn");

        // widest filter is 4
        assert!(check_sequence_lengths(&spec, &dataset_with_seq_len(4)).is_ok());
        let err = check_sequence_lengths(&spec, &dataset_with_seq_len(3)).unwrap_err();
        assert!(err.to_string().contains("at least 4"));
    }

    #[test]
    fn xml_cnn_needs_room_for_pool_chunks() {
        let spec = spec_with_arch("xml-cnn");

        // widest filter 4 plus chunks 2 needs 5 positions of context
        assert!(check_sequence_lengths(&spec, &dataset_with_seq_len(5)).is_ok());
        let err = check_sequence_lengths(&spec, &dataset_with_seq_len(4)).unwrap_err();
        assert!(err.to_string().contains("at least 5"));
    }

    #[test]
    fn predict_without_snapshot_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RunPaths::new(dir.path());
        paths.create_all().unwrap();

        let spec = spec_with_arch("cnn");
        let params = model_params(&spec, ndarray::arr2(&[[0.0, 0.0], [0.5, 0.5]]), 2);
        let dataset = dataset_with_seq_len(4);

        let err = run_saved_model(&spec, &paths, &params, &dataset, &[], true).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("run train first"));
    }
}
