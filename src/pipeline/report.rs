//! Console and file reporting around a run.

use crate::config::PipelineSpec;
use crate::data::LabelMatrix;
use crate::eval::{precision_at_k, Prediction};
use crate::Result;
use std::fs;
use std::path::Path;

/// The configuration echo, one `# key: value` line per setting.
pub fn configuration_lines(
    spec: &PipelineSpec,
    embed_dim: usize,
    n_classes: usize,
) -> Vec<String> {
    vec![
        format!("# unit: {}", spec.model.hidden_units),
        format!("# batch-size: {}", spec.training.batch_size),
        format!("# epoch: {}", spec.training.epochs),
        format!("# number of category: {}", n_classes),
        format!("# embedding dimension: {}", embed_dim),
        format!("# current node: {}", spec.node),
        format!("# model-type: {}", spec.model.architecture),
    ]
}

/// Print the run configuration and write it to `configuration_<node>.txt`.
pub fn echo_configuration(
    spec: &PipelineSpec,
    embed_dim: usize,
    n_classes: usize,
    path: &Path,
    quiet: bool,
) -> Result<()> {
    let lines = configuration_lines(spec, embed_dim, n_classes);

    if !quiet {
        println!();
        for line in &lines {
            println!("{line}");
        }
        println!();
    }

    let mut content = lines.join("\n");
    content.push('\n');
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

/// Banner printed before the test phase starts.
pub fn announce_test_phase(quiet: bool) {
    if quiet {
        return;
    }
    println!("{}", "-".repeat(50));
    println!("Testing...");
}

/// Summary after the test phase: sizes, elapsed time, and ranking
/// precision when test labels exist.
pub fn print_test_summary(
    prediction: &Prediction,
    truth: Option<&LabelMatrix>,
    elapsed_secs: f64,
) {
    println!(
        "Predicted {} examples over {} categories in {:.2}s",
        prediction.rows(),
        prediction.n_classes(),
        elapsed_secs
    );
    if let Some(truth) = truth {
        for k in [1, 3, 5] {
            println!(
                "  precision@{}: {:.4}",
                k,
                precision_at_k(prediction, truth, k)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DataConfig, ModelConfig, OptimSpec, TrainingParams};
    use std::path::PathBuf;

    fn sample_spec() -> PipelineSpec {
        PipelineSpec {
            node: "3".to_string(),
            mode: "scratch".to_string(),
            parent_node: None,
            data: DataConfig {
                dataset: PathBuf::from("d.safetensors"),
                embeddings: PathBuf::from("e.safetensors"),
                categories: PathBuf::from("c.json"),
            },
            model: ModelConfig {
                architecture: "xml-cnn".to_string(),
                hidden_units: 256,
                ..ModelConfig::default()
            },
            optimizer: OptimSpec::default(),
            training: TrainingParams {
                batch_size: 64,
                epochs: 25,
                ..TrainingParams::default()
            },
        }
    }

    #[test]
    fn lines_follow_the_echo_format() {
        let lines = configuration_lines(&sample_spec(), 300, 12);
        assert_eq!(
            lines,
            vec![
                "# unit: 256",
                "# batch-size: 64",
                "# epoch: 25",
                "# number of category: 12",
                "# embedding dimension: 300",
                "# current node: 3",
                "# model-type: xml-cnn",
            ]
        );
    }

    #[test]
    fn echo_writes_the_configuration_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("configuration_3.txt");

        echo_configuration(&sample_spec(), 300, 12, &path, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# unit: 256\n"));
        assert!(content.contains("# model-type: xml-cnn\n"));
        // trailing blank line after the last entry
        assert!(content.ends_with("\n\n"));
    }
}
