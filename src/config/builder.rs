//! Load specifications and build training components from them

use super::schema::{OptimSpec, PipelineSpec};
use super::validate::validate_config;
use crate::error::{Error, Result};
use crate::optim::{Adam, Optimizer, Sgd};
use std::fs;
use std::path::Path;

/// Load and validate a pipeline spec from a YAML or JSON file
///
/// The format is chosen by extension: `.json` parses as JSON, anything
/// else as YAML.
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<PipelineSpec> {
    let path = config_path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let spec: PipelineSpec = if is_json {
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON config: {}", e)))?
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML config: {}", e)))?
    };

    validate_config(&spec).map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;

    Ok(spec)
}

/// Build optimizer from configuration
pub fn build_optimizer(spec: &OptimSpec) -> Result<Box<dyn Optimizer>> {
    match spec.name.to_lowercase().as_str() {
        "sgd" => {
            let momentum = spec
                .params
                .get("momentum")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0) as f32;

            Ok(Box::new(Sgd::with_momentum(spec.lr, momentum)))
        }
        "adam" => {
            let beta1 = spec
                .params
                .get("beta1")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.9) as f32;

            let beta2 = spec
                .params
                .get("beta2")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.999) as f32;

            let eps = spec
                .params
                .get("eps")
                .and_then(|v| v.as_f64())
                .unwrap_or(1e-8) as f32;

            Ok(Box::new(Adam::new(spec.lr, beta1, beta2, eps)))
        }
        name => Err(Error::Config(format!(
            "Unknown optimizer: {}. Supported: adam, sgd",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn build_optimizer_adam() {
        let mut params = std::collections::HashMap::new();
        params.insert("beta1".to_string(), serde_json::json!(0.9));
        params.insert("beta2".to_string(), serde_json::json!(0.999));

        let spec = OptimSpec {
            name: "adam".to_string(),
            lr: 0.001,
            params,
        };

        let optimizer = build_optimizer(&spec).unwrap();
        assert_eq!(optimizer.lr(), 0.001);
    }

    #[test]
    fn build_optimizer_sgd() {
        let mut params = std::collections::HashMap::new();
        params.insert("momentum".to_string(), serde_json::json!(0.9));

        let spec = OptimSpec {
            name: "sgd".to_string(),
            lr: 0.01,
            params,
        };

        let optimizer = build_optimizer(&spec).unwrap();
        assert_eq!(optimizer.lr(), 0.01);
    }

    #[test]
    fn build_optimizer_ignores_case() {
        let spec = OptimSpec {
            name: "Adam".to_string(),
            lr: 0.002,
            params: std::collections::HashMap::new(),
        };

        let optimizer = build_optimizer(&spec).unwrap();
        assert_eq!(optimizer.lr(), 0.002);
    }

    #[test]
    fn build_optimizer_unknown() {
        let spec = OptimSpec {
            name: "adamax".to_string(),
            lr: 0.001,
            params: std::collections::HashMap::new(),
        };

        let result = build_optimizer(&spec);
        assert!(result.is_err());
    }

    #[test]
    fn load_valid_yaml_config() {
        let yaml = r#"
node: root
data:
  dataset: dataset.safetensors
  embeddings: embeddings.safetensors
  categories: categories.json
training:
  epochs: 5
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let spec = load_config(temp_file.path()).unwrap();
        assert_eq!(spec.node, "root");
        assert_eq!(spec.training.epochs, 5);
    }

    #[test]
    fn load_json_config_by_extension() {
        let json = r#"{
  "node": "root",
  "data": {
    "dataset": "dataset.safetensors",
    "embeddings": "embeddings.safetensors",
    "categories": "categories.json"
  }
}"#;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, json).unwrap();

        let spec = load_config(&path).unwrap();
        assert_eq!(spec.node, "root");
        assert_eq!(spec.optimizer.name, "adam");
    }

    #[test]
    fn load_invalid_config() {
        // batch_size 0 passes parsing but fails validation
        let yaml = r#"
node: root
data:
  dataset: dataset.safetensors
  embeddings: embeddings.safetensors
  categories: categories.json
training:
  batch_size: 0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn load_malformed_yaml() {
        let yaml = "this is not valid yaml: [}";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn load_missing_file() {
        let result = load_config("does-not-exist.yaml");
        assert!(result.is_err());
    }
}
