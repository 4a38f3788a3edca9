/*!
This module defines the `Config` struct, which configures training with `triage train` and `triage serve`. A config is read from a JSON file and every field is optional.

```json
{
	"learning_rate": 0.05,
	"n_rounds": 200,
	"target_columns": ["ddx snomed"]
}
```
*/

use anyhow::{ensure, Context, Result};
use std::path::Path;
use triage_features::PreprocessorOptions;
use triage_tree::TrainOptions;

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	pub learning_rate: f64,
	pub max_depth: usize,
	pub min_examples_per_node: usize,
	pub n_bins: usize,
	pub n_rounds: usize,
	/// This is the number of hashed token count features produced for each text column.
	pub n_buckets: usize,
	/// This is the fraction of rows used for training, with the rest held out for validation. A value outside `[0, 1]` is replaced with 0.8.
	pub train_fraction: f64,
	/// This seeds the shuffle that splits the training and validation rows.
	pub seed: u64,
	/// Rows are merged and predictions are labeled by the values in this column.
	pub id_column: String,
	pub number_columns: Vec<String>,
	pub enum_columns: Vec<String>,
	pub text_columns: Vec<String>,
	pub target_columns: Vec<String>,
}

impl Default for Config {
	fn default() -> Config {
		let train_options = TrainOptions::default();
		let strings = |values: &[&str]| values.iter().map(|value| value.to_string()).collect();
		Config {
			learning_rate: train_options.learning_rate,
			max_depth: train_options.max_depth,
			min_examples_per_node: train_options.min_examples_per_node,
			n_bins: train_options.n_bins,
			n_rounds: 50,
			n_buckets: 100,
			train_fraction: 0.8,
			seed: 42,
			id_column: "master_index".to_owned(),
			number_columns: strings(&["years of experience"]),
			enum_columns: strings(&[
				"county",
				"health level",
				"nursing competency",
				"clinical panel",
			]),
			text_columns: strings(&["prompt"]),
			target_columns: strings(&["clinician", "gpt4.0", "llama", "gemini", "ddx snomed"]),
		}
	}
}

impl Config {
	/// Read and validate the config at `path`, or use the default config if there is no path.
	pub fn from_path(path: Option<&Path>) -> Result<Config> {
		let config = match path {
			Some(path) => {
				let json = std::fs::read_to_string(path)
					.with_context(|| format!("failed to read config {}", path.display()))?;
				Config::from_json(&json)
					.with_context(|| format!("invalid config {}", path.display()))?
			}
			None => Config::default(),
		};
		Ok(config)
	}

	pub fn from_json(json: &str) -> Result<Config> {
		let config: Config = serde_json::from_str(json)?;
		config.validate()?;
		Ok(config)
	}

	/// The tree builder assumes these hold, so they are checked here before any training starts.
	pub fn validate(&self) -> Result<()> {
		ensure!(
			self.learning_rate > 0.0 && self.learning_rate.is_finite(),
			"learning_rate must be a positive number, got {}",
			self.learning_rate
		);
		ensure!(self.n_bins >= 2, "n_bins must be at least 2, got {}", self.n_bins);
		ensure!(
			self.min_examples_per_node >= 1,
			"min_examples_per_node must be at least 1"
		);
		ensure!(self.n_buckets >= 1, "n_buckets must be at least 1");
		ensure!(
			!self.target_columns.is_empty(),
			"at least one target column is required"
		);
		Ok(())
	}

	pub fn train_options(&self) -> TrainOptions {
		TrainOptions {
			compute_loss: true,
			learning_rate: self.learning_rate,
			max_depth: self.max_depth,
			min_examples_per_node: self.min_examples_per_node,
			n_bins: self.n_bins,
		}
	}

	pub fn preprocessor_options(&self) -> PreprocessorOptions {
		PreprocessorOptions {
			number_columns: self.number_columns.clone(),
			enum_columns: self.enum_columns.clone(),
			text_columns: self.text_columns.clone(),
			target_columns: self.target_columns.clone(),
			n_buckets: self.n_buckets,
		}
	}
}

#[test]
fn test_partial_config() {
	let config = Config::from_json(r#"{ "learning_rate": 0.05, "n_rounds": 200 }"#).unwrap();
	assert_eq!(config.learning_rate, 0.05);
	assert_eq!(config.n_rounds, 200);
	assert_eq!(config.max_depth, 3);
	assert_eq!(config.seed, 42);
	assert_eq!(config.target_columns.len(), 5);
	assert_eq!(config.target_columns[4], "ddx snomed");
}

#[test]
fn test_invalid_config() {
	let error = |json| Config::from_json(json).unwrap_err().to_string();
	assert_eq!(error(r#"{ "n_bins": 1 }"#), "n_bins must be at least 2, got 1");
	assert_eq!(
		error(r#"{ "learning_rate": 0.0 }"#),
		"learning_rate must be a positive number, got 0"
	);
	assert_eq!(
		error(r#"{ "min_examples_per_node": 0 }"#),
		"min_examples_per_node must be at least 1"
	);
	assert_eq!(
		error(r#"{ "target_columns": [] }"#),
		"at least one target column is required"
	);
	assert!(Config::from_json(r#"{ "n_trees": 10 }"#).is_err());
	assert!(Config::from_json(r#"{ "n_bins": "many" }"#).is_err());
}

#[test]
fn test_missing_config_file() {
	let error = Config::from_path(Some(Path::new("does/not/exist.json"))).unwrap_err();
	assert_eq!(error.to_string(), "failed to read config does/not/exist.json");
	assert!(Config::from_path(None).is_ok());
}
