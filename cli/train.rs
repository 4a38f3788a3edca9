use crate::{config::Config, TrainArgs};
use anyhow::{ensure, Context, Result};
use ndarray::prelude::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::{io::Write, path::Path};
use tracing::{debug, info};
use triage_dataframe::{shuffle_split, Table};
use triage_features::{clamp_class, Preprocessor};
use triage_metrics::{Accuracy, MeanSquaredError, StreamingMetric};
use triage_tree::{Booster, TrainProgress};

pub fn train(args: TrainArgs) -> Result<()> {
	let config = Config::from_path(args.config.as_deref())?;

	// Load the training data and fit the preprocessor on all of it.
	let table = load_table(&args.train, args.train_extra.as_deref(), &config.id_column)?;
	ensure!(table.n_rows() > 0, "no training rows after merging");
	info!(n_rows = table.n_rows(), "loaded training data");
	let preprocessor = Preprocessor::fit(&table, &config.preprocessor_options());
	let (features, labels) = preprocessor.transform(&table);

	// Hold out a seeded random subset of the rows for validation.
	let mut rng = Xoshiro256Plus::seed_from_u64(config.seed);
	let (train_indexes, validation_indexes) =
		shuffle_split(table.n_rows(), config.train_fraction, &mut rng);
	info!(
		n_train = train_indexes.len(),
		n_validation = validation_indexes.len(),
		"split training data"
	);
	let features_train = features.select(Axis(0), &train_indexes);
	let labels_train = labels.select(Axis(0), &train_indexes);
	let features_validation = features.select(Axis(0), &validation_indexes);
	let labels_validation = labels.select(Axis(0), &validation_indexes);

	let booster = fit_booster(&config, features_train.view(), labels_train.view());
	log_validation_metrics(&compute_validation_metrics(
		&booster,
		&preprocessor,
		features_validation.view(),
		labels_validation.view(),
	));

	// Predict the test data if there is any.
	if let Some(test) = args.test.as_deref() {
		let test_table = load_table(test, args.test_extra.as_deref(), &config.id_column)?;
		ensure!(test_table.n_rows() > 0, "no test rows after merging");
		info!(n_rows = test_table.n_rows(), "loaded test data");
		let test_features = preprocessor.transform_features(&test_table);
		let predictions = booster.predict_batch(test_features.view());
		let mut writer = csv::Writer::from_path(&args.output)
			.with_context(|| format!("failed to create {}", args.output.display()))?;
		write_predictions(
			&mut writer,
			&test_table,
			&config.id_column,
			&preprocessor,
			predictions.view(),
		)?;
		writer.flush()?;
		info!(path = %args.output.display(), "wrote predictions");
	}

	Ok(())
}

/// Load a table and merge an extra table into it by the id column. Rows in the extra table replace rows with the same id.
pub fn load_table(path: &Path, extra_path: Option<&Path>, id_column: &str) -> Result<Table> {
	let read = |path: &Path| {
		Table::from_path(path).with_context(|| format!("failed to read {}", path.display()))
	};
	let table = read(path)?;
	match extra_path {
		Some(extra_path) => {
			let extra = read(extra_path)?;
			Ok(Table::merge_by_key(&table, &extra, id_column)?)
		}
		None => Ok(table),
	}
}

pub fn fit_booster(config: &Config, features: ArrayView2<f64>, labels: ArrayView2<f64>) -> Booster {
	let mut booster = Booster::new(labels.ncols(), config.train_options());
	booster.fit(features, labels, config.n_rounds, &mut |progress| match progress {
		TrainProgress::Training { round, n_rounds } => {
			debug!(round = round + 1, n_rounds, "training round");
		}
		TrainProgress::Trained { round, losses } => {
			debug!(round = round + 1, ?losses, "trained round");
		}
	});
	info!(
		n_rounds = booster.n_rounds_trained(),
		n_targets = booster.n_targets(),
		"training complete"
	);
	booster
}

#[derive(Debug, PartialEq)]
pub struct TargetMetrics {
	pub column_name: String,
	/// The fraction of rows whose rounded and clamped prediction is the label's class. This is `None` if there are no rows.
	pub accuracy: Option<f64>,
	/// The mean squared error between the raw predictions and the class codes. This is `None` if there are no rows.
	pub mean_squared_error: Option<f64>,
}

pub fn compute_validation_metrics(
	booster: &Booster,
	preprocessor: &Preprocessor,
	features: ArrayView2<f64>,
	labels: ArrayView2<f64>,
) -> Vec<TargetMetrics> {
	let predictions = booster.predict_batch(features);
	preprocessor
		.targets()
		.iter()
		.enumerate()
		.map(|(target_index, target)| {
			let n_classes = target.encoder.n_classes();
			let mut accuracy = Accuracy::new();
			let mut mean_squared_error = MeanSquaredError::new();
			for (prediction, label) in predictions
				.column(target_index)
				.iter()
				.zip(labels.column(target_index).iter())
			{
				// Labels not seen when the encoder was fit are encoded as -1 and have no class.
				let label_class = if *label >= 0.0 {
					Some(*label as usize)
				} else {
					None
				};
				accuracy.update((clamp_class(*prediction, n_classes), label_class));
				mean_squared_error.update((*prediction, *label));
			}
			TargetMetrics {
				column_name: target.column_name.clone(),
				accuracy: accuracy.finalize(),
				mean_squared_error: mean_squared_error.finalize(),
			}
		})
		.collect()
}

fn log_validation_metrics(metrics: &[TargetMetrics]) {
	for metrics in metrics.iter() {
		match (metrics.accuracy, metrics.mean_squared_error) {
			(Some(accuracy), Some(mean_squared_error)) => info!(
				column = %metrics.column_name,
				accuracy = %format!("{:.2}%", accuracy * 100.0),
				mean_squared_error,
				"validation"
			),
			_ => info!(column = %metrics.column_name, "no validation data"),
		}
	}
}

/// Write one row for each row of `table` holding its id followed by the decoded prediction for each target.
pub fn write_predictions<W>(
	writer: &mut csv::Writer<W>,
	table: &Table,
	id_column: &str,
	preprocessor: &Preprocessor,
	predictions: ArrayView2<f64>,
) -> Result<()>
where
	W: Write,
{
	let targets = preprocessor.targets();
	let mut header = vec![id_column];
	header.extend(targets.iter().map(|target| target.column_name.as_str()));
	writer.write_record(&header)?;
	for (row_index, predictions) in predictions.axis_iter(Axis(0)).enumerate() {
		let mut record = vec![table.get(row_index, id_column)];
		for (target, prediction) in targets.iter().zip(predictions.iter()) {
			record.push(target.encoder.decode(*prediction).unwrap_or(""));
		}
		writer.write_record(&record)?;
	}
	Ok(())
}

#[cfg(test)]
fn test_config() -> Config {
	Config {
		learning_rate: 0.5,
		min_examples_per_node: 1,
		n_rounds: 20,
		n_buckets: 8,
		id_column: "id".to_owned(),
		number_columns: vec!["years".to_owned()],
		enum_columns: vec!["county".to_owned()],
		text_columns: vec!["prompt".to_owned()],
		target_columns: vec!["diagnosis".to_owned()],
		..Default::default()
	}
}

#[cfg(test)]
fn test_table() -> Table {
	let csv = "id,years,county,prompt,diagnosis
a,1,kiambu,fever chills,Malaria
b,2,nairobi,cough,Pneumonia
c,3,kiambu,fever,Malaria
d,4,nairobi,dry cough,Pneumonia
";
	Table::from_csv(std::io::Cursor::new(csv)).unwrap()
}

#[test]
fn test_validation_metrics() {
	let config = test_config();
	let table = test_table();
	let preprocessor = Preprocessor::fit(&table, &config.preprocessor_options());
	let (features, labels) = preprocessor.transform(&table);
	let booster = fit_booster(&config, features.view(), labels.view());
	let metrics =
		compute_validation_metrics(&booster, &preprocessor, features.view(), labels.view());
	assert_eq!(metrics.len(), 1);
	assert_eq!(metrics[0].column_name, "diagnosis");
	assert_eq!(metrics[0].accuracy, Some(1.0));
	assert!(metrics[0].mean_squared_error.unwrap() < 0.01);
	let empty = compute_validation_metrics(
		&booster,
		&preprocessor,
		features.slice(s![0..0, ..]),
		labels.slice(s![0..0, ..]),
	);
	assert_eq!(
		empty,
		vec![TargetMetrics {
			column_name: "diagnosis".to_owned(),
			accuracy: None,
			mean_squared_error: None,
		}]
	);
}

#[test]
fn test_unseen_labels_are_never_correct() {
	let config = test_config();
	let table = test_table();
	let preprocessor = Preprocessor::fit(&table, &config.preprocessor_options());
	let (features, labels) = preprocessor.transform(&table);
	let booster = fit_booster(&config, features.view(), labels.view());
	// The first row is predicted as class 0, which its label would match if -1 were clamped.
	let unseen = arr2(&[[-1.0]]);
	let metrics = compute_validation_metrics(
		&booster,
		&preprocessor,
		features.slice(s![0..1, ..]),
		unseen.view(),
	);
	assert_eq!(metrics[0].accuracy, Some(0.0));
}

#[test]
fn test_write_predictions() {
	let config = test_config();
	let table = test_table();
	let preprocessor = Preprocessor::fit(&table, &config.preprocessor_options());
	let predictions = arr2(&[[-0.7], [0.6], [0.2], [3.0]]);
	let mut writer = csv::Writer::from_writer(Vec::new());
	write_predictions(
		&mut writer,
		&table,
		"id",
		&preprocessor,
		predictions.view(),
	)
	.unwrap();
	let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
	insta::assert_snapshot!(output, @r###"
 id,diagnosis
 a,Malaria
 b,Pneumonia
 c,Malaria
 d,Pneumonia
 "###);
}
