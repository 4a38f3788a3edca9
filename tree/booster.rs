use crate::{compute_feature_importances, train::train_tree, TrainOptions, TrainProgress, Tree};
use itertools::izip;
use ndarray::prelude::*;
use ndarray::Zip;

/// A `Booster` predicts several numeric target values for each example. It holds one sequence of trees for each target, and the prediction for a target is the sum of the outputs of that target's trees, each scaled by the learning rate.
#[derive(Clone, Debug)]
pub struct Booster {
	/// These are the options used to train every tree.
	pub options: TrainOptions,
	/// `trees[target_index]` holds the trees for that target in the order they were trained.
	pub trees: Vec<Vec<Tree>>,
	/// If `compute_loss` is enabled, `losses[round_index][target_index]` is the loss on the training data after that round.
	pub losses: Option<Vec<Vec<f64>>>,
}

impl Booster {
	/// Create a booster with no trees for `n_targets` targets.
	pub fn new(n_targets: usize, options: TrainOptions) -> Booster {
		let losses = if options.compute_loss {
			Some(Vec::new())
		} else {
			None
		};
		Booster {
			options,
			trees: vec![Vec::new(); n_targets],
			losses,
		}
	}

	pub fn n_targets(&self) -> usize {
		self.trees.len()
	}

	/// Retrieve the number of rounds trained so far, which is the number of trees for each target.
	pub fn n_rounds_trained(&self) -> usize {
		self.trees.first().map(|trees| trees.len()).unwrap_or(0)
	}

	/// Retrieve the trees for a target in the order they were trained.
	pub fn trees(&self, target_index: usize) -> &[Tree] {
		&self.trees[target_index]
	}

	/**
	Train `n_rounds` rounds of trees. `features` has one row per example and `labels` has one row per example and one column per target.

	In each round, for each target in order, the gradients are the differences between the current predictions and the labels, the hessians are all one, and one tree is trained on them and appended to the target's trees. The tree's outputs, scaled by the learning rate, are then added to the current predictions. If the booster already has trees, training continues from their predictions.

	The number of rows in `features` and `labels` must match, and `labels` must have one column for each target. These are not checked.
	*/
	pub fn fit(
		&mut self,
		features: ArrayView2<f64>,
		labels: ArrayView2<f64>,
		n_rounds: usize,
		update_progress: &mut dyn FnMut(TrainProgress),
	) {
		let n_examples = features.nrows();
		let learning_rate = self.options.learning_rate;
		// Before the first round, the predictions are the outputs of any existing trees, which are zero for a new booster.
		let mut predictions = self.predict_batch(features);
		// Pre-allocate memory to be used in training. The squared error loss has a constant second derivative, so the hessians never change.
		let mut gradients = vec![0.0; n_examples];
		let hessians = vec![1.0; n_examples];
		for round_index in 0..n_rounds {
			update_progress(TrainProgress::Training {
				round: round_index,
				n_rounds,
			});
			for target_index in 0..self.n_targets() {
				compute_gradients(
					&mut gradients,
					labels.column(target_index),
					predictions.column(target_index),
				);
				let tree = train_tree(features, &gradients, &hessians, &self.options);
				// Update the predictions with the most recently trained tree.
				for (prediction, example) in izip!(
					predictions.column_mut(target_index),
					features.axis_iter(Axis(0))
				) {
					*prediction += learning_rate * tree.predict(example);
				}
				self.trees[target_index].push(tree);
			}
			// If loss computation is enabled, compute the loss for this round.
			let losses_for_round = self.losses.as_mut().map(|losses| {
				let losses_for_round: Vec<f64> = izip!(
					labels.axis_iter(Axis(1)),
					predictions.axis_iter(Axis(1))
				)
				.map(|(labels, predictions)| compute_loss(labels, predictions))
				.collect();
				losses.push(losses_for_round.clone());
				losses_for_round
			});
			update_progress(TrainProgress::Trained {
				round: round_index,
				losses: losses_for_round,
			});
		}
	}

	/// Make a prediction for each target for a single example.
	pub fn predict(&self, example: ArrayView1<f64>) -> Vec<f64> {
		let learning_rate = self.options.learning_rate;
		self.trees
			.iter()
			.map(|trees| {
				trees.iter().fold(0.0, |prediction, tree| {
					prediction + learning_rate * tree.predict(example)
				})
			})
			.collect()
	}

	/// Make predictions for many examples in parallel. The returned array has one row per example and one column per target, and each row is identical to the output of [`Booster::predict`] for that example.
	pub fn predict_batch(&self, features: ArrayView2<f64>) -> Array2<f64> {
		let mut predictions = Array2::zeros((features.nrows(), self.n_targets()));
		Zip::from(predictions.rows_mut())
			.and(features.rows())
			.par_for_each(|mut predictions, example| {
				for (prediction, value) in izip!(predictions.iter_mut(), self.predict(example)) {
					*prediction = value;
				}
			});
		predictions
	}

	/// Compute the importance of each feature for a target, see [`compute_feature_importances`].
	pub fn feature_importances(&self, target_index: usize, n_features: usize) -> Vec<f64> {
		compute_feature_importances(self.trees(target_index), n_features)
	}
}

/// For the squared error loss `0.5 * (prediction - label)^2`, the gradient with respect to the prediction is `prediction - label`.
fn compute_gradients(gradients: &mut [f64], labels: ArrayView1<f64>, predictions: ArrayView1<f64>) {
	for (gradient, label, prediction) in izip!(gradients.iter_mut(), labels, predictions) {
		*gradient = prediction - label;
	}
}

/// Compute the mean squared error loss, with the conventional factor of one half, for one target.
fn compute_loss(labels: ArrayView1<f64>, predictions: ArrayView1<f64>) -> f64 {
	if labels.is_empty() {
		return 0.0;
	}
	let mut loss = 0.0;
	for (label, prediction) in izip!(labels, predictions) {
		loss += 0.5 * (label - prediction).powi(2);
	}
	loss / labels.len() as f64
}

#[cfg(test)]
fn fit(
	features: ArrayView2<f64>,
	labels: ArrayView2<f64>,
	n_rounds: usize,
	options: TrainOptions,
) -> Booster {
	let mut booster = Booster::new(labels.ncols(), options);
	booster.fit(features, labels, n_rounds, &mut |_| {});
	booster
}

#[cfg(test)]
fn example_data() -> (Array2<f64>, Array2<f64>) {
	let features = Array2::from_shape_fn((40, 3), |(i, j)| match j {
		0 => (i % 7) as f64,
		1 => ((i * 13) % 11) as f64 - 5.0,
		_ => (i / 10) as f64,
	});
	let labels = Array2::from_shape_fn((40, 2), |(i, j)| match j {
		0 => ((i % 7) / 3) as f64 + if (i * 13) % 11 > 5 { 2.0 } else { 0.0 },
		_ => (i / 10) as f64,
	});
	(features, labels)
}

#[test]
fn test_step_function() {
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
	let labels = arr2(&[[0.0], [0.0], [5.0], [5.0]]);
	let options = TrainOptions {
		learning_rate: 1.0,
		max_depth: 1,
		min_examples_per_node: 1,
		n_bins: 2,
		..Default::default()
	};
	let booster = fit(features.view(), labels.view(), 1, options);
	assert_eq!(booster.n_rounds_trained(), 1);
	let tree = &booster.trees(0)[0];
	let root = tree.nodes[0].as_branch().unwrap();
	assert!(root.split_value >= 1.0 && root.split_value < 2.0);
	assert!(booster.predict(aview1(&[0.0]))[0].abs() < 1e-2);
	assert!((booster.predict(aview1(&[1.0]))[0]).abs() < 1e-2);
	assert!((booster.predict(aview1(&[2.0]))[0] - 5.0).abs() < 1e-2);
	assert!((booster.predict(aview1(&[3.0]))[0] - 5.0).abs() < 1e-2);
}

#[test]
fn test_no_rounds_predicts_zero() {
	let (features, labels) = example_data();
	let booster = fit(features.view(), labels.view(), 0, TrainOptions::default());
	assert_eq!(booster.n_rounds_trained(), 0);
	assert_eq!(booster.predict(features.row(0)), vec![0.0, 0.0]);
}

#[test]
fn test_predict_is_idempotent() {
	let (features, labels) = example_data();
	let booster = fit(features.view(), labels.view(), 10, TrainOptions::default());
	for example in features.axis_iter(Axis(0)) {
		let first = booster.predict(example);
		let second = booster.predict(example);
		assert_eq!(
			first.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
			second.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
		);
	}
}

#[test]
fn test_predict_batch_matches_predict() {
	let (features, labels) = example_data();
	let booster = fit(features.view(), labels.view(), 10, TrainOptions::default());
	let predictions = booster.predict_batch(features.view());
	assert_eq!(predictions.dim(), (40, 2));
	for (example, predictions) in izip!(
		features.axis_iter(Axis(0)),
		predictions.axis_iter(Axis(0))
	) {
		assert_eq!(predictions.to_vec(), booster.predict(example));
	}
}

#[test]
fn test_fit_is_deterministic() {
	let (features, labels) = example_data();
	let options = TrainOptions {
		max_depth: 4,
		min_examples_per_node: 2,
		n_bins: 16,
		..Default::default()
	};
	let a = fit(features.view(), labels.view(), 20, options.clone());
	let b = fit(features.view(), labels.view(), 20, options);
	assert_eq!(a.trees, b.trees);
}

#[test]
fn test_targets_are_independent() {
	let (features, labels) = example_data();
	let options = TrainOptions {
		min_examples_per_node: 2,
		n_bins: 8,
		..Default::default()
	};
	let both = fit(features.view(), labels.view(), 15, options.clone());
	// Swapping the target columns swaps the tree sequences and changes nothing else.
	let swapped_labels = labels.select(Axis(1), &[1, 0]);
	let swapped = fit(features.view(), swapped_labels.view(), 15, options.clone());
	assert_eq!(both.trees(0), swapped.trees(1));
	assert_eq!(both.trees(1), swapped.trees(0));
	// Training on one target alone produces the same trees as training it alongside another.
	let first_labels = labels.select(Axis(1), &[0]);
	let first = fit(features.view(), first_labels.view(), 15, options);
	assert_eq!(both.trees(0), first.trees(0));
	assert_ne!(both.trees(0), both.trees(1));
}

#[test]
fn test_fit_continues_from_existing_trees() {
	let (features, labels) = example_data();
	let all_at_once = fit(features.view(), labels.view(), 6, TrainOptions::default());
	let mut in_two_calls = fit(features.view(), labels.view(), 4, TrainOptions::default());
	in_two_calls.fit(features.view(), labels.view(), 2, &mut |_| {});
	assert_eq!(in_two_calls.n_rounds_trained(), 6);
	assert_eq!(all_at_once.trees, in_two_calls.trees);
}

#[test]
fn test_progress_and_losses() {
	let (features, labels) = example_data();
	let options = TrainOptions {
		compute_loss: true,
		learning_rate: 0.3,
		..Default::default()
	};
	let mut booster = Booster::new(2, options);
	let mut events = Vec::new();
	booster.fit(features.view(), labels.view(), 5, &mut |progress| {
		events.push(progress)
	});
	assert_eq!(events.len(), 10);
	assert_eq!(
		events[0],
		TrainProgress::Training {
			round: 0,
			n_rounds: 5
		}
	);
	let losses = booster.losses.as_ref().unwrap();
	assert_eq!(losses.len(), 5);
	match &events[9] {
		TrainProgress::Trained { round, losses: Some(last) } => {
			assert_eq!(*round, 4);
			assert_eq!(last, &losses[4]);
		}
		event => panic!("unexpected event {:?}", event),
	}
	// Every leaf value minimizes the loss for its examples, so with a learning rate below one the training loss never increases.
	for target_index in 0..2 {
		for round_index in 1..5 {
			assert!(
				losses[round_index][target_index] <= losses[round_index - 1][target_index] + 1e-12
			);
		}
	}
}

#[test]
fn test_feature_importances() {
	let (features, labels) = example_data();
	let options = TrainOptions {
		max_depth: 1,
		..Default::default()
	};
	let booster = fit(features.view(), labels.view(), 1, options);
	// The second target is a step function of the third feature, so the best first split uses it.
	assert_eq!(booster.feature_importances(1, 3), vec![0.0, 0.0, 1.0]);
	let total: f64 = booster.feature_importances(0, 3).iter().sum();
	assert!((total - 1.0).abs() < 1e-9);
}
