use crate::{
	compute_bin_stats::{compute_bin_stats_for_feature, FeatureBinning},
	TrainOptions, L2_REGULARIZATION,
};
use ndarray::prelude::*;
use rayon::prelude::*;

const MIN_EXAMPLES_TO_PARALLELIZE: usize = 1024;

pub struct ChooseBestSplitOptions<'a> {
	pub features: ArrayView2<'a, f64>,
	pub examples_index: &'a [usize],
	pub gradients: &'a [f64],
	pub hessians: &'a [f64],
	pub sum_gradients: f64,
	pub sum_hessians: f64,
	pub train_options: &'a TrainOptions,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChooseBestSplitOutput {
	pub feature_index: usize,
	/// Examples in bins `0..=bin_index` go left.
	pub bin_index: usize,
	pub split_value: f64,
	pub gain: f64,
	pub left_n_examples: usize,
	pub right_n_examples: usize,
}

/// Choose the split with the highest gain across all features. Ties are broken in favor of the lowest feature index and then the lowest bin index.
pub fn choose_best_split(options: ChooseBestSplitOptions) -> Option<ChooseBestSplitOutput> {
	let n_features = options.features.ncols();
	let choose_best_split_for_feature = |feature_index| {
		choose_best_split_for_feature(
			feature_index,
			options.features.column(feature_index),
			options.examples_index,
			options.gradients,
			options.hessians,
			options.sum_gradients,
			options.sum_hessians,
			options.train_options,
		)
	};
	// The per-feature results are always collected in feature order so the reduction below does not depend on how the work was scheduled.
	let best_splits_for_features: Vec<Option<ChooseBestSplitOutput>> =
		if options.examples_index.len() >= MIN_EXAMPLES_TO_PARALLELIZE {
			(0..n_features)
				.into_par_iter()
				.map(choose_best_split_for_feature)
				.collect()
		} else {
			(0..n_features).map(choose_best_split_for_feature).collect()
		};
	best_splits_for_features
		.into_iter()
		.fold(None, choose_split_with_highest_gain)
}

/// Build the histogram for this feature and choose its best split.
#[allow(clippy::too_many_arguments)]
fn choose_best_split_for_feature(
	feature_index: usize,
	feature_values: ArrayView1<f64>,
	examples_index: &[usize],
	gradients: &[f64],
	hessians: &[f64],
	sum_gradients_parent: f64,
	sum_hessians_parent: f64,
	train_options: &TrainOptions,
) -> Option<ChooseBestSplitOutput> {
	let binning = FeatureBinning::compute(feature_values, examples_index, train_options.n_bins)?;
	let bin_stats = compute_bin_stats_for_feature(
		feature_values,
		examples_index,
		gradients,
		hessians,
		&binning,
	);
	let n_examples_parent = examples_index.len();
	let min_examples_per_node = train_options.min_examples_per_node;
	let negative_loss_for_parent_node =
		compute_negative_loss(sum_gradients_parent, sum_hessians_parent);
	let mut best_split_for_feature: Option<ChooseBestSplitOutput> = None;
	let mut left_n_examples = 0;
	let mut left_sum_gradients = 0.0;
	let mut left_sum_hessians = 0.0;
	// Splitting after the last bin would send every example left, so it is not a candidate.
	for (bin_index, bin_stats_entry) in bin_stats[..bin_stats.len() - 1].iter().enumerate() {
		left_n_examples += bin_stats_entry.n_examples;
		left_sum_gradients += bin_stats_entry.sum_gradients;
		left_sum_hessians += bin_stats_entry.sum_hessians;
		let right_n_examples = n_examples_parent - left_n_examples;
		let right_sum_gradients = sum_gradients_parent - left_sum_gradients;
		let right_sum_hessians = sum_hessians_parent - left_sum_hessians;
		if left_n_examples < min_examples_per_node || right_n_examples < min_examples_per_node {
			continue;
		}
		let gain = compute_gain(
			left_sum_gradients,
			left_sum_hessians,
			right_sum_gradients,
			right_sum_hessians,
			negative_loss_for_parent_node,
		);
		let best_gain = best_split_for_feature
			.as_ref()
			.map(|best_split_for_feature| best_split_for_feature.gain)
			.unwrap_or(f64::NEG_INFINITY);
		if gain > best_gain {
			best_split_for_feature = Some(ChooseBestSplitOutput {
				feature_index,
				bin_index,
				split_value: binning.bin_upper_edge(bin_index),
				gain,
				left_n_examples,
				right_n_examples,
			});
		}
	}
	best_split_for_feature
}

/// Compute the gain for a candidate split.
pub fn compute_gain(
	sum_gradients_left: f64,
	sum_hessians_left: f64,
	sum_gradients_right: f64,
	sum_hessians_right: f64,
	negative_loss_current_node: f64,
) -> f64 {
	let left = compute_negative_loss(sum_gradients_left, sum_hessians_left);
	let right = compute_negative_loss(sum_gradients_right, sum_hessians_right);
	0.5 * (left + right - negative_loss_current_node)
}

/// The negative loss is used to compute the gain of a given split.
fn compute_negative_loss(sum_gradients: f64, sum_hessians: f64) -> f64 {
	(sum_gradients * sum_gradients) / (sum_hessians + L2_REGULARIZATION)
}

/// The candidate only replaces the current split if its gain is strictly greater.
fn choose_split_with_highest_gain(
	current: Option<ChooseBestSplitOutput>,
	candidate: Option<ChooseBestSplitOutput>,
) -> Option<ChooseBestSplitOutput> {
	match (current, candidate) {
		(None, None) => None,
		(current, None) => current,
		(None, candidate) => candidate,
		(Some(current), Some(candidate)) => {
			if candidate.gain > current.gain {
				Some(candidate)
			} else {
				Some(current)
			}
		}
	}
}

#[cfg(test)]
fn choose_best_split_for_test(
	features: ArrayView2<f64>,
	gradients: &[f64],
	min_examples_per_node: usize,
	n_bins: usize,
) -> Option<ChooseBestSplitOutput> {
	let examples_index: Vec<usize> = (0..features.nrows()).collect();
	let hessians = vec![1.0; gradients.len()];
	let train_options = TrainOptions {
		min_examples_per_node,
		n_bins,
		..Default::default()
	};
	choose_best_split(ChooseBestSplitOptions {
		features: features.view(),
		examples_index: &examples_index,
		gradients,
		hessians: &hessians,
		sum_gradients: gradients.iter().sum(),
		sum_hessians: hessians.iter().sum(),
		train_options: &train_options,
	})
}

#[test]
fn test_choose_best_split() {
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
	let gradients = [0.0, 0.0, -5.0, -5.0];
	let split = choose_best_split_for_test(features.view(), &gradients, 1, 2).unwrap();
	insta::assert_debug_snapshot!(split, @r###"
 ChooseBestSplitOutput {
     feature_index: 0,
     bin_index: 0,
     split_value: 1.5,
     gain: 12.490630465821829,
     left_n_examples: 2,
     right_n_examples: 2,
 }
 "###);
}

#[test]
fn test_ties_keep_the_lowest_feature_index() {
	// Both features separate the examples identically, so their gains are equal.
	let features = arr2(&[[0.0, 10.0], [1.0, 11.0], [2.0, 12.0], [3.0, 13.0]]);
	let gradients = [1.0, 1.0, -1.0, -1.0];
	let split = choose_best_split_for_test(features.view(), &gradients, 1, 2).unwrap();
	assert_eq!(split.feature_index, 0);
	// Reversing the columns moves the winner with them.
	let features = arr2(&[[10.0, 0.0], [11.0, 1.0], [12.0, 2.0], [13.0, 3.0]]);
	let split = choose_best_split_for_test(features.view(), &gradients, 1, 2).unwrap();
	assert_eq!(split.feature_index, 0);
	assert_eq!(split.split_value, 11.5);
}

#[test]
fn test_ties_keep_the_lowest_bin_index() {
	// With zero gradients every admissible boundary has zero gain.
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
	let gradients = [0.0, 0.0, 0.0, 0.0];
	let split = choose_best_split_for_test(features.view(), &gradients, 1, 4).unwrap();
	assert_eq!(split.bin_index, 0);
	assert_eq!(split.gain, 0.0);
}

#[test]
fn test_min_examples_per_node_rejects_small_children() {
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
	let gradients = [5.0, -1.0, -1.0, -1.0];
	// The best boundary isolates the first example, but a child needs two examples.
	let split = choose_best_split_for_test(features.view(), &gradients, 2, 4).unwrap();
	assert_eq!(split.left_n_examples, 2);
	assert_eq!(split.right_n_examples, 2);
	assert!(choose_best_split_for_test(features.view(), &gradients, 3, 4).is_none());
}

#[test]
fn test_constant_features_are_skipped() {
	let features = arr2(&[[1.0, 0.0], [1.0, 0.0], [1.0, 9.0]]);
	let gradients = [1.0, 1.0, -2.0];
	let split = choose_best_split_for_test(features.view(), &gradients, 1, 2).unwrap();
	assert_eq!(split.feature_index, 1);
	let features = arr2(&[[1.0, 0.0], [1.0, 0.0], [1.0, 0.0]]);
	assert!(choose_best_split_for_test(features.view(), &gradients, 1, 2).is_none());
}

#[test]
fn test_parallel_and_serial_search_agree() {
	let n_examples = MIN_EXAMPLES_TO_PARALLELIZE + 7;
	let features = Array2::from_shape_fn((n_examples, 5), |(i, j)| ((i * (j + 3)) % 17) as f64);
	let gradients: Vec<f64> = (0..n_examples)
		.map(|i| if (i * 7) % 17 < 8 { 1.0 } else { -1.0 })
		.collect();
	let parallel = choose_best_split_for_test(features.view(), &gradients, 1, 16).unwrap();
	let hessians = vec![1.0; n_examples];
	let examples_index: Vec<usize> = (0..n_examples).collect();
	let train_options = TrainOptions {
		min_examples_per_node: 1,
		n_bins: 16,
		..Default::default()
	};
	let serial = (0..features.ncols())
		.map(|feature_index| {
			choose_best_split_for_feature(
				feature_index,
				features.column(feature_index),
				&examples_index,
				&gradients,
				&hessians,
				gradients.iter().sum(),
				hessians.iter().sum(),
				&train_options,
			)
		})
		.fold(None, choose_split_with_highest_gain)
		.unwrap();
	assert_eq!(parallel, serial);
}
