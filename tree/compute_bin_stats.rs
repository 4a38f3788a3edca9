use ndarray::prelude::*;

/// This struct describes how the values of one feature for the examples in one node are divided into `n_bins` equal-width bins spanning the range of those values.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureBinning {
	/// This is the minimum value of the feature over the node's examples.
	pub min: f64,
	/// This is the width of each bin, `(max - min) / n_bins`.
	pub width: f64,
	pub n_bins: usize,
}

impl FeatureBinning {
	/// Compute the binning for a feature over the examples in `examples_index`. Returns `None` if the feature is constant over those examples, because no split is possible.
	pub fn compute(
		feature_values: ArrayView1<f64>,
		examples_index: &[usize],
		n_bins: usize,
	) -> Option<FeatureBinning> {
		let (first, rest) = examples_index.split_first()?;
		let mut min = feature_values[*first];
		let mut max = min;
		for example_index in rest {
			let value = feature_values[*example_index];
			if value < min {
				min = value;
			}
			if value > max {
				max = value;
			}
		}
		let width = (max - min) / n_bins as f64;
		// The feature is constant within this node.
		if width == 0.0 {
			return None;
		}
		Some(FeatureBinning { min, width, n_bins })
	}

	/// Compute the bin for a value. The value equal to the maximum lands one past the last bin, so it is clamped into the last bin.
	pub fn bin_index(&self, value: f64) -> usize {
		let bin_index = ((value - self.min) / self.width).floor();
		if bin_index < 0.0 {
			0
		} else {
			(bin_index as usize).min(self.n_bins - 1)
		}
	}

	/// Compute the upper edge of the bin at `bin_index`. Splitting after this bin sends values <= this edge to the left.
	pub fn bin_upper_edge(&self, bin_index: usize) -> f64 {
		self.min + self.width * (bin_index + 1) as f64
	}
}

/// This struct tracks the sum of gradients, sum of hessians, and number of examples whose value for a particular feature falls in a particular bin.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct BinStatsEntry {
	pub sum_gradients: f64,
	pub sum_hessians: f64,
	pub n_examples: usize,
}

/// Build the histogram for one feature over the examples in `examples_index`. The examples are visited in `examples_index` order so the sums are reproducible.
pub fn compute_bin_stats_for_feature(
	feature_values: ArrayView1<f64>,
	examples_index: &[usize],
	gradients: &[f64],
	hessians: &[f64],
	binning: &FeatureBinning,
) -> Vec<BinStatsEntry> {
	let mut bin_stats = vec![BinStatsEntry::default(); binning.n_bins];
	for example_index in examples_index.iter().cloned() {
		let bin_index = binning.bin_index(feature_values[example_index]);
		let entry = &mut bin_stats[bin_index];
		entry.sum_gradients += gradients[example_index];
		entry.sum_hessians += hessians[example_index];
		entry.n_examples += 1;
	}
	bin_stats
}

#[test]
fn test_binning_clamps_the_maximum_into_the_last_bin() {
	let values = arr1(&[0.0, 1.0, 2.0, 3.0]);
	let binning = FeatureBinning::compute(values.view(), &[0, 1, 2, 3], 2).unwrap();
	assert_eq!(binning.min, 0.0);
	assert_eq!(binning.width, 1.5);
	assert_eq!(binning.bin_index(0.0), 0);
	assert_eq!(binning.bin_index(1.0), 0);
	assert_eq!(binning.bin_index(2.0), 1);
	assert_eq!(binning.bin_index(3.0), 1);
	assert_eq!(binning.bin_upper_edge(0), 1.5);
}

#[test]
fn test_binning_only_looks_at_the_examples_in_the_node() {
	let values = arr1(&[-10.0, 4.0, 8.0, 100.0]);
	let binning = FeatureBinning::compute(values.view(), &[2, 1], 4).unwrap();
	assert_eq!(binning.min, 4.0);
	assert_eq!(binning.width, 1.0);
}

#[test]
fn test_binning_constant_feature() {
	let values = arr1(&[7.0, 7.0, 7.0]);
	assert_eq!(FeatureBinning::compute(values.view(), &[0, 1, 2], 8), None);
	assert_eq!(FeatureBinning::compute(values.view(), &[], 8), None);
}

#[test]
fn test_compute_bin_stats_for_feature() {
	let values = arr1(&[0.0, 1.0, 2.0, 3.0]);
	let examples_index = [0, 1, 2, 3];
	let binning = FeatureBinning::compute(values.view(), &examples_index, 2).unwrap();
	let gradients = [1.0, 2.0, -5.0, -5.0];
	let hessians = [1.0, 1.0, 1.0, 0.5];
	let bin_stats = compute_bin_stats_for_feature(
		values.view(),
		&examples_index,
		&gradients,
		&hessians,
		&binning,
	);
	assert_eq!(
		bin_stats,
		vec![
			BinStatsEntry {
				sum_gradients: 3.0,
				sum_hessians: 2.0,
				n_examples: 2,
			},
			BinStatsEntry {
				sum_gradients: -10.0,
				sum_hessians: 1.5,
				n_examples: 2,
			},
		]
	);
}
