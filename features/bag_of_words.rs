use fnv::FnvHasher;
use ndarray::prelude::*;
use std::hash::Hasher;

/**
A `HashedBagOfWordsFeatureGroup` creates `n_buckets` features for a text column using the [hashing trick](https://en.wikipedia.org/wiki/Feature_hashing). The text is lowercased and split on whitespace. Each token is hashed with 64-bit FNV-1a, and the feature for bucket `hash % n_buckets` is incremented by one. Distinct tokens may share a bucket.

# Example

With 10 buckets:

| token      | bucket |
|------------|--------|
| "fever"    | 7      |
| "chills"   | 6      |
| "cough"    | 5      |
| "headache" | 6      |

| table value                 | feature values                 |
|-----------------------------|--------------------------------|
| "Fever chills FEVER cough"  | [0, 0, 0, 0, 0, 1, 1, 2, 0, 0] |
| "chills headache"           | [0, 0, 0, 0, 0, 0, 2, 0, 0, 0] |
*/
#[derive(Clone, Debug)]
pub struct HashedBagOfWordsFeatureGroup {
	pub source_column_name: String,
	/// This must be at least one.
	pub n_buckets: usize,
}

impl HashedBagOfWordsFeatureGroup {
	/// Compute the bucket counts for `value`. `features` must have `n_buckets` entries.
	pub fn compute(&self, value: &str, mut features: ArrayViewMut1<f64>) {
		features.fill(0.0);
		for token in value.to_lowercase().split_whitespace() {
			features[self.bucket(token)] += 1.0;
		}
	}

	pub fn bucket(&self, token: &str) -> usize {
		let mut hasher = FnvHasher::default();
		hasher.write(token.as_bytes());
		(hasher.finish() % self.n_buckets as u64) as usize
	}
}

#[test]
fn test_hashed_bag_of_words() {
	let feature_group = HashedBagOfWordsFeatureGroup {
		source_column_name: "prompt".to_owned(),
		n_buckets: 10,
	};
	assert_eq!(feature_group.bucket("fever"), 7);
	let mut features = Array1::from_elem(10, 3.0);
	feature_group.compute("Fever  chills\tFEVER cough\n", features.view_mut());
	assert_eq!(
		features,
		arr1(&[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 2.0, 0.0, 0.0])
	);
	feature_group.compute("chills headache", features.view_mut());
	assert_eq!(features[6], 2.0);
	assert_eq!(features.sum(), 2.0);
	feature_group.compute("   ", features.view_mut());
	assert_eq!(features.sum(), 0.0);
}
