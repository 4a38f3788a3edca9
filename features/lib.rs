/*!
This crate turns the string values in a [`Table`](triage_dataframe::Table) into the numeric feature and label arrays used to train a booster.

Each input column is handled by a [`FeatureGroup`], which produces one or more features. A [`Preprocessor`] holds the feature groups fitted on a training table along with a [`LabelEncoder`] for each target column, and applies them to any table with the same columns.
*/

#![allow(clippy::tabs_in_doc_comments)]

use ndarray::prelude::*;
use triage_dataframe::Table;

mod bag_of_words;
mod enum_encoder;
mod identity;
mod label_encoder;
mod preprocessor;

pub use self::bag_of_words::HashedBagOfWordsFeatureGroup;
pub use self::enum_encoder::{EnumEncoder, EnumFeatureGroup};
pub use self::identity::IdentityFeatureGroup;
pub use self::label_encoder::{clamp_class, LabelEncoder};
pub use self::preprocessor::{Preprocessor, PreprocessorOptions, Target};

/// This enum describes how to transform one column of the input table into one or more columns of the output features.
#[derive(Clone, Debug)]
pub enum FeatureGroup {
	Identity(IdentityFeatureGroup),
	Enum(EnumFeatureGroup),
	HashedBagOfWords(HashedBagOfWordsFeatureGroup),
}

impl FeatureGroup {
	/// Retrieve the name of the column this feature group reads.
	pub fn source_column_name(&self) -> &str {
		match self {
			FeatureGroup::Identity(feature_group) => &feature_group.source_column_name,
			FeatureGroup::Enum(feature_group) => &feature_group.source_column_name,
			FeatureGroup::HashedBagOfWords(feature_group) => &feature_group.source_column_name,
		}
	}

	/// Retrieve the number of features this feature group produces.
	pub fn n_features(&self) -> usize {
		match self {
			FeatureGroup::Identity(_) => 1,
			FeatureGroup::Enum(_) => 1,
			FeatureGroup::HashedBagOfWords(feature_group) => feature_group.n_buckets,
		}
	}

	/// Compute the features for every row of `table`. `features` must have one row for each row of the table and `n_features()` columns. A column missing from the table reads as empty values.
	pub fn compute_table(&self, table: &Table, mut features: ArrayViewMut2<f64>) {
		let column_index = table.column_index(self.source_column_name());
		for (row, features) in table.rows.iter().zip(features.axis_iter_mut(Axis(0))) {
			let value = column_index
				.map(|column_index| row[column_index].as_str())
				.unwrap_or("");
			self.compute_value(value, features);
		}
	}

	/// Compute the features for a single value.
	pub fn compute_value(&self, value: &str, mut features: ArrayViewMut1<f64>) {
		match self {
			FeatureGroup::Identity(feature_group) => features[0] = feature_group.compute(value),
			FeatureGroup::Enum(feature_group) => features[0] = feature_group.compute(value),
			FeatureGroup::HashedBagOfWords(feature_group) => feature_group.compute(value, features),
		}
	}
}

/// Categorical values are compared after trimming surrounding whitespace and lowercasing.
pub(crate) fn normalize_category(value: &str) -> String {
	value.trim().to_lowercase()
}
