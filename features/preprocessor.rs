use crate::{
	EnumEncoder, EnumFeatureGroup, FeatureGroup, HashedBagOfWordsFeatureGroup,
	IdentityFeatureGroup, LabelEncoder,
};
use itertools::izip;
use ndarray::prelude::*;
use triage_dataframe::Table;

/// These options name the columns of the input table and say how each is turned into features.
#[derive(Clone, Debug)]
pub struct PreprocessorOptions {
	/// Each of these columns produces one feature holding its parsed value.
	pub number_columns: Vec<String>,
	/// Each of these columns produces one feature holding its category code.
	pub enum_columns: Vec<String>,
	/// Each of these columns produces `n_buckets` hashed token count features.
	pub text_columns: Vec<String>,
	/// Each of these columns produces one label column holding its class code.
	pub target_columns: Vec<String>,
	pub n_buckets: usize,
}

/// A target column and the encoder fitted on its values.
#[derive(Clone, Debug)]
pub struct Target {
	pub column_name: String,
	pub encoder: LabelEncoder,
}

/**
A `Preprocessor` converts tables into feature and label arrays. Features are laid out in feature group order: the number columns, then the enum columns, then the text columns, each in the order given in [`PreprocessorOptions`]. Labels have one column per target, in order.
*/
#[derive(Clone, Debug)]
pub struct Preprocessor {
	feature_groups: Vec<FeatureGroup>,
	targets: Vec<Target>,
}

impl Preprocessor {
	/// Fit the enum and label encoders on the values in `table`.
	pub fn fit(table: &Table, options: &PreprocessorOptions) -> Preprocessor {
		let mut feature_groups = Vec::new();
		for column_name in options.number_columns.iter() {
			feature_groups.push(FeatureGroup::Identity(IdentityFeatureGroup {
				source_column_name: column_name.clone(),
			}));
		}
		for column_name in options.enum_columns.iter() {
			feature_groups.push(FeatureGroup::Enum(EnumFeatureGroup {
				source_column_name: column_name.clone(),
				encoder: EnumEncoder::fit(column_values(table, column_name)),
			}));
		}
		for column_name in options.text_columns.iter() {
			feature_groups.push(FeatureGroup::HashedBagOfWords(
				HashedBagOfWordsFeatureGroup {
					source_column_name: column_name.clone(),
					n_buckets: options.n_buckets,
				},
			));
		}
		let targets = options
			.target_columns
			.iter()
			.map(|column_name| Target {
				column_name: column_name.clone(),
				encoder: LabelEncoder::fit(column_values(table, column_name)),
			})
			.collect();
		Preprocessor {
			feature_groups,
			targets,
		}
	}

	pub fn feature_groups(&self) -> &[FeatureGroup] {
		&self.feature_groups
	}

	pub fn targets(&self) -> &[Target] {
		&self.targets
	}

	pub fn n_features(&self) -> usize {
		self.feature_groups
			.iter()
			.map(|feature_group| feature_group.n_features())
			.sum()
	}

	/// Compute the features and labels for every row of `table`. Labels not seen during fitting are -1.0.
	pub fn transform(&self, table: &Table) -> (Array2<f64>, Array2<f64>) {
		(self.transform_features(table), self.transform_labels(table))
	}

	pub fn transform_features(&self, table: &Table) -> Array2<f64> {
		let mut features = Array2::zeros((table.n_rows(), self.n_features()));
		let mut offset = 0;
		for feature_group in self.feature_groups.iter() {
			let n_features = feature_group.n_features();
			let slice = features.slice_mut(s![.., offset..offset + n_features]);
			feature_group.compute_table(table, slice);
			offset += n_features;
		}
		features
	}

	pub fn transform_labels(&self, table: &Table) -> Array2<f64> {
		let mut labels = Array2::zeros((table.n_rows(), self.targets.len()));
		for (target, mut labels) in izip!(self.targets.iter(), labels.axis_iter_mut(Axis(1))) {
			let values = column_values(table, &target.column_name);
			for (label, value) in izip!(labels.iter_mut(), values) {
				*label = target.encoder.encode(value);
			}
		}
		labels
	}
}

/// A missing column reads as an empty value in every row.
fn column_values<'a>(table: &'a Table, column_name: &str) -> Vec<&'a str> {
	match table.column(column_name) {
		Some(values) => values.collect(),
		None => vec![""; table.n_rows()],
	}
}

#[cfg(test)]
fn test_table() -> Table {
	let csv = "master_index,years of experience,county,prompt,clinician,ddx snomed
1,3,Kiambu,fever and chills,Malaria,61462000
2,10,nairobi,cough,Pneumonia,233604007
3,,kiambu,fever,Malaria,61462000
";
	Table::from_csv(std::io::Cursor::new(csv)).unwrap()
}

#[cfg(test)]
fn test_options() -> PreprocessorOptions {
	PreprocessorOptions {
		number_columns: vec!["years of experience".to_owned()],
		enum_columns: vec!["county".to_owned(), "health level".to_owned()],
		text_columns: vec!["prompt".to_owned()],
		target_columns: vec!["clinician".to_owned(), "ddx snomed".to_owned()],
		n_buckets: 4,
	}
}

#[test]
fn test_preprocessor() {
	let table = test_table();
	let preprocessor = Preprocessor::fit(&table, &test_options());
	assert_eq!(preprocessor.n_features(), 1 + 2 + 4);
	let (features, labels) = preprocessor.transform(&table);
	assert_eq!(features.dim(), (3, 7));
	assert_eq!(features.column(0).to_vec(), vec![3.0, 10.0, 0.0]);
	assert_eq!(features.column(1).to_vec(), vec![0.0, 1.0, 0.0]);
	// The health level column is missing, so every row has the same empty value.
	assert_eq!(features.column(2).to_vec(), vec![0.0, 0.0, 0.0]);
	let token_counts: Vec<f64> = features
		.slice(s![.., 3..])
		.axis_iter(Axis(0))
		.map(|row| row.sum())
		.collect();
	assert_eq!(token_counts, vec![3.0, 1.0, 1.0]);
	assert_eq!(labels, arr2(&[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]));
	let targets = preprocessor.targets();
	assert_eq!(targets[1].encoder.classes(), &["61462000", "233604007"]);
}

#[test]
fn test_preprocessor_unseen_values() {
	let preprocessor = Preprocessor::fit(&test_table(), &test_options());
	let csv = "county,clinician,prompt
Mombasa,Typhoid,
";
	let table = Table::from_csv(std::io::Cursor::new(csv)).unwrap();
	let (features, labels) = preprocessor.transform(&table);
	assert_eq!(features.row(0).to_vec(), vec![0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
	assert_eq!(labels.row(0).to_vec(), vec![-1.0, -1.0]);
}

#[test]
fn test_column_values() {
	let table = test_table();
	assert_eq!(
		column_values(&table, " County"),
		vec!["Kiambu", "nairobi", "kiambu"]
	);
	assert_eq!(column_values(&table, "health level"), vec!["", "", ""]);
}
