use fnv::FnvHashMap;

/// A `LabelEncoder` assigns the codes 0, 1, 2, ... to the distinct values of a target column in the order they are first seen. Unlike [`EnumEncoder`](crate::EnumEncoder), values are only trimmed so a decoded prediction reads exactly like a label from the training data.
#[derive(Clone, Debug, Default)]
pub struct LabelEncoder {
	classes: Vec<String>,
	classes_map: FnvHashMap<String, usize>,
}

impl LabelEncoder {
	pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> LabelEncoder {
		let mut encoder = LabelEncoder::default();
		for value in values {
			let value = value.trim();
			if !encoder.classes_map.contains_key(value) {
				encoder
					.classes_map
					.insert(value.to_owned(), encoder.classes.len());
				encoder.classes.push(value.to_owned());
			}
		}
		encoder
	}

	/// Encode a label as its class code, or -1.0 if the label was not seen during fitting.
	pub fn encode(&self, value: &str) -> f64 {
		self.classes_map
			.get(value.trim())
			.map(|code| *code as f64)
			.unwrap_or(-1.0)
	}

	/// Decode a raw prediction to the label of the nearest class. Returns `None` only if there are no classes.
	pub fn decode(&self, prediction: f64) -> Option<&str> {
		self.classes
			.get(clamp_class(prediction, self.n_classes()))
			.map(|class| class.as_str())
	}

	pub fn classes(&self) -> &[String] {
		&self.classes
	}

	pub fn n_classes(&self) -> usize {
		self.classes.len()
	}
}

/// Round a raw prediction to the nearest class code and clamp it into `0..n_classes`. Halves round away from zero and NaN maps to class zero.
pub fn clamp_class(prediction: f64, n_classes: usize) -> usize {
	let class = prediction.round();
	if class.is_nan() || class <= 0.0 {
		0
	} else if class >= n_classes as f64 {
		n_classes.saturating_sub(1)
	} else {
		class as usize
	}
}

#[test]
fn test_label_encoder() {
	let encoder = LabelEncoder::fit(vec!["Malaria", " Pneumonia", "malaria", "Malaria "]);
	assert_eq!(encoder.classes(), &["Malaria", "Pneumonia", "malaria"]);
	assert_eq!(encoder.encode("Pneumonia "), 1.0);
	assert_eq!(encoder.encode("MALARIA"), -1.0);
	assert_eq!(encoder.decode(0.4), Some("Malaria"));
	assert_eq!(encoder.decode(1.5), Some("malaria"));
	assert_eq!(encoder.decode(-3.0), Some("Malaria"));
	assert_eq!(encoder.decode(17.0), Some("malaria"));
	assert_eq!(LabelEncoder::fit(Vec::new()).decode(0.0), None);
}

#[test]
fn test_clamp_class() {
	assert_eq!(clamp_class(0.49, 3), 0);
	assert_eq!(clamp_class(0.5, 3), 1);
	assert_eq!(clamp_class(-0.6, 3), 0);
	assert_eq!(clamp_class(2.4, 3), 2);
	assert_eq!(clamp_class(2.6, 3), 2);
	assert_eq!(clamp_class(f64::NAN, 3), 0);
	assert_eq!(clamp_class(f64::INFINITY, 3), 2);
	assert_eq!(clamp_class(1.0, 0), 0);
}
