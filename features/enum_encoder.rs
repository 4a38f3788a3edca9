use crate::normalize_category;
use fnv::FnvHashMap;

/// An `EnumEncoder` assigns the codes 0, 1, 2, ... to the distinct normalized values of a column in the order they are first seen. Values never seen during fitting encode to -1.0.
#[derive(Clone, Debug, Default)]
pub struct EnumEncoder {
	options: Vec<String>,
	options_map: FnvHashMap<String, usize>,
}

impl EnumEncoder {
	pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> EnumEncoder {
		let mut encoder = EnumEncoder::default();
		for value in values {
			let value = normalize_category(value);
			if !encoder.options_map.contains_key(&value) {
				encoder.options_map.insert(value.clone(), encoder.options.len());
				encoder.options.push(value);
			}
		}
		encoder
	}

	pub fn encode(&self, value: &str) -> f64 {
		self.options_map
			.get(&normalize_category(value))
			.map(|code| *code as f64)
			.unwrap_or(-1.0)
	}

	/// Retrieve the normalized values in code order.
	pub fn options(&self) -> &[String] {
		&self.options
	}
}

/**
An `EnumFeatureGroup` encodes a categorical column as a single feature holding the value's code.

| table value  | feature value |
|--------------|---------------|
| "Kiambu"     | 0.0           |
| " nairobi "  | 1.0           |
| "KIAMBU"     | 0.0           |
| "Mombasa"    | -1.0 (unseen) |
*/
#[derive(Clone, Debug)]
pub struct EnumFeatureGroup {
	pub source_column_name: String,
	pub encoder: EnumEncoder,
}

impl EnumFeatureGroup {
	pub fn compute(&self, value: &str) -> f64 {
		self.encoder.encode(value)
	}
}

#[test]
fn test_enum_encoder() {
	let encoder = EnumEncoder::fit(vec!["Kiambu", " nairobi ", "KIAMBU", "Kisumu"]);
	assert_eq!(encoder.options(), &["kiambu", "nairobi", "kisumu"]);
	assert_eq!(encoder.encode("kiambu"), 0.0);
	assert_eq!(encoder.encode("Nairobi"), 1.0);
	assert_eq!(encoder.encode("kisumu  "), 2.0);
	assert_eq!(encoder.encode("Mombasa"), -1.0);
	assert_eq!(EnumEncoder::fit(Vec::new()).encode(""), -1.0);
}
