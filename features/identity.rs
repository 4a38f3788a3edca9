/**
An `IdentityFeatureGroup` passes a number column through to the output features. Values that do not parse as a finite number become 0.0.

| table value | feature value |
|-------------|---------------|
| "0.2"       | 0.2           |
| " 3 "       | 3.0           |
| ""          | 0.0           |
| "ten"       | 0.0           |
*/
#[derive(Clone, Debug)]
pub struct IdentityFeatureGroup {
	pub source_column_name: String,
}

impl IdentityFeatureGroup {
	pub fn compute(&self, value: &str) -> f64 {
		match value.trim().parse::<f64>() {
			Ok(value) if value.is_finite() => value,
			_ => 0.0,
		}
	}
}

#[test]
fn test_identity() {
	let feature_group = IdentityFeatureGroup {
		source_column_name: "years of experience".to_owned(),
	};
	assert_eq!(feature_group.compute("0.2"), 0.2);
	assert_eq!(feature_group.compute(" 3 "), 3.0);
	assert_eq!(feature_group.compute("-1e2"), -100.0);
	assert_eq!(feature_group.compute(""), 0.0);
	assert_eq!(feature_group.compute("ten"), 0.0);
	assert_eq!(feature_group.compute("NaN"), 0.0);
	assert_eq!(feature_group.compute("inf"), 0.0);
}
