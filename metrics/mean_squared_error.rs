use super::{mean::Mean, StreamingMetric};

/// The mean squared error is the mean of the squared differences between the predicted value and the label.
#[derive(Clone, Debug, Default)]
pub struct MeanSquaredError(Mean);

impl MeanSquaredError {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for MeanSquaredError {
	/// `(prediction, label)`
	type Input = (f64, f64);
	type Output = Option<f64>;

	fn update(&mut self, value: Self::Input) {
		self.0.update((value.1 - value.0).powi(2))
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Self::Output {
		self.0.finalize()
	}
}

#[test]
fn test_mean_squared_error() {
	let mut metric = MeanSquaredError::new();
	metric.update((1.0, 0.0));
	metric.update((2.0, 4.0));
	metric.update((3.0, 3.0));
	insta::assert_debug_snapshot!(metric.finalize(), @r###"
 Some(
     1.6666666666666665,
 )
 "###);
}
