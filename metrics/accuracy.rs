use super::{mean::Mean, StreamingMetric};

/// The accuracy is the proportion of examples where the predicted class equals the label's class. An example whose label has no class is never correct.
#[derive(Clone, Debug, Default)]
pub struct Accuracy(Mean);

impl Accuracy {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Accuracy {
	/// `(predicted class, label class)`
	type Input = (usize, Option<usize>);
	type Output = Option<f64>;

	fn update(&mut self, value: Self::Input) {
		self.0.update(if value.1 == Some(value.0) { 1.0 } else { 0.0 })
	}

	fn merge(&mut self, other: Self) {
		self.0.merge(other.0)
	}

	fn finalize(self) -> Option<f64> {
		self.0.finalize()
	}
}

#[test]
fn test_accuracy() {
	let mut metric = Accuracy::new();
	for (prediction, label) in &[(0, Some(0)), (1, Some(2)), (2, Some(2)), (3, Some(3))] {
		metric.update((*prediction, *label));
	}
	assert_eq!(metric.finalize(), Some(0.75));
	let mut metric = Accuracy::new();
	metric.update((0, None));
	metric.update((0, Some(0)));
	assert_eq!(metric.finalize(), Some(0.5));
	assert_eq!(Accuracy::new().finalize(), None);
}
