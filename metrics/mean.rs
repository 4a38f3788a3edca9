use super::StreamingMetric;

/// The arithmetic mean of a stream of values. The mean of no values is `None`.
#[derive(Clone, Debug, Default)]
pub struct Mean {
	n: u64,
	mean: f64,
}

impl Mean {
	pub fn new() -> Self {
		Self::default()
	}
}

impl StreamingMetric<'_> for Mean {
	type Input = f64;
	type Output = Option<f64>;

	fn update(&mut self, value: f64) {
		self.n += 1;
		self.mean += (value - self.mean) / self.n as f64;
	}

	fn merge(&mut self, other: Self) {
		let n = self.n + other.n;
		if n == 0 {
			return;
		}
		self.mean = (self.n as f64 * self.mean + other.n as f64 * other.mean) / n as f64;
		self.n = n;
	}

	fn finalize(self) -> Option<f64> {
		if self.n == 0 {
			None
		} else {
			Some(self.mean)
		}
	}
}

#[test]
fn test_mean() {
	let mut mean = Mean::new();
	for value in &[1.0, 2.0, 3.0, 6.0] {
		mean.update(*value);
	}
	assert_eq!(mean.finalize(), Some(3.0));
	assert_eq!(Mean::new().finalize(), None);
}

#[test]
fn test_merge() {
	let mut a = Mean::new();
	a.update(1.0);
	a.update(3.0);
	let mut b = Mean::new();
	b.update(8.0);
	a.merge(b);
	assert_eq!(a.clone().finalize(), Some(4.0));
	a.merge(Mean::new());
	assert_eq!(a.finalize(), Some(4.0));
	let mut empty = Mean::new();
	empty.merge(Mean::new());
	assert_eq!(empty.finalize(), None);
}
