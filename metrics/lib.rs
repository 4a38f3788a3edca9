/*!
This crate defines the [`StreamingMetric`](trait.StreamingMetric.html) trait and the metrics used to evaluate a trained booster on held out data, [`MeanSquaredError`](struct.MeanSquaredError.html) and [`Accuracy`](struct.Accuracy.html).
*/

#![allow(clippy::tabs_in_doc_comments)]

mod accuracy;
mod mean;
mod mean_squared_error;

pub use self::accuracy::Accuracy;
pub use self::mean::Mean;
pub use self::mean_squared_error::MeanSquaredError;

/**
The `StreamingMetric` trait defines a common interface to metrics that can be computed in a streaming manner, where the input is available in chunks, such as mean squared error and accuracy.

After being initialized, a value of type `T` implementing the `StreamingMetric` trait can have `update()` called on it with values of the associated type `Input`. Multiple values of `T` can be merged together by calling `merge()`, which is useful when the inputs are split across threads. When finished aggregating, call `finalize()` on the metric to produce the associated type `Output`.

# Examples

Here is a `Max` metric, which takes `f64`s as input and produces the largest of them.

```
use triage_metrics::StreamingMetric;

struct Max(f64);

impl StreamingMetric<'_> for Max {
	type Input = f64;
	type Output = f64;
	fn update(&mut self, input: Self::Input) {
		self.0 = self.0.max(input)
	}
	fn merge(&mut self, other: Self) { self.0 = self.0.max(other.0) }
	fn finalize(self) -> Self::Output { self.0 }
}

let mut max = Max(f64::NEG_INFINITY);
max.update(1.0);
max.update(3.0);
assert_eq!(max.finalize(), 3.0);
```

The generic lifetime `'a` allows `Input`s and `Output`s to borrow from their enclosing scope.
*/
pub trait StreamingMetric<'a> {
	/// `Input` is the type to aggregate in calls to `update()`.
	type Input;
	/// `Output` is the return type of `finalize()`.
	type Output;
	/// Update this streaming metric with the `Input` `input`.
	fn update(&mut self, input: Self::Input);
	/// Merge multiple independently computed streaming metrics.
	fn merge(&mut self, other: Self);
	/// When you are done aggregating `Input`s, call `finalize()` to produce an `Output`.
	fn finalize(self) -> Self::Output;
}
