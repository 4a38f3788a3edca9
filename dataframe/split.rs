use rand::{seq::SliceRandom, Rng};

const DEFAULT_TRAIN_FRACTION: f64 = 0.8;

/**
Shuffle the indexes `0..n` and split them into training and validation indexes.

The training set receives `floor(n * train_fraction)` indexes, clamped so that each set receives at least one. A `train_fraction` outside `[0, 1]` is replaced with 0.8. If `n` is less than two, every index goes to the training set.
*/
pub fn shuffle_split<R>(n: usize, train_fraction: f64, rng: &mut R) -> (Vec<usize>, Vec<usize>)
where
	R: Rng + ?Sized,
{
	let mut indexes: Vec<usize> = (0..n).collect();
	if n < 2 {
		return (indexes, Vec::new());
	}
	let train_fraction = if (0.0..=1.0).contains(&train_fraction) {
		train_fraction
	} else {
		DEFAULT_TRAIN_FRACTION
	};
	indexes.shuffle(rng);
	let train_count = ((n as f64 * train_fraction).floor() as usize).max(1).min(n - 1);
	let validation_indexes = indexes.split_off(train_count);
	(indexes, validation_indexes)
}

#[cfg(test)]
fn rng() -> rand_xoshiro::Xoshiro256Plus {
	use rand::SeedableRng;
	rand_xoshiro::Xoshiro256Plus::seed_from_u64(42)
}

#[test]
fn test_shuffle_split_counts() {
	let counts = |n, train_fraction| {
		let (train, validation) = shuffle_split(n, train_fraction, &mut rng());
		(train.len(), validation.len())
	};
	assert_eq!(counts(10, 0.8), (8, 2));
	assert_eq!(counts(10, 0.55), (5, 5));
	assert_eq!(counts(10, 1.0), (9, 1));
	assert_eq!(counts(10, 0.0), (1, 9));
	assert_eq!(counts(10, 1.5), (8, 2));
	assert_eq!(counts(10, -0.1), (8, 2));
	assert_eq!(counts(10, f64::NAN), (8, 2));
	assert_eq!(counts(2, 0.8), (1, 1));
	assert_eq!(counts(1, 0.8), (1, 0));
	assert_eq!(counts(0, 0.8), (0, 0));
}

#[test]
fn test_shuffle_split_is_a_seeded_permutation() {
	let (train, validation) = shuffle_split(50, 0.8, &mut rng());
	let mut all: Vec<usize> = train.iter().chain(validation.iter()).cloned().collect();
	all.sort_unstable();
	assert_eq!(all, (0..50).collect::<Vec<_>>());
	assert_eq!(shuffle_split(50, 0.8, &mut rng()), (train.clone(), validation));
	assert_ne!(train, (0..40).collect::<Vec<_>>());
}
