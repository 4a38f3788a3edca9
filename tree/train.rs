use crate::{
	choose_best_split::{choose_best_split, ChooseBestSplitOptions, ChooseBestSplitOutput},
	BranchNode, LeafNode, Node, TrainOptions, Tree, L2_REGULARIZATION,
};
use ndarray::prelude::*;

/**
Train a single regression tree on `features` (one row per example) using the per-example `gradients` and `hessians`.

Starting from the root, each node with more than `min_examples_per_node` examples and a depth below `max_depth` searches every feature for the histogram split with the highest gain. If a split is found, the node's examples are partitioned by the split's threshold, preserving their relative order, and each child is trained the same way. Otherwise the node becomes a leaf with value `-sum_gradients / (sum_hessians + L2_REGULARIZATION)`. A node with no examples becomes a leaf with value zero.

`gradients` and `hessians` must have one entry for each row of `features`. This is not checked.
*/
pub fn train_tree(
	features: ArrayView2<f64>,
	gradients: &[f64],
	hessians: &[f64],
	options: &TrainOptions,
) -> Tree {
	let mut examples_index: Vec<usize> = (0..gradients.len()).collect();
	let mut examples_index_buffer = vec![0; gradients.len()];
	let mut nodes = Vec::new();
	train_node(TrainNodeOptions {
		features: features.view(),
		gradients,
		hessians,
		examples_index: &mut examples_index,
		examples_index_buffer: &mut examples_index_buffer,
		depth: 0,
		nodes: &mut nodes,
		train_options: options,
	});
	Tree { nodes }
}

struct TrainNodeOptions<'a, 'b> {
	features: ArrayView2<'a, f64>,
	gradients: &'a [f64],
	hessians: &'a [f64],
	/// The indexes of the examples that reach this node, in their original relative order.
	examples_index: &'b mut [usize],
	/// Scratch space with the same length as `examples_index`.
	examples_index_buffer: &'b mut [usize],
	depth: usize,
	nodes: &'b mut Vec<Node>,
	train_options: &'a TrainOptions,
}

/// Train the subtree for one node, appending its nodes in pre-order, and return the node's index.
fn train_node(options: TrainNodeOptions) -> usize {
	let TrainNodeOptions {
		features,
		gradients,
		hessians,
		examples_index,
		examples_index_buffer,
		depth,
		nodes,
		train_options,
	} = options;
	let node_index = nodes.len();
	// A split can send every example to one side. The empty child is a leaf with value zero.
	if examples_index.is_empty() {
		nodes.push(Node::Leaf(LeafNode { value: 0.0 }));
		return node_index;
	}
	let (sum_gradients, sum_hessians) = examples_index.iter().fold(
		(0.0, 0.0),
		|(sum_gradients, sum_hessians), &example_index| {
			(
				sum_gradients + gradients[example_index],
				sum_hessians + hessians[example_index],
			)
		},
	);
	let leaf = Node::Leaf(LeafNode {
		value: compute_leaf_value(sum_gradients, sum_hessians),
	});
	if depth >= train_options.max_depth
		|| examples_index.len() <= train_options.min_examples_per_node
	{
		nodes.push(leaf);
		return node_index;
	}
	let split = choose_best_split(ChooseBestSplitOptions {
		features: features.view(),
		examples_index,
		gradients,
		hessians,
		sum_gradients,
		sum_hessians,
		train_options,
	});
	let split = match split {
		Some(split) => split,
		None => {
			nodes.push(leaf);
			return node_index;
		}
	};
	let ChooseBestSplitOutput {
		feature_index,
		split_value,
		..
	} = split;
	let n_left = rearrange_examples_index(
		features.column(feature_index),
		split_value,
		examples_index,
		examples_index_buffer,
	);
	// The child indexes are filled in once the children have been trained.
	nodes.push(Node::Branch(BranchNode {
		feature_index,
		split_value,
		left_child_index: 0,
		right_child_index: 0,
	}));
	let (left_examples_index, right_examples_index) = examples_index.split_at_mut(n_left);
	let (left_examples_index_buffer, right_examples_index_buffer) =
		examples_index_buffer.split_at_mut(n_left);
	let left_child_index = train_node(TrainNodeOptions {
		features,
		gradients,
		hessians,
		examples_index: left_examples_index,
		examples_index_buffer: left_examples_index_buffer,
		depth: depth + 1,
		nodes,
		train_options,
	});
	let right_child_index = train_node(TrainNodeOptions {
		features,
		gradients,
		hessians,
		examples_index: right_examples_index,
		examples_index_buffer: right_examples_index_buffer,
		depth: depth + 1,
		nodes,
		train_options,
	});
	if let Some(branch) = nodes[node_index].as_branch_mut() {
		branch.left_child_index = left_child_index;
		branch.right_child_index = right_child_index;
	}
	node_index
}

/// Compute the value of a leaf from the sums of the gradients and hessians of the examples that reach it.
pub fn compute_leaf_value(sum_gradients: f64, sum_hessians: f64) -> f64 {
	-sum_gradients / (sum_hessians + L2_REGULARIZATION)
}

/// Stably partition `examples_index` so the examples whose value is <= `split_value` come first, and return how many there are.
fn rearrange_examples_index(
	feature_values: ArrayView1<f64>,
	split_value: f64,
	examples_index: &mut [usize],
	examples_index_buffer: &mut [usize],
) -> usize {
	let mut n_left = 0;
	for &example_index in examples_index.iter() {
		if feature_values[example_index] <= split_value {
			examples_index_buffer[n_left] = example_index;
			n_left += 1;
		}
	}
	let mut n_right = 0;
	for &example_index in examples_index.iter() {
		if feature_values[example_index] > split_value {
			examples_index_buffer[n_left + n_right] = example_index;
			n_right += 1;
		}
	}
	examples_index.copy_from_slice(examples_index_buffer);
	n_left
}

#[cfg(test)]
fn options(max_depth: usize, min_examples_per_node: usize, n_bins: usize) -> TrainOptions {
	TrainOptions {
		max_depth,
		min_examples_per_node,
		n_bins,
		..Default::default()
	}
}

#[test]
fn test_empty_node_is_a_zero_leaf() {
	let features = Array2::<f64>::zeros((0, 3));
	let tree = train_tree(features.view(), &[], &[], &options(3, 1, 4));
	assert_eq!(tree.nodes, vec![Node::Leaf(LeafNode { value: 0.0 })]);
}

#[test]
fn test_max_depth_zero_is_a_single_leaf() {
	let features = arr2(&[[0.0, 1.0], [1.0, 0.0], [2.0, 5.0]]);
	let gradients = [0.5, -2.0, 4.0];
	let hessians = [1.0, 2.0, 0.5];
	let tree = train_tree(features.view(), &gradients, &hessians, &options(0, 1, 4));
	assert_eq!(tree.nodes.len(), 1);
	let value = tree.nodes[0].as_leaf().unwrap().value;
	assert_eq!(value, -(0.5 - 2.0 + 4.0) / (1.0 + 2.0 + 0.5 + 1e-3));
}

#[test]
fn test_too_few_examples_is_a_single_leaf() {
	let features = arr2(&[[0.0], [1.0], [2.0]]);
	let gradients = [1.0, 1.0, -1.0];
	let hessians = [1.0, 1.0, 1.0];
	let tree = train_tree(features.view(), &gradients, &hessians, &options(5, 3, 4));
	assert_eq!(tree.n_leaves(), 1);
}

#[test]
fn test_identical_rows_produce_the_fallback_leaf() {
	let features = arr2(&[[1.0, 2.0], [1.0, 2.0], [1.0, 2.0], [1.0, 2.0]]);
	let gradients = [3.0, -7.0, 0.25, 100.0];
	let hessians = [1.0, 0.5, 2.0, 1.0];
	for max_depth in 1..4 {
		for min_examples_per_node in 1..3 {
			let tree = train_tree(
				features.view(),
				&gradients,
				&hessians,
				&options(max_depth, min_examples_per_node, 8),
			);
			assert_eq!(
				tree.nodes,
				vec![Node::Leaf(LeafNode {
					value: -(3.0 - 7.0 + 0.25 + 100.0) / (1.0 + 0.5 + 2.0 + 1.0 + 1e-3),
				})]
			);
		}
	}
}

#[test]
fn test_step_function() {
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
	let gradients = [0.0, 0.0, -5.0, -5.0];
	let hessians = [1.0, 1.0, 1.0, 1.0];
	let tree = train_tree(features.view(), &gradients, &hessians, &options(1, 1, 2));
	insta::assert_debug_snapshot!(tree, @r###"
 Tree {
     nodes: [
         Branch(
             BranchNode {
                 feature_index: 0,
                 split_value: 1.5,
                 left_child_index: 1,
                 right_child_index: 2,
             },
         ),
         Leaf(
             LeafNode {
                 value: -0.0,
             },
         ),
         Leaf(
             LeafNode {
                 value: 4.997501249375313,
             },
         ),
     ],
 }
 "###);
}

#[test]
fn test_nodes_are_in_pre_order() {
	let features = arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0]]);
	let gradients = [4.0, 4.0, 1.0, 1.0, -1.0, -1.0, -4.0, -4.0];
	let hessians = [1.0; 8];
	let tree = train_tree(features.view(), &gradients, &hessians, &options(2, 1, 2));
	assert_eq!(tree.depth(), 2);
	assert_eq!(tree.n_leaves(), 4);
	let root = tree.nodes[0].as_branch().unwrap();
	assert_eq!(root.split_value, 3.5);
	assert_eq!(root.left_child_index, 1);
	assert_eq!(root.right_child_index, 4);
	let left = tree.nodes[1].as_branch().unwrap();
	assert_eq!((left.left_child_index, left.right_child_index), (2, 3));
	let right = tree.nodes[4].as_branch().unwrap();
	assert_eq!((right.left_child_index, right.right_child_index), (5, 6));
	assert_eq!(left.split_value, 1.5);
	assert_eq!(right.split_value, 5.5);
}

#[test]
fn test_examples_on_a_bin_edge_go_left() {
	// The histogram counts the examples with value 1.0 in the second bin, but the threshold is the first bin's upper edge, 1.0, so they are sent left. The right child receives fewer examples than `min_examples_per_node`.
	let features = arr2(&[[0.0], [0.0], [1.0], [1.0], [2.0]]);
	let gradients = [1.0, 1.0, -1.0, -1.0, -1.0];
	let hessians = [1.0; 5];
	let tree = train_tree(features.view(), &gradients, &hessians, &options(1, 2, 2));
	let root = tree.nodes[0].as_branch().unwrap();
	assert_eq!(root.split_value, 1.0);
	let left = tree.nodes[root.left_child_index].as_leaf().unwrap();
	let right = tree.nodes[root.right_child_index].as_leaf().unwrap();
	assert_eq!(left.value, -(1.0 + 1.0 - 1.0 - 1.0) / (4.0 + 1e-3));
	assert_eq!(right.value, 1.0 / (1.0 + 1e-3));
}

#[test]
fn test_a_split_can_leave_the_right_child_empty() {
	// At this magnitude adjacent floats are 2.0 apart, so the threshold min + width rounds up to the maximum and every example goes left.
	let features = arr2(&[[9007199254740994.0], [9007199254740996.0]]);
	let gradients = [1.0, -1.0];
	let hessians = [1.0, 1.0];
	let tree = train_tree(features.view(), &gradients, &hessians, &options(1, 1, 2));
	assert_eq!(tree.nodes.len(), 3);
	let root = tree.nodes[0].as_branch().unwrap();
	assert_eq!(root.split_value, 9007199254740996.0);
	let right = tree.nodes[root.right_child_index].as_leaf().unwrap();
	assert_eq!(right.value, 0.0);
	let prediction = tree.predict(aview1(&[9007199254740996.0]));
	assert_eq!(prediction, tree.nodes[root.left_child_index].as_leaf().unwrap().value);
}

#[test]
fn test_rearrange_examples_index_is_stable() {
	let values = arr1(&[5.0, 1.0, 6.0, 2.0, 7.0, 3.0]);
	let mut examples_index = [0, 1, 2, 3, 4, 5];
	let mut examples_index_buffer = [0; 6];
	let n_left = rearrange_examples_index(
		values.view(),
		3.0,
		&mut examples_index,
		&mut examples_index_buffer,
	);
	assert_eq!(n_left, 3);
	assert_eq!(examples_index, [1, 3, 5, 0, 2, 4]);
}

#[test]
fn test_root_split_matches_an_exhaustive_search() {
	use crate::choose_best_split::compute_gain;
	// Every feature takes the values 0 through 5 and with 11 bins each value lands in its own bin away from any edge, so the histogram search considers every distinct threshold.
	let n_examples = 12;
	let features = Array2::from_shape_fn((n_examples, 2), |(i, j)| match j {
		0 => (i % 6) as f64,
		_ => ((i * 5 + 1) % 6) as f64,
	});
	let gradients: Vec<f64> = (0..n_examples)
		.map(|i| ((i * 7) % 5) as f64 - 2.0)
		.collect();
	let hessians: Vec<f64> = (0..n_examples).map(|i| 1.0 + (i % 3) as f64 * 0.5).collect();
	let sums = |left: &dyn Fn(usize) -> bool| {
		(0..n_examples).filter(|i| left(*i)).fold((0.0, 0.0), |(g, h), i| {
			(g + gradients[i], h + hessians[i])
		})
	};
	let (sum_gradients, sum_hessians) = sums(&|_| true);
	let parent = sum_gradients * sum_gradients / (sum_hessians + L2_REGULARIZATION);
	let gain_for_partition = |left: &dyn Fn(usize) -> bool| {
		let (left_gradients, left_hessians) = sums(left);
		compute_gain(
			left_gradients,
			left_hessians,
			sum_gradients - left_gradients,
			sum_hessians - left_hessians,
			parent,
		)
	};
	let mut best_gain = f64::NEG_INFINITY;
	for feature_index in 0..2 {
		for threshold in 0..5 {
			let gain = gain_for_partition(&|i| features[(i, feature_index)] <= threshold as f64);
			if gain > best_gain {
				best_gain = gain;
			}
		}
	}
	let tree = train_tree(features.view(), &gradients, &hessians, &options(1, 1, 11));
	let root = tree.nodes[0].as_branch().unwrap();
	let goes_left = |i: usize| features[(i, root.feature_index)] <= root.split_value;
	let gain = gain_for_partition(&goes_left);
	assert!((gain - best_gain).abs() < 1e-9);
	// Each leaf moves its examples against the sum of their gradients.
	let (left_gradients, _) = sums(&goes_left);
	let left = tree.nodes[root.left_child_index].as_leaf().unwrap();
	let right = tree.nodes[root.right_child_index].as_leaf().unwrap();
	assert!(left.value * left_gradients <= 0.0);
	assert!(right.value * (sum_gradients - left_gradients) <= 0.0);
}
