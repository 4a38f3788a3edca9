/*!
This crate trains ensembles of shallow regression trees with gradient boosting on the squared error loss. Each tree is grown from per-example gradients and hessians by searching equal-width histograms of every feature for the split with the highest gain. A [`Booster`] holds one sequence of trees for each target column, and its prediction for a target is the learning-rate-scaled sum of the outputs of that target's trees.

```
use ndarray::prelude::*;
use triage_tree::{Booster, TrainOptions};

let features = arr2(&[[0.0], [1.0], [2.0], [3.0]]);
let labels = arr2(&[[0.0], [0.0], [5.0], [5.0]]);
let options = TrainOptions {
	learning_rate: 1.0,
	max_depth: 1,
	min_examples_per_node: 1,
	n_bins: 2,
	..Default::default()
};
let mut booster = Booster::new(1, options);
booster.fit(features.view(), labels.view(), 1, &mut |_| {});
let prediction = booster.predict(aview1(&[3.0]));
assert!((prediction[0] - 5.0).abs() < 1e-2);
```
*/

#![allow(clippy::tabs_in_doc_comments)]

mod booster;
mod choose_best_split;
mod compute_bin_stats;
mod feature_importances;
mod train;

pub use self::booster::Booster;
pub use self::feature_importances::compute_feature_importances;
pub use self::train::train_tree;

use ndarray::prelude::*;

/// This is the constant added to the sum of hessians in the denominator of every leaf value and gain computation. It keeps leaf values finite when a node's hessians sum to zero and acts as a small fixed L2 regularization. It is not configurable.
pub const L2_REGULARIZATION: f64 = 1e-3;

/// These are the options passed to [`train_tree`] and [`Booster::new`].
#[derive(Clone, Debug)]
pub struct TrainOptions {
	/// If true, the booster will record the loss on the training data for each target after each round.
	pub compute_loss: bool,
	/// The learning rate scales each tree's output when it is added to the ensemble's prediction.
	pub learning_rate: f64,
	/// The depth of a single tree will never exceed this value. A `max_depth` of zero produces trees with a single leaf.
	pub max_depth: usize,
	/// A node with this many examples or fewer becomes a leaf, and a split is only valid if each child receives at least this many examples. This must be at least one.
	pub min_examples_per_node: usize,
	/// This is the number of equal-width bins each feature's range is divided into when searching for a split. This must be at least two.
	pub n_bins: usize,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			compute_loss: false,
			learning_rate: 0.1,
			max_depth: 3,
			min_examples_per_node: 5,
			n_bins: 255,
		}
	}
}

/// This enum reports the training progress to the `update_progress` callback passed to [`Booster::fit`].
#[derive(Clone, Debug, PartialEq)]
pub enum TrainProgress {
	/// A round is about to start. `round` counts from zero.
	Training { round: usize, n_rounds: usize },
	/// A round finished and one tree was added for every target. If `compute_loss` is enabled, `losses` holds the training loss for each target.
	Trained {
		round: usize,
		losses: Option<Vec<f64>>,
	},
}

/// Trees are stored as a `Vec` of `Node`s. The root is at index zero and the nodes are in pre-order, so each branch comes before its left subtree, which comes before its right subtree. Each branch has two indexes into the `Vec`, one for each of its children.
#[derive(Clone, Debug, PartialEq)]
pub struct Tree {
	pub nodes: Vec<Node>,
}

impl Tree {
	/// Make a prediction for a given example. The example must have an entry for every feature index used by the tree, see [`Tree::max_feature_index`].
	pub fn predict(&self, example: ArrayView1<f64>) -> f64 {
		// Start at the root node.
		let mut node_index = 0;
		// Traverse the tree until we get to a leaf.
		loop {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					feature_index,
					split_value,
					left_child_index,
					right_child_index,
				}) => {
					node_index = if example[*feature_index] <= *split_value {
						*left_child_index
					} else {
						*right_child_index
					};
				}
				// We made it to a leaf! The prediction is the leaf's value.
				Node::Leaf(LeafNode { value }) => return *value,
			}
		}
	}

	/// Count the leaves in the tree.
	pub fn n_leaves(&self) -> usize {
		self.nodes
			.iter()
			.filter(|node| matches!(node, Node::Leaf(_)))
			.count()
	}

	/// Compute the length of the longest path from the root to a leaf. A tree with a single leaf has depth zero.
	pub fn depth(&self) -> usize {
		let mut max_depth = 0;
		let mut stack = vec![(0, 0)];
		while let Some((node_index, depth)) = stack.pop() {
			match &self.nodes[node_index] {
				Node::Branch(BranchNode {
					left_child_index,
					right_child_index,
					..
				}) => {
					stack.push((*left_child_index, depth + 1));
					stack.push((*right_child_index, depth + 1));
				}
				Node::Leaf(_) => max_depth = max_depth.max(depth),
			}
		}
		max_depth
	}

	/// Retrieve the largest feature index used by any branch, or `None` if the tree is a single leaf. Examples passed to [`Tree::predict`] must be longer than this index.
	pub fn max_feature_index(&self) -> Option<usize> {
		self.nodes
			.iter()
			.filter_map(|node| node.as_branch().map(|branch| branch.feature_index))
			.max()
	}
}

/// A node is either a branch or a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Branch(BranchNode),
	Leaf(LeafNode),
}

impl Node {
	pub fn as_branch(&self) -> Option<&BranchNode> {
		match self {
			Node::Branch(branch) => Some(branch),
			Node::Leaf(_) => None,
		}
	}

	pub fn as_branch_mut(&mut self) -> Option<&mut BranchNode> {
		match self {
			Node::Branch(branch) => Some(branch),
			Node::Leaf(_) => None,
		}
	}

	pub fn as_leaf(&self) -> Option<&LeafNode> {
		match self {
			Node::Branch(_) => None,
			Node::Leaf(leaf) => Some(leaf),
		}
	}
}

/// A `BranchNode` takes the value of a single feature, compares it with `split_value`, and if the value is <= `split_value`, the example is sent to the left child, and if it is > `split_value`, it is sent to the right child.
#[derive(Clone, Debug, PartialEq)]
pub struct BranchNode {
	/// This is the index of the feature to get the value for.
	pub feature_index: usize,
	/// This is the threshold value of the split. It is the upper edge of a histogram bin, not necessarily a value seen in training.
	pub split_value: f64,
	/// This is the index in the tree's node vector for this node's left child.
	pub left_child_index: usize,
	/// This is the index in the tree's node vector for this node's right child.
	pub right_child_index: usize,
}

/// The leaves in a tree hold the values to output for examples that get sent to them.
#[derive(Clone, Debug, PartialEq)]
pub struct LeafNode {
	/// This is the value to output. It is not scaled by the learning rate.
	pub value: f64,
}

#[cfg(test)]
fn stump(feature_index: usize, split_value: f64, left: f64, right: f64) -> Tree {
	Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				feature_index,
				split_value,
				left_child_index: 1,
				right_child_index: 2,
			}),
			Node::Leaf(LeafNode { value: left }),
			Node::Leaf(LeafNode { value: right }),
		],
	}
}

#[test]
fn test_predict_sends_values_equal_to_the_split_value_left() {
	let tree = stump(1, 0.5, -1.0, 1.0);
	assert_eq!(tree.predict(aview1(&[100.0, 0.5])), -1.0);
	assert_eq!(tree.predict(aview1(&[-100.0, 0.5000001])), 1.0);
	assert_eq!(tree.predict(aview1(&[0.0, -0.5])), -1.0);
}

#[test]
fn test_predict_single_leaf() {
	let tree = Tree {
		nodes: vec![Node::Leaf(LeafNode { value: 2.5 })],
	};
	assert_eq!(tree.predict(aview1(&[])), 2.5);
	assert_eq!(tree.depth(), 0);
	assert_eq!(tree.n_leaves(), 1);
	assert_eq!(tree.max_feature_index(), None);
}

#[test]
fn test_introspection() {
	let tree = Tree {
		nodes: vec![
			Node::Branch(BranchNode {
				feature_index: 0,
				split_value: 1.0,
				left_child_index: 1,
				right_child_index: 2,
			}),
			Node::Leaf(LeafNode { value: 0.0 }),
			Node::Branch(BranchNode {
				feature_index: 3,
				split_value: 2.0,
				left_child_index: 3,
				right_child_index: 4,
			}),
			Node::Leaf(LeafNode { value: 1.0 }),
			Node::Leaf(LeafNode { value: 2.0 }),
		],
	};
	assert_eq!(tree.depth(), 2);
	assert_eq!(tree.n_leaves(), 3);
	assert_eq!(tree.max_feature_index(), Some(3));
	assert_eq!(tree.predict(aview1(&[2.0, 0.0, 0.0, 2.0])), 1.0);
	assert_eq!(tree.predict(aview1(&[2.0, 0.0, 0.0, 2.1])), 2.0);
}

#[test]
#[should_panic]
fn test_predict_panics_on_an_example_that_is_too_short() {
	let tree = stump(2, 0.5, -1.0, 1.0);
	tree.predict(aview1(&[0.0, 0.0]));
}
