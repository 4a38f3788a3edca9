use crate::{BranchNode, Node, Tree};

/// This function computes feature importances using the "split" method, where a feature's importance is proportional to the number of branch nodes that use it to split. The importances sum to one, unless no tree has a branch, in which case they are all zero.
pub fn compute_feature_importances(trees: &[Tree], n_features: usize) -> Vec<f64> {
	let mut feature_importances = vec![0.0; n_features];
	for tree in trees.iter() {
		for node in tree.nodes.iter() {
			if let Node::Branch(BranchNode { feature_index, .. }) = node {
				feature_importances[*feature_index] += 1.0;
			}
		}
	}
	// Normalize the feature_importances.
	let total: f64 = feature_importances.iter().sum();
	if total > 0.0 {
		for feature_importance in feature_importances.iter_mut() {
			*feature_importance /= total;
		}
	}
	feature_importances
}

#[test]
fn test_compute_feature_importances() {
	use crate::LeafNode;
	let branch = |feature_index, left_child_index, right_child_index| {
		Node::Branch(BranchNode {
			feature_index,
			split_value: 0.0,
			left_child_index,
			right_child_index,
		})
	};
	let leaf = || Node::Leaf(LeafNode { value: 0.0 });
	let trees = vec![
		Tree {
			nodes: vec![branch(2, 1, 2), leaf(), leaf()],
		},
		Tree {
			nodes: vec![branch(0, 1, 4), branch(2, 2, 3), leaf(), leaf(), leaf()],
		},
		Tree {
			nodes: vec![leaf()],
		},
	];
	assert_eq!(
		compute_feature_importances(&trees, 4),
		vec![1.0 / 3.0, 0.0, 2.0 / 3.0, 0.0]
	);
	assert_eq!(compute_feature_importances(&trees[2..], 2), vec![0.0, 0.0]);
}
