//! CART decision tree with weighted Gini impurity for two classes.
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::math::Array2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Weighted class fractions, indexed by class code.
    Leaf { distribution: [f64; 2] },
    /// Rows with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

struct Builder<'a, R: Rng> {
    x: &'a Array2<f64>,
    y: &'a [u8],
    weights: &'a [f64],
    params: TreeParams,
    rng: &'a mut R,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Weighted impurity of both children.
    child_impurity: f64,
}

fn gini(w: [f64; 2]) -> f64 {
    let total = w[0] + w[1];
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = w[0] / total;
    let p1 = w[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

impl DecisionTree {
    /// Grow a tree on the rows with positive weight.
    ///
    /// `weights` combines bootstrap multiplicity and class weight. Returns the
    /// tree and its raw (unnormalised) impurity decrease per feature.
    pub fn fit<R: Rng>(
        x: &Array2<f64>,
        y: &[u8],
        weights: &[f64],
        params: TreeParams,
        rng: &mut R,
    ) -> (Self, Vec<f64>) {
        let mut samples: Vec<usize> = (0..x.nrows()).filter(|&i| weights[i] > 0.0).collect();
        let mut builder = Builder {
            x,
            y,
            weights,
            params,
            rng,
            nodes: Vec::new(),
            importances: vec![0.0; x.ncols()],
        };
        builder.build(&mut samples, 0);
        (
            DecisionTree {
                nodes: builder.nodes,
                n_features: x.ncols(),
            },
            builder.importances,
        )
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Class distribution of the leaf `row` falls into.
    pub fn leaf_distribution(&self, row: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return *distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Structural sanity check used when loading a persisted tree.
    pub fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { distribution } => distribution.iter().all(|p| p.is_finite()),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < self.n_features
                        && threshold.is_finite()
                        && *left > i
                        && *right > i
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

impl<'a, R: Rng> Builder<'a, R> {
    fn class_weights(&self, samples: &[usize]) -> [f64; 2] {
        let mut w = [0.0; 2];
        for &i in samples {
            w[self.y[i] as usize] += self.weights[i];
        }
        w
    }

    fn build(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let w = self.class_weights(samples);
        let total = w[0] + w[1];
        let impurity = gini(w);
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: [w[0] / total, w[1] / total],
        });

        let depth_reached = self.params.max_depth.map_or(false, |d| depth >= d);
        if depth_reached
            || samples.len() < self.params.min_samples_split
            || samples.len() < 2 * self.params.min_samples_leaf
            || impurity <= f64::EPSILON
        {
            return node_idx;
        }

        let Some(best) = self.find_split(samples) else {
            return node_idx;
        };

        self.importances[best.feature] += total * impurity - best.child_impurity;

        let feature = best.feature;
        let threshold = best.threshold;
        let x = self.x;
        let split_at = partition(samples, |&i| x[(i, feature)] <= threshold);
        let (left_samples, right_samples) = samples.split_at_mut(split_at);

        let left = self.build(left_samples, depth + 1);
        let right = self.build(right_samples, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        node_idx
    }

    /// Visit features in random order until `max_features` non-constant
    /// features have been evaluated; keep looking past that while no valid
    /// split has been found.
    fn find_split(&mut self, samples: &[usize]) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut *self.rng);

        let mut best: Option<BestSplit> = None;
        let mut visited = 0;
        let mut column: Vec<(f64, usize)> = Vec::with_capacity(samples.len());

        for feature in features {
            if visited >= self.params.max_features && best.is_some() {
                break;
            }
            column.clear();
            column.extend(samples.iter().map(|&i| (self.x[(i, feature)], i)));
            column.sort_by(|a, b| a.0.total_cmp(&b.0));
            if column[0].0 == column[column.len() - 1].0 {
                continue;
            }
            visited += 1;

            let mut left_w = [0.0f64; 2];
            let mut right_w = self.class_weights(samples);
            let min_leaf = self.params.min_samples_leaf;

            for pos in 0..column.len() - 1 {
                let (value, i) = column[pos];
                let c = self.y[i] as usize;
                left_w[c] += self.weights[i];
                right_w[c] -= self.weights[i];

                let next = column[pos + 1].0;
                if next <= value {
                    continue;
                }
                let n_left = pos + 1;
                if n_left < min_leaf || column.len() - n_left < min_leaf {
                    continue;
                }
                let wl = left_w[0] + left_w[1];
                let wr = right_w[0] + right_w[1];
                let child = wl * gini(left_w) + wr * gini(right_w);
                if best.as_ref().map_or(true, |b| child < b.child_impurity) {
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        child_impurity: child,
                    });
                }
            }
        }
        best
    }
}

/// Move elements satisfying `pred` to the front; return how many there are.
fn partition<T, F: Fn(&T) -> bool>(items: &mut [T], pred: F) -> usize {
    let mut next = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(i, next);
            next += 1;
        }
    }
    next
}
