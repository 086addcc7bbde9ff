//! Random Forest для регрессии

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};
use crate::models::evaluation::r2_score;

#[derive(Debug, Clone, Copy)]
struct TreeParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Дерево регрессии с разбиениями по уменьшению суммы квадратов отклонений
#[derive(Debug, Clone)]
struct RegressionTree {
    root: TreeNode,
    /// Суммарное уменьшение SSE по признакам, нормировано к 1
    importances: Vec<f64>,
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: TreeParams,
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            let v = self.y[i];
            (s + v, sq + v * v)
        });
        let mean = sum / n as f64;
        let sse = sum_sq - sum * sum / n as f64;

        let pure = indices
            .first()
            .map_or(true, |&first| indices.iter().all(|&i| self.y[i] == self.y[first]));
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || n < self.params.min_samples_split || pure {
            return TreeNode::Leaf { value: mean };
        }

        let Some(best) = self.best_split(&indices, sum, sum_sq, sse) else {
            return TreeNode::Leaf { value: mean };
        };

        self.importances[best.feature] += best.gain;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, best.feature]] <= best.threshold);

        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.build(left_indices, depth + 1)),
            right: Box::new(self.build(right_indices, depth + 1)),
        }
    }

    /// Перебор всех признаков и всех порогов между соседними различными значениями
    fn best_split(
        &self,
        indices: &[usize],
        sum: f64,
        sum_sq: f64,
        parent_sse: f64,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf;
        let mut best: Option<BestSplit> = None;
        let mut best_score = f64::INFINITY;

        let mut sorted = indices.to_vec();
        for feature in 0..self.x.ncols() {
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 1..n {
                let v = self.y[sorted[k - 1]];
                left_sum += v;
                left_sq += v * v;

                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = self.x[[sorted[k - 1], feature]];
                let hi = self.x[[sorted[k], feature]];
                if lo >= hi {
                    continue;
                }

                let left_n = k as f64;
                let right_n = (n - k) as f64;
                let right_sum = sum - left_sum;
                let left_sse = left_sq - left_sum * left_sum / left_n;
                let right_sse = (sum_sq - left_sq) - right_sum * right_sum / right_n;
                let score = left_sse + right_sse;

                if score < best_score {
                    best_score = score;
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        gain: (parent_sse - score).max(0.0),
                    });
                }
            }
        }

        best
    }
}

impl RegressionTree {
    fn fit(x: &Array2<f64>, y: &Array1<f64>, indices: Vec<usize>, params: TreeParams) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            params,
            importances: vec![0.0; x.ncols()],
        };
        let root = builder.build(indices, 0);

        let mut importances = builder.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        Self { root, importances }
    }

    fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }
}

/// Ансамбль деревьев на bootstrap-выборках; прогноз — среднее по деревьям
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub random_state: u64,
    trees: Vec<RegressionTree>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state: 42,
            trees: Vec::new(),
            feature_importances: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PipelineError::Shape {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PipelineError::EmptyDataset("cannot fit forest on zero rows"));
        }

        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        };

        self.n_features = x.ncols();
        self.trees = (0..self.n_estimators)
            .map(|tree_idx| {
                let seed = self.random_state.wrapping_add(tree_idx as u64);
                let mut rng = StdRng::seed_from_u64(seed);

                let indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                RegressionTree::fit(x, y, indices, params)
            })
            .collect();

        self.compute_feature_importances();
        tracing::debug!("Random forest fitted: {} trees on {} rows", self.trees.len(), n_samples);
        Ok(())
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, imp) in total.iter_mut().zip(&tree.importances) {
                *acc += imp;
            }
        }

        // Нормализация: сумма 1, если хотя бы одно дерево сделало разбиение
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PipelineError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let n_trees = self.trees.len() as f64;
        let predictions: Array1<f64> = x
            .axis_iter(Axis(0))
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect();
        Ok(predictions)
    }

    /// R² на переданной выборке
    pub fn score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let pred = self.predict(x)?;
        Ok(r2_score(y, &pred))
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        // y зависит только от первого признака
        let n = 40;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            if j == 0 {
                i as f64
            } else {
                ((i * 7) % 5) as f64
            }
        });
        let y = Array1::from_shape_fn(n, |i| if i < 20 { 1.0 } else { 5.0 });
        (x, y)
    }

    #[test]
    fn single_tree_without_bootstrap_fits_exactly() {
        let (x, y) = step_data();
        let mut forest = RandomForestRegressor::new(1).with_bootstrap(false);
        forest.fit(&x, &y).unwrap();
        let pred = forest.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-12);
        }
        let imp = forest.feature_importances().unwrap();
        assert!((imp[0] - 1.0).abs() < 1e-12);
        assert_eq!(imp[1], 0.0);
    }

    #[test]
    fn importances_are_non_negative_and_sum_to_one() {
        let (x, y) = step_data();
        let mut forest = RandomForestRegressor::new(25).with_random_state(42);
        forest.fit(&x, &y).unwrap();
        let imp = forest.feature_importances().unwrap();
        assert!(imp.iter().all(|v| *v >= 0.0));
        assert!((imp.sum() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let (x, y) = step_data();
        let mut a = RandomForestRegressor::new(10).with_random_state(7);
        let mut b = RandomForestRegressor::new(10).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
        assert_eq!(a.n_trees(), 10);
    }

    #[test]
    fn max_depth_limits_the_tree() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0, 3.0];
        let mut stump = RandomForestRegressor::new(1)
            .with_bootstrap(false)
            .with_max_depth(Some(1));
        stump.fit(&x, &y).unwrap();
        let pred = stump.predict(&x).unwrap();
        assert_eq!(pred, array![0.5, 0.5, 2.5, 2.5]);
    }

    #[test]
    fn constant_target_gives_zero_importances() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0]];
        let y = array![3.0, 3.0, 3.0];
        let mut forest = RandomForestRegressor::new(5);
        forest.fit(&x, &y).unwrap();
        assert!(forest.feature_importances().unwrap().iter().all(|v| *v == 0.0));
        assert!(forest.predict(&x).unwrap().iter().all(|v| (*v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn low_variance_target_is_still_split() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1e-7, 1e-7];
        let mut forest = RandomForestRegressor::new(1).with_bootstrap(false);
        forest.fit(&x, &y).unwrap();

        let pred = forest.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-20);
        }
        assert_eq!(forest.feature_importances().unwrap()[0], 1.0);
    }

    #[test]
    fn predict_before_fit_fails() {
        let forest = RandomForestRegressor::new(3);
        let x = array![[1.0, 2.0]];
        assert!(matches!(forest.predict(&x), Err(PipelineError::NotFitted)));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let mut forest = RandomForestRegressor::new(3);
        assert!(matches!(forest.fit(&x, &y), Err(PipelineError::Shape { .. })));

        let y = array![1.0, 2.0];
        forest.fit(&x, &y).unwrap();
        let wide = array![[1.0, 2.0]];
        assert!(matches!(forest.predict(&wide), Err(PipelineError::Shape { .. })));
    }
}
