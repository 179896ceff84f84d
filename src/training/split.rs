//! Train/validation split and per-restart fold sampling.
//!
//! ## Layout
//!
//! ```text
//! permute(0..n, split_seed)
//!   ├─ first ⌊n · validation_fraction⌋ → validation set (fixed for the run)
//!   └─ remainder                        → training pool
//!                                           └─ per restart: k folds, each a
//!                                              ⌊fold_fraction · |pool|⌋ draw
//!                                              without replacement
//! ```
//!
//! Folds are independent draws and may overlap each other. They never touch
//! the validation set because they are drawn from the pool only.

use rand::prelude::*;

/// Positions into the example slice.
pub type IndexSet = Vec<usize>;

/// Fixed validation holdout plus the training pool it was carved from.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub validation: IndexSet,
    pub training_pool: IndexSet,
}

impl DatasetSplit {
    /// Permute `0..n` with `seed` and hold out the leading fraction.
    pub fn new(n: usize, validation_fraction: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut perm: Vec<usize> = (0..n).collect();
        perm.shuffle(&mut rng);

        let val_size = ((n as f64) * validation_fraction).floor() as usize;
        let training_pool = perm.split_off(val_size.min(n));

        Self {
            validation: perm,
            training_pool,
        }
    }

    /// Number of examples each fold draws.
    pub fn fold_size(&self, fold_fraction: f64) -> usize {
        ((self.training_pool.len() as f64) * fold_fraction).floor() as usize
    }

    /// Draw `count` folds from the training pool using the restart's source.
    pub fn draw_folds<R: Rng>(&self, rng: &mut R, count: usize, fold_fraction: f64) -> FoldCollection {
        let size = self.fold_size(fold_fraction);
        let folds = (0..count)
            .map(|_| {
                self.training_pool
                    .choose_multiple(rng, size)
                    .copied()
                    .collect::<IndexSet>()
            })
            .collect();
        FoldCollection { folds }
    }
}

/// Training folds for one restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldCollection {
    pub folds: Vec<IndexSet>,
}

impl FoldCollection {
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexSet> {
        self.folds.iter()
    }
}
