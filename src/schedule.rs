//! Depth-indexed branch-weight schedules and the two ways GSTAR draws them.
//!
//! - [`Sweep`] enumerates every non-zero 0/1 vector of a given length.
//! - [`Dirichlet`] draws random points of the probability simplex.

use std::fmt;

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::error::{GstarError, Result};

/// Longest schedule the exhaustive sweep can enumerate with a `u64` counter.
pub const MAX_SWEEP_LEVELS: usize = 63;

/// Maps a node depth to a branch weight.
pub enum Schedule {
    /// Same weight at every depth.
    Constant(f64),
    /// `v[d]` at depth `d`, 0 past the end.
    Vector(Vec<f64>),
    Function(Box<dyn Fn(usize) -> f64 + Send + Sync>),
}

impl Schedule {
    pub fn weight_at(&self, depth: usize) -> f64 {
        match self {
            Schedule::Constant(weight) => *weight,
            Schedule::Vector(weights) => weights.get(depth).copied().unwrap_or(0.0),
            Schedule::Function(f) => f(depth),
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Constant(1.0)
    }
}

impl From<Vec<f64>> for Schedule {
    fn from(weights: Vec<f64>) -> Self {
        Schedule::Vector(weights)
    }
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Constant(weight) => f.debug_tuple("Constant").field(weight).finish(),
            Schedule::Vector(weights) => f.debug_tuple("Vector").field(weights).finish(),
            Schedule::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Exhaustive enumeration of the non-zero 0/1 schedules of `levels` entries.
///
/// Counter value `c` in `1..2^levels` maps to the vector whose entry `k` is
/// bit `k` of `c`. The all-zero vector is skipped since it collapses every
/// branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    levels: usize,
    next: u64,
}

impl Sweep {
    /// # Errors
    /// [`GstarError::Precondition`] if `levels` is 0 or above [`MAX_SWEEP_LEVELS`].
    pub fn new(levels: usize) -> Result<Self> {
        if levels == 0 || levels > MAX_SWEEP_LEVELS {
            return Err(GstarError::Precondition(format!(
                "exhaustive sweep needs 1 to {MAX_SWEEP_LEVELS} levels, got {levels}"
            )));
        }
        Ok(Self { levels, next: 1 })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Number of schedules visited by a full sweep, `2^levels - 1`.
    pub fn trials(&self) -> u64 {
        (1u64 << self.levels) - 1
    }

    /// The schedule for counter value `counter`.
    pub fn vector(&self, counter: u64) -> Vec<f64> {
        (0..self.levels)
            .map(|k| ((counter >> k) & 1) as f64)
            .collect()
    }
}

impl Iterator for Sweep {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.trials() {
            return None;
        }
        let vector = self.vector(self.next);
        self.next += 1;
        Some(vector)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.trials() + 1).saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Sweep {}

/// Symmetric Dirichlet distribution over `dim` coordinates.
///
/// Each coordinate is an independent `Gamma(alpha, 1)` draw; the vector is
/// then scaled to sum to 1.
#[derive(Debug, Clone, Copy)]
pub struct Dirichlet {
    dim: usize,
    gamma: Gamma<f64>,
}

impl Dirichlet {
    /// # Errors
    /// [`GstarError::Precondition`] if `dim` is 0 or `alpha` is not
    /// positive.
    pub fn new(dim: usize, alpha: f64) -> Result<Self> {
        if dim == 0 {
            return Err(GstarError::Precondition(
                "Dirichlet dimension must be at least 1".to_string(),
            ));
        }
        let gamma = Gamma::new(alpha, 1.0).map_err(|e| {
            GstarError::Precondition(format!("invalid Dirichlet concentration {alpha}: {e}"))
        })?;
        Ok(Self { dim, gamma })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Draw one point of the simplex.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        let mut draws: Vec<f64> = (0..self.dim).map(|_| self.gamma.sample(rng)).collect();
        let total: f64 = draws.iter().sum();
        if total > 0.0 {
            for x in &mut draws {
                *x /= total;
            }
        } else {
            // every draw underflowed
            draws.fill(1.0 / self.dim as f64);
        }
        draws
    }
}
