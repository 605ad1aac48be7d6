//! GSTAR: topology support from re-weighted STAR runs.
//!
//! Every trial overwrites the gene trees' branch lengths from a
//! depth-indexed schedule, runs STAR + NJ, and reduces the species tree to
//! a canonical topology string (re-rooted at the outgroup, sorted, without
//! branch lengths). The support of a topology is the share of trials that
//! produced it.
//!
//! Two ways of choosing schedules:
//! - `trials == 0`: every non-zero 0/1 schedule ([`Sweep`]).
//! - `trials > 0`: that many Dirichlet draws, each logged with its result.
//!
//! Trials run on the rayon pool. Results are collected in trial order and
//! tallied afterwards, so the support table does not depend on the number
//! of threads. Randomized trial `t` uses its own generator seeded with
//! `seed + t`.

use std::collections::HashMap;
use std::io::Write;

use itertools::Itertools;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::error::{GstarError, Result};
use crate::schedule::{Dirichlet, Schedule, Sweep};
use crate::star::Star;
use crate::tree::Tree;

/// Configured GSTAR run over a fixed set of gene trees.
#[derive(Debug, Clone)]
pub struct Gstar {
    star: Star,
    outgroup: String,
    seed: u64,
}

impl Gstar {
    /// Prepare a run over `trees`.
    ///
    /// Without an outgroup every tree has to be rooted (a two-way top) and
    /// results are rooted at the deepest leaf of the first tree, the first
    /// one in label order on ties.
    ///
    /// # Errors
    /// - [`GstarError::NoTrees`], or [`GstarError::LabelNotFound`] for
    ///   mismatched leaf sets or an unknown outgroup.
    /// - [`GstarError::MissingOutgroup`] if no outgroup is given and some
    ///   tree is unrooted.
    pub fn new(trees: Vec<Tree>, outgroup: Option<&str>) -> Result<Self> {
        let star = Star::new(trees)?;
        let outgroup = match outgroup {
            Some(label) if star.label_map().contains(label) => label.to_string(),
            Some(label) => return Err(GstarError::LabelNotFound(label.to_string())),
            None => default_outgroup(star.trees())?,
        };
        Ok(Self {
            star,
            outgroup,
            seed: rand::random(),
        })
    }

    pub fn from_newick<S: AsRef<str>>(newicks: &[S], outgroup: Option<&str>) -> Result<Self> {
        let trees = newicks
            .iter()
            .map(|s| Tree::from_newick(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(trees, outgroup)
    }

    /// Fix the seed of randomized runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn outgroup(&self) -> &str {
        &self.outgroup
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn star(&self) -> &Star {
        &self.star
    }

    /// Schedule length: the greatest number of levels over the gene trees.
    pub fn levels(&self) -> usize {
        self.star.max_depth()
    }

    /// Canonical topology of the STAR tree under one schedule.
    pub fn trial(&self, schedule: &Schedule) -> Result<String> {
        let mut species = self.star.reweighted(schedule).species_tree()?;
        species.canonical(&self.outgroup)
    }

    /// Exhaustive sweep when `trials` is 0, otherwise `trials` Dirichlet draws.
    pub fn run<W: Write + ?Sized>(&self, trials: usize, log: &mut W) -> Result<Support> {
        if trials == 0 {
            self.sweep()
        } else {
            self.sample(trials, log)
        }
    }

    /// Try every non-zero 0/1 schedule.
    pub fn sweep(&self) -> Result<Support> {
        let sweep = Sweep::new(self.levels())?;
        let trials = usize::try_from(sweep.trials()).map_err(|_| {
            GstarError::Precondition(format!("{} levels are too many to sweep", sweep.levels()))
        })?;
        info!(
            "sweeping {trials} schedules over {} levels, outgroup '{}'",
            sweep.levels(),
            self.outgroup
        );

        let topologies = (1..=trials)
            .into_par_iter()
            .map(|counter| self.trial(&Schedule::Vector(sweep.vector(counter as u64))))
            .collect::<Result<Vec<_>>>()?;

        Ok(Support::tally(topologies))
    }

    /// Draw `trials` schedules from a Dirichlet distribution with
    /// concentration equal to the schedule length, appending one
    /// `topology<TAB>s0,s1,...` line per trial to `log`.
    pub fn sample<W: Write + ?Sized>(&self, trials: usize, log: &mut W) -> Result<Support> {
        let levels = self.levels();
        let dirichlet = Dirichlet::new(levels, levels as f64)?;
        info!(
            "sampling {trials} schedules over {levels} levels, outgroup '{}', seed {}",
            self.outgroup, self.seed
        );

        let results = (0..trials)
            .into_par_iter()
            .map(|t| -> Result<(Vec<f64>, String)> {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));
                let weights = dirichlet.sample(&mut rng);
                let topology = self.trial(&Schedule::Vector(weights.clone()))?;
                Ok((weights, topology))
            })
            .collect::<Result<Vec<_>>>()?;

        for (weights, topology) in &results {
            writeln!(log, "{topology}\t{}", weights.iter().join(","))?;
        }
        log.flush()?;

        Ok(Support::tally(results.into_iter().map(|(_, topology)| topology)))
    }
}

/// Deepest leaf of the first tree; every tree must be rooted.
fn default_outgroup(trees: &[Tree]) -> Result<String> {
    if let Some(tree) = trees.iter().position(Tree::is_trifurcating) {
        return Err(GstarError::MissingOutgroup { tree });
    }
    let first = trees.first().ok_or(GstarError::NoTrees)?;
    let label = first.deepest_leaf().ok_or(GstarError::NoTrees)?;
    info!("no outgroup given, rooting at deepest leaf '{label}'");
    Ok(label.to_string())
}

/// Support ratio per topology, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Support {
    entries: Vec<(String, f64)>,
    trials: usize,
}

impl Support {
    /// Count equal topology strings.
    pub fn tally<I: IntoIterator<Item = String>>(topologies: I) -> Self {
        let counts: HashMap<String, usize> = topologies.into_iter().counts();
        let trials = counts.values().sum();
        Self::from_counts(counts, trials)
    }

    /// Ratios `count / trials`, ordered by decreasing ratio, then topology.
    pub fn from_counts(counts: HashMap<String, usize>, trials: usize) -> Self {
        let mut entries: Vec<(String, f64)> = counts
            .into_iter()
            .map(|(topology, count)| (topology, count as f64 / trials.max(1) as f64))
            .collect();
        entries.sort_by(|(ta, a), (tb, b)| b.total_cmp(a).then_with(|| ta.cmp(tb)));
        debug!("{} distinct topologies in {trials} trials", entries.len());
        Self { entries, trials }
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(String, f64)> {
        self.entries
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ratio_of(&self, topology: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| t == topology)
            .map(|&(_, ratio)| ratio)
    }

    /// `2^H` of the support distribution, `H` its entropy in bits.
    ///
    /// 1 when a single topology has all the support, `k` when `k`
    /// topologies share it evenly.
    pub fn perplexity(&self) -> f64 {
        let entropy: f64 = self
            .entries
            .iter()
            .map(|&(_, p)| p)
            .filter(|&p| p > 0.0)
            .map(|p| -p * p.log2())
            .sum();
        entropy.exp2()
    }

    /// Entries with support of at least `threshold`, and the total support
    /// of the others.
    pub fn split_at(&self, threshold: f64) -> (&[(String, f64)], f64) {
        let kept = self.entries.partition_point(|&(_, ratio)| ratio >= threshold);
        let suppressed = self.entries[kept..].iter().map(|&(_, ratio)| ratio).sum();
        (&self.entries[..kept], suppressed)
    }
}

/// Parse `newicks` and run GSTAR with a fresh random seed.
///
/// `trials == 0` selects the exhaustive sweep, which writes nothing to `log`.
pub fn gstar<S, W>(newicks: &[S], outgroup: Option<&str>, trials: usize, log: &mut W) -> Result<Support>
where
    S: AsRef<str>,
    W: Write + ?Sized,
{
    Gstar::from_newick(newicks, outgroup)?.run(trials, log)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGRESSION: [&str; 2] = ["((a,((b,c),k)),e);", "((b,((a,c),k)),e);"];

    fn assert_regression(support: &Support) {
        let expected = [
            ("((((a,e),k),c),b);", 0.3 + 1.0 / 6.0),
            ("(((a,(e,k)),c),b);", 0.1 + 1.0 / 6.0),
            ("(((a,e),(c,k)),b);", 0.1 + 1.0 / 6.0),
        ];
        assert_eq!(support.len(), expected.len(), "{support:?}");
        for ((topology, ratio), (want_topology, want_ratio)) in support.entries().iter().zip(expected) {
            assert_eq!(topology, want_topology);
            assert!((ratio - want_ratio).abs() < 1e-9, "{topology}: {ratio}");
        }
        assert_eq!(support.trials(), 15);
    }

    #[test]
    fn test_regression_sweep_default_outgroup() {
        let run = Gstar::from_newick(&REGRESSION, None).unwrap();
        assert_eq!(run.outgroup(), "b");
        assert_eq!(run.levels(), 4);
        assert_regression(&run.sweep().unwrap());
    }

    #[test]
    fn test_regression_sweep_explicit_outgroup() {
        let mut log = Vec::new();
        let support = gstar(&REGRESSION, Some("b"), 0, &mut log).unwrap();
        assert_regression(&support);
        assert!(log.is_empty());
    }

    #[test]
    fn test_single_tree_full_support() {
        let support = gstar(&["((a,b),(c,(d,e)));"], Some("a"), 0, &mut std::io::sink()).unwrap();
        assert_eq!(support.entries(), &[("(a,(b,(c,(d,e))));".to_string(), 1.0)]);
        assert_eq!(support.perplexity(), 1.0);
    }

    #[test]
    fn test_sampling_is_reproducible() {
        let run = Gstar::from_newick(&REGRESSION, Some("b")).unwrap().with_seed(42);
        let mut first_log = Vec::new();
        let first = run.sample(20, &mut first_log).unwrap();
        let mut second_log = Vec::new();
        let second = run.sample(20, &mut second_log).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_log, second_log);
        assert_eq!(first.trials(), 20);
        assert!((first.entries().iter().map(|(_, r)| r).sum::<f64>() - 1.0).abs() < 1e-9);

        let text = String::from_utf8(first_log).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 20);
        for line in lines {
            let (topology, weights) = line.split_once('\t').unwrap();
            assert!(first.ratio_of(topology).is_some());
            let weights: Vec<f64> = weights.split(',').map(|w| w.parse().unwrap()).collect();
            assert_eq!(weights.len(), 4);
            assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_outgroup_errors() {
        assert!(matches!(
            Gstar::from_newick(&["(a,b,(c,d));", "((a,b),(c,d));"], None),
            Err(GstarError::MissingOutgroup { tree: 0 })
        ));
        assert!(matches!(
            Gstar::from_newick(&["((a,b),(c,d));", "(a,b,(c,d));"], None),
            Err(GstarError::MissingOutgroup { tree: 1 })
        ));
        assert!(Gstar::from_newick(&["(a,b,(c,d));"], Some("c")).is_ok());
        assert!(matches!(
            Gstar::from_newick(&["((a,b),(c,d));"], Some("z")),
            Err(GstarError::LabelNotFound(l)) if l == "z"
        ));
        let no_trees: [&str; 0] = [];
        assert!(matches!(
            Gstar::from_newick(&no_trees, None),
            Err(GstarError::NoTrees)
        ));
    }

    #[test]
    fn test_support_ordering_and_split() {
        let support = Support::tally(
            ["x", "y", "x", "z", "x", "y"]
                .into_iter()
                .map(String::from),
        );
        assert_eq!(support.trials(), 6);
        let order: Vec<&str> = support.entries().iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
        assert_eq!(support.ratio_of("y"), Some(2.0 / 6.0));
        assert_eq!(support.ratio_of("w"), None);

        let (kept, suppressed) = support.split_at(0.3);
        assert_eq!(kept.len(), 2);
        assert!((suppressed - 1.0 / 6.0).abs() < 1e-12);
        let (kept, suppressed) = support.split_at(0.0);
        assert_eq!(kept.len(), 3);
        assert_eq!(suppressed, 0.0);
    }

    #[test]
    fn test_perplexity() {
        let even = Support::tally(["a", "b", "c", "d"].into_iter().map(String::from));
        assert!((even.perplexity() - 4.0).abs() < 1e-12);

        let skewed = Support::from_counts(
            HashMap::from([("a".to_string(), 7), ("b".to_string(), 4), ("c".to_string(), 4)]),
            15,
        );
        let expected = [7.0 / 15.0, 4.0 / 15.0, 4.0 / 15.0]
            .iter()
            .map(|p: &f64| -p * p.log2())
            .sum::<f64>()
            .exp2();
        assert!((skewed.perplexity() - expected).abs() < 1e-12);
        assert!(skewed.perplexity() > 1.0 && skewed.perplexity() < 3.0);

        assert_eq!(Support::tally(Vec::new()).perplexity(), 1.0);
    }
}
