//! Variable-length integer vector genome and its operators.
//!
//! Serves as the demo representation for the CLI and as the concrete genome
//! used throughout the engine tests.

use serde::{Deserialize, Serialize};

use crate::schema::VectorGenomeConfig;

use super::candidate::Genome;
use super::factory::{CandidateFactory, FactoryError};
use super::objective::{Direction, FitnessFunction};
use super::operators::{Crossover, CrossoverError, Mutation};
use super::rng::SearchRng;

/// A variable-length vector of integer genes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntVector {
    pub genes: Vec<i64>,
}

impl IntVector {
    pub fn new(genes: Vec<i64>) -> Self {
        Self { genes }
    }

    pub fn sum(&self) -> i64 {
        self.genes.iter().sum()
    }

    /// Render the genes as a DOT chain graph.
    pub fn to_dot(&self, name: &str) -> String {
        let mut dot = format!("digraph \"{name}\" {{\n");
        for (i, gene) in self.genes.iter().enumerate() {
            dot.push_str(&format!("  g{i} [label=\"{gene}\"];\n"));
            if i > 0 {
                dot.push_str(&format!("  g{} -> g{i};\n", i - 1));
            }
        }
        dot.push_str("}\n");
        dot
    }
}

impl Genome for IntVector {
    fn size(&self) -> usize {
        self.genes.len()
    }
}

/// Uniform random vectors within the configured length and value bounds.
#[derive(Debug, Clone)]
pub struct IntVectorFactory {
    length_bounds: (usize, usize),
    value_bounds: (i64, i64),
}

impl IntVectorFactory {
    pub fn new(config: &VectorGenomeConfig) -> Self {
        Self {
            length_bounds: config.length_bounds,
            value_bounds: config.value_bounds,
        }
    }
}

impl CandidateFactory<IntVector> for IntVectorFactory {
    fn create(&self, rng: &mut SearchRng) -> Result<IntVector, FactoryError> {
        let (min_len, max_len) = self.length_bounds;
        if min_len > max_len || self.value_bounds.0 > self.value_bounds.1 {
            return Err(FactoryError::ConstructionFailed(format!(
                "empty bounds: length {:?}, value {:?}",
                self.length_bounds, self.value_bounds
            )));
        }

        let len = rng.range_usize(self.length_bounds);
        let genes = (0..len).map(|_| rng.range_i64(self.value_bounds)).collect();
        Ok(IntVector::new(genes))
    }
}

/// Gaussian gene perturbation plus occasional insertion and deletion.
#[derive(Debug, Clone)]
pub struct IntVectorMutation {
    rate: f64,
    strength: f64,
    insert_probability: f64,
    delete_probability: f64,
    value_bounds: (i64, i64),
}

impl IntVectorMutation {
    pub fn new(config: &VectorGenomeConfig) -> Self {
        Self {
            rate: config.mutation_rate,
            strength: config.mutation_strength,
            insert_probability: config.insert_probability,
            delete_probability: config.delete_probability,
            value_bounds: config.value_bounds,
        }
    }

    fn perturb(&self, value: i64, rng: &mut SearchRng) -> i64 {
        let (lo, hi) = self.value_bounds;
        let range = (hi - lo).max(1) as f64;
        let mut delta = (rng.gaussian() * self.strength * range).round() as i64;
        if delta == 0 {
            delta = rng.choose(-1, 1);
        }
        value.saturating_add(delta).clamp(lo, hi.max(lo))
    }
}

impl Mutation<IntVector> for IntVectorMutation {
    fn mutate(&self, genome: &mut IntVector, rng: &mut SearchRng) -> bool {
        let mut changed = false;

        if !genome.genes.is_empty() {
            let per_gene = self.rate / genome.genes.len() as f64;
            for i in 0..genome.genes.len() {
                if rng.chance(per_gene) {
                    let old = genome.genes[i];
                    genome.genes[i] = self.perturb(old, rng);
                    changed |= genome.genes[i] != old;
                }
            }
        }

        if rng.chance(self.insert_probability) {
            let at = rng.index(genome.genes.len() + 1);
            genome.genes.insert(at, rng.range_i64(self.value_bounds));
            changed = true;
        }

        if !genome.genes.is_empty() && rng.chance(self.delete_probability) {
            let at = rng.index(genome.genes.len());
            genome.genes.remove(at);
            changed = true;
        }

        changed
    }
}

/// Exchanges the tails of two vectors at independent cut points.
///
/// Fails without touching either parent if one is empty or if a child would
/// exceed `max_len`.
#[derive(Debug, Clone, Default)]
pub struct SinglePointCrossover {
    pub max_len: Option<usize>,
}

impl SinglePointCrossover {
    pub fn new(max_len: Option<usize>) -> Self {
        Self { max_len }
    }
}

impl Crossover<IntVector> for SinglePointCrossover {
    fn crossover(
        &self,
        first: &mut IntVector,
        second: &mut IntVector,
        rng: &mut SearchRng,
    ) -> Result<(), CrossoverError> {
        if first.genes.is_empty() || second.genes.is_empty() {
            return Err(CrossoverError::ConstructionFailed(
                "cannot cut an empty vector".to_string(),
            ));
        }

        let cut1 = rng.index(first.genes.len() + 1);
        let cut2 = rng.index(second.genes.len() + 1);

        let len1 = cut1 + (second.genes.len() - cut2);
        let len2 = cut2 + (first.genes.len() - cut1);
        if let Some(max) = self.max_len
            && (len1 > max || len2 > max)
        {
            return Err(CrossoverError::ConstructionFailed(format!(
                "children of length {len1} and {len2} exceed {max}"
            )));
        }

        let tail1 = first.genes.split_off(cut1);
        let tail2 = second.genes.split_off(cut2);
        first.genes.extend(tail2);
        second.genes.extend(tail1);
        Ok(())
    }
}

/// Sum of the genes.
#[derive(Debug, Clone, Copy)]
pub struct GeneSum {
    direction: Direction,
}

impl GeneSum {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl FitnessFunction<IntVector> for GeneSum {
    fn name(&self) -> &str {
        "gene_sum"
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn score(&self, genome: &IntVector) -> f64 {
        genome.sum() as f64
    }
}

/// Number of genes.
#[derive(Debug, Clone, Copy)]
pub struct VectorLength {
    direction: Direction,
}

impl VectorLength {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl FitnessFunction<IntVector> for VectorLength {
    fn name(&self) -> &str {
        "length"
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn score(&self, genome: &IntVector) -> f64 {
        genome.genes.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_dot_chains_genes() {
        let dot = IntVector::new(vec![4, -1, 7]).to_dot("best");
        assert_eq!(
            dot,
            "digraph \"best\" {\n  g0 [label=\"4\"];\n  g1 [label=\"-1\"];\n  g0 -> g1;\n  g2 [label=\"7\"];\n  g1 -> g2;\n}\n"
        );
        assert_eq!(IntVector::default().to_dot("empty"), "digraph \"empty\" {\n}\n");
    }

    #[test]
    fn test_factory_respects_bounds() {
        let config = VectorGenomeConfig {
            length_bounds: (2, 5),
            value_bounds: (-3, 3),
            ..Default::default()
        };
        let factory = IntVectorFactory::new(&config);
        let mut rng = SearchRng::new(42);

        for _ in 0..50 {
            let v = factory.create(&mut rng).unwrap();
            assert!((2..=5).contains(&v.size()));
            assert!(v.genes.iter().all(|g| (-3..=3).contains(g)));
        }
    }

    #[test]
    fn test_factory_rejects_empty_bounds() {
        let config = VectorGenomeConfig {
            length_bounds: (5, 2),
            ..Default::default()
        };
        let factory = IntVectorFactory::new(&config);
        assert!(factory.create(&mut SearchRng::new(0)).is_err());
    }

    #[test]
    fn test_mutation_stays_in_value_bounds() {
        let config = VectorGenomeConfig {
            value_bounds: (0, 10),
            mutation_rate: 1.0,
            mutation_strength: 2.0,
            insert_probability: 0.0,
            delete_probability: 0.0,
            ..Default::default()
        };
        let mutation = IntVectorMutation::new(&config);
        let mut rng = SearchRng::new(3);
        let mut v = IntVector::new(vec![5; 8]);

        let mut any_changed = false;
        for _ in 0..100 {
            any_changed |= mutation.mutate(&mut v, &mut rng);
            assert_eq!(v.size(), 8);
            assert!(v.genes.iter().all(|g| (0..=10).contains(g)));
        }
        assert!(any_changed);
    }

    #[test]
    fn test_mutation_zero_rates_is_noop() {
        let config = VectorGenomeConfig {
            mutation_rate: 0.0,
            insert_probability: 0.0,
            delete_probability: 0.0,
            ..Default::default()
        };
        let mutation = IntVectorMutation::new(&config);
        let mut v = IntVector::new(vec![1, 2, 3]);
        assert!(!mutation.mutate(&mut v, &mut SearchRng::new(9)));
        assert_eq!(v, IntVector::new(vec![1, 2, 3]));
    }

    #[test]
    fn test_crossover_preserves_genes() {
        let crossover = SinglePointCrossover::default();
        let mut rng = SearchRng::new(17);

        for _ in 0..20 {
            let mut a = IntVector::new(vec![1, 1, 1, 1]);
            let mut b = IntVector::new(vec![2, 2, 2]);
            crossover.crossover(&mut a, &mut b, &mut rng).unwrap();
            assert_eq!(a.size() + b.size(), 7);
            assert_eq!(a.sum() + b.sum(), 10);
        }
    }

    #[test]
    fn test_crossover_failure_leaves_parents_untouched() {
        let crossover = SinglePointCrossover::new(Some(1));
        let mut rng = SearchRng::new(1);
        let mut a = IntVector::new(vec![1, 2, 3]);
        let mut b = IntVector::new(vec![4, 5, 6]);

        // Any cut of two length-3 parents yields total length 6, so one
        // child is always longer than 1.
        assert!(crossover.crossover(&mut a, &mut b, &mut rng).is_err());
        assert_eq!(a.genes, vec![1, 2, 3]);
        assert_eq!(b.genes, vec![4, 5, 6]);

        let mut empty = IntVector::default();
        assert!(
            SinglePointCrossover::default()
                .crossover(&mut empty, &mut b, &mut rng)
                .is_err()
        );
        assert_eq!(b.genes, vec![4, 5, 6]);
    }

    #[test]
    fn test_objectives() {
        let v = IntVector::new(vec![3, -1, 4]);
        assert_eq!(GeneSum::new(Direction::Maximize).score(&v), 6.0);
        assert_eq!(VectorLength::new(Direction::Minimize).score(&v), 3.0);
    }
}
