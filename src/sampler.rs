//! Sampler
//!
//! Strategies for splitting a set of row indices, used by the permutation test
//! and by the bandwidth heuristic on large references.
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

// A sampler splits an index into two disjoint parts.
pub trait Sampler {
    /// Sample the data, returning a tuple, where the first item is the samples
    /// chosen, and the second are the samples excluded.
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>);
}

/// Shuffle the pooled index and split it into two disjoint groups,
/// the first of size `n_first`.
pub struct PermutationSampler {
    n_first: usize,
}

impl PermutationSampler {
    pub fn new(n_first: usize) -> Self {
        PermutationSampler { n_first }
    }
}

impl Sampler for PermutationSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut shuffled = index.to_vec();
        shuffled.shuffle(rng);
        let second = shuffled.split_off(self.n_first.min(shuffled.len()));
        (shuffled, second)
    }
}

/// Choose at most `max_samples` indices uniformly without replacement.
/// Chosen indices keep their original order.
pub struct SubsetSampler {
    max_samples: usize,
}

impl SubsetSampler {
    pub fn new(max_samples: usize) -> Self {
        SubsetSampler { max_samples }
    }
}

impl Sampler for SubsetSampler {
    fn sample(&mut self, rng: &mut StdRng, index: &[usize]) -> (Vec<usize>, Vec<usize>) {
        if index.len() <= self.max_samples {
            return (index.to_vec(), Vec::new());
        }
        let mut positions: Vec<usize> = (0..index.len()).collect();
        positions.shuffle(rng);
        let mut keep = positions[..self.max_samples].to_vec();
        let mut drop = positions[self.max_samples..].to_vec();
        keep.sort_unstable();
        drop.sort_unstable();
        (
            keep.into_iter().map(|p| index[p]).collect(),
            drop.into_iter().map(|p| index[p]).collect(),
        )
    }
}
