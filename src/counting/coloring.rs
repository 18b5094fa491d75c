//! Random vertex colorings for the color-coding passes

use crate::error::{Result, SubgraphError};
use crate::graph::Graph;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of one uniform coloring per iteration
pub enum ColorSampler {
    /// Colors derive from `(seed, iteration, global id)` only, so every worker agrees on the
    /// color of every vertex whatever the partitioning
    Seeded(u64),
    /// Independent draws from an OS-seeded generator
    Entropy(StdRng),
}

impl ColorSampler {
    pub fn new(seed: Option<u64>) -> Result<Self> {
        match seed {
            Some(seed) => Ok(ColorSampler::Seeded(seed)),
            None => StdRng::try_from_os_rng()
                .map(ColorSampler::Entropy)
                .map_err(|e| SubgraphError::Sampling(format!("no entropy source: {}", e))),
        }
    }

    /// One color in `0..num_colors` per local vertex of `graph`
    pub fn sample(&mut self, graph: &Graph, num_colors: usize, iteration: usize) -> Result<Vec<u8>> {
        if num_colors == 0 || num_colors > u8::MAX as usize + 1 {
            return Err(SubgraphError::Sampling(format!(
                "cannot draw from a {}-color palette",
                num_colors
            )));
        }

        match self {
            ColorSampler::Seeded(seed) => {
                let mut rng = StdRng::seed_from_u64(iteration_seed(*seed, iteration));
                // draw for every global id in order, then keep the local ones
                let all: Vec<u8> = (0..=graph.max_vertex_id())
                    .map(|_| rng.random_range(0..num_colors) as u8)
                    .collect();
                Ok(graph
                    .vertex_ids()
                    .iter()
                    .map(|&global| all[global as usize])
                    .collect())
            }
            ColorSampler::Entropy(rng) => Ok((0..graph.num_vertices())
                .map(|_| rng.random_range(0..num_colors) as u8)
                .collect()),
        }
    }
}

fn iteration_seed(seed: u64, iteration: usize) -> u64 {
    seed ^ (iteration as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_colors_ignore_partitioning() {
        let whole = Graph::from_edges(6, 5, &[0, 1, 2, 3, 4], &[1, 2, 3, 4, 5]).unwrap();
        let mut sampler = ColorSampler::new(Some(7)).unwrap();
        let all = sampler.sample(&whole, 4, 3).unwrap();
        assert!(all.iter().all(|&c| c < 4));

        let odd = Graph::assemble(vec![1, 3, 5], vec![vec![0, 2], vec![2, 4], vec![4]], 5);
        let part = sampler.sample(&odd, 4, 3).unwrap();
        assert_eq!(part, vec![all[1], all[3], all[5]]);
    }

    #[test]
    fn test_iterations_differ() {
        let graph = Graph::from_edges(64, 0, &[], &[]).unwrap();
        let mut sampler = ColorSampler::new(Some(1)).unwrap();
        let first = sampler.sample(&graph, 8, 0).unwrap();
        let second = sampler.sample(&graph, 8, 1).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_entropy_sampler_in_range() {
        let graph = Graph::from_edges(32, 0, &[], &[]).unwrap();
        let mut sampler = ColorSampler::new(None).unwrap();
        assert!(sampler.sample(&graph, 3, 0).unwrap().iter().all(|&c| c < 3));
        assert!(sampler.sample(&graph, 0, 0).is_err());
    }
}
