//! Color-set index tables for the dynamic-programming recursion
//!
//! For every sub-template `s` and every color set `n` of size `verts(s)` these tables hold,
//! precomputed, the row offsets at which the DP reads the active and passive children. The
//! tables depend only on the template shape and `num_colors`, never on a sampled coloring,
//! so one build serves every iteration of a run.

use crate::combinatorics::{choose, color_index, ChooseTable, Combinations};
use crate::error::{Result, SubgraphError};
use crate::template::Partitioner;
use rayon::prelude::*;

/// Local position sets: `sets[v - 2][k - 1]` lists every `k`-subset of `0..v` in odometer
/// order, for every `2 <= v <= num_colors` and `1 <= k < v`
struct IndexSets {
    sets: Vec<Vec<Vec<Vec<u32>>>>,
}

impl IndexSets {
    fn new(num_colors: usize) -> Self {
        let sets = (2..=num_colors)
            .map(|num_vals| {
                (1..num_vals)
                    .map(|set_size| {
                        Combinations::new(num_vals, set_size)
                            .map(|set| set.into_iter().map(|x| x - 1).collect())
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Self { sets }
    }

    fn get(&self, num_vals: usize, set_size: usize) -> &[Vec<u32>] {
        &self.sets[num_vals - 2][set_size - 1]
    }
}

/// Every way to cut `colorset` into an `na`-subset followed by the remaining colors
///
/// Row `i` holds the colors at positions `first[i]`, then those at positions `second[i]`.
/// Since the `i`-th `na`-subset and the `(C - 1 - i)`-th complementary subset are
/// complements, row `i`'s head pairs with row `C - 1 - i`'s tail.
fn child_color_sets(colorset: &[u32], first: &[Vec<u32>], second: &[Vec<u32>]) -> Vec<Vec<u32>> {
    first
        .iter()
        .zip(second)
        .map(|(head, tail)| {
            head.iter()
                .chain(tail.iter())
                .map(|&pos| colorset[pos as usize])
                .collect()
        })
        .collect()
}

/// Index tables for one sub-template
#[derive(Debug, Clone, Default)]
struct SubIndexes {
    /// `set_indexes[n]`: dense index of the `n`-th color set in odometer order
    set_indexes: Vec<u32>,

    /// Number of active/passive splits per color set, `0` for leaves
    num_splits: usize,

    /// Active-child color index of split `a` of set `n` at `n * num_splits + a`
    active: Vec<u32>,

    /// Passive-child color index pairing with the same active entry
    passive: Vec<u32>,
}

/// Combination-number lookup tables for all sub-templates
#[derive(Debug, Clone)]
pub struct ColorSetIndex {
    num_colors: usize,
    choose_table: ChooseTable,
    num_verts: Vec<usize>,
    subs: Vec<SubIndexes>,
}

impl ColorSetIndex {
    pub fn build(partitioner: &Partitioner, num_colors: usize) -> Result<Self> {
        let num_verts: Vec<usize> = (0..partitioner.subtemplate_count())
            .map(|s| partitioner.num_verts_sub(s))
            .collect();

        if let Some(&largest) = num_verts.iter().max() {
            if largest > num_colors {
                return Err(SubgraphError::config(format!(
                    "{} colors cannot color a {}-vertex template",
                    num_colors, largest
                )));
            }
        }

        let choose_table = ChooseTable::new(num_colors);
        let index_sets = IndexSets::new(num_colors);

        let subs = (0..num_verts.len())
            .into_par_iter()
            .map(|s| Self::build_sub(partitioner, &index_sets, s, num_colors))
            .collect();
        // index_sets is scratch and dropped here

        log::info!(
            "Built color-set index tables for {} sub-templates with {} colors",
            num_verts.len(),
            num_colors
        );

        Ok(Self {
            num_colors,
            choose_table,
            num_verts,
            subs,
        })
    }

    fn build_sub(
        partitioner: &Partitioner,
        index_sets: &IndexSets,
        s: usize,
        num_colors: usize,
    ) -> SubIndexes {
        let v = partitioner.num_verts_sub(s);
        let num_sets = choose(num_colors, v) as usize;

        let mut sub = SubIndexes {
            set_indexes: Vec::with_capacity(num_sets),
            ..Default::default()
        };

        let split_sets = if v > 1 {
            let na = partitioner.num_verts_active(s);
            let np = partitioner.num_verts_passive(s);
            sub.num_splits = choose(v, na) as usize;
            sub.active.reserve(num_sets * sub.num_splits);
            sub.passive.reserve(num_sets * sub.num_splits);
            Some((na, index_sets.get(v, na), index_sets.get(v, np)))
        } else {
            None
        };

        for colorset in Combinations::new(num_colors, v) {
            sub.set_indexes.push(color_index(&colorset) as u32);

            if let Some((na, first, second)) = split_sets {
                let rows = child_color_sets(&colorset, first, second);
                let last = rows.len() - 1;
                for (a, row) in rows.iter().enumerate() {
                    sub.active.push(color_index(&row[..na]) as u32);
                    sub.passive.push(color_index(&rows[last - a][na..]) as u32);
                }
            }
        }

        sub
    }

    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    pub fn choose_table(&self) -> &ChooseTable {
        &self.choose_table
    }

    /// Number of color sets of sub-template `s`: `choose(num_colors, verts(s))`
    pub fn num_colorsets(&self, s: usize) -> usize {
        self.choose_table.get(self.num_colors, self.num_verts[s]) as usize
    }

    /// Dense index of the `n`-th color set of sub-template `s`
    pub fn set_index(&self, s: usize, n: usize) -> usize {
        self.subs[s].set_indexes[n] as usize
    }

    /// Aligned `(active, passive)` child indexes for every split of set `n` of `s`
    pub fn splits(&self, s: usize, n: usize) -> (&[u32], &[u32]) {
        let sub = &self.subs[s];
        let range = n * sub.num_splits..(n + 1) * sub.num_splits;
        (&sub.active[range.clone()], &sub.passive[range])
    }

    pub fn num_splits(&self, s: usize) -> usize {
        self.subs[s].num_splits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use std::collections::{HashMap, HashSet};

    /// dense index -> color set, for checking pairings
    fn decode_table(num_colors: usize, k: usize) -> HashMap<usize, HashSet<u32>> {
        Combinations::new(num_colors, k)
            .map(|set| (color_index(&set), set.into_iter().collect()))
            .collect()
    }

    fn check_pairings(template: &Graph, num_colors: usize) {
        let part = Partitioner::new(template).unwrap();
        let index = ColorSetIndex::build(&part, num_colors).unwrap();

        for s in 0..part.subtemplate_count() {
            let v = part.num_verts_sub(s);
            assert_eq!(index.num_colorsets(s), choose(num_colors, v) as usize);
            if v == 1 {
                assert_eq!(index.num_splits(s), 0);
                continue;
            }
            let na = part.num_verts_active(s);
            let np = part.num_verts_passive(s);
            let parents = decode_table(num_colors, v);
            let actives = decode_table(num_colors, na);
            let passives = decode_table(num_colors, np);

            let mut seen = HashSet::new();
            for (n, colorset) in Combinations::new(num_colors, v).enumerate() {
                let full = &parents[&index.set_index(s, n)];
                assert_eq!(full, &colorset.iter().copied().collect::<HashSet<_>>());
                assert!(seen.insert(index.set_index(s, n)));

                let (active, passive) = index.splits(s, n);
                assert_eq!(active.len(), choose(v, na) as usize);
                let mut distinct = HashSet::new();
                for (&ca, &cp) in active.iter().zip(passive) {
                    let a = &actives[&(ca as usize)];
                    let p = &passives[&(cp as usize)];
                    assert!(a.is_disjoint(p));
                    let union: HashSet<u32> = a.union(p).copied().collect();
                    assert_eq!(&union, full);
                    assert!(distinct.insert(ca));
                }
            }
        }
    }

    #[test]
    fn test_pairings_cover_every_split_path() {
        let path = Graph::from_edges(4, 3, &[0, 1, 2], &[1, 2, 3]).unwrap();
        check_pairings(&path, 4);
        check_pairings(&path, 6);
    }

    #[test]
    fn test_pairings_star() {
        let star = Graph::from_edges(5, 4, &[0, 0, 0, 0], &[1, 2, 3, 4]).unwrap();
        check_pairings(&star, 5);
    }

    #[test]
    fn test_too_few_colors() {
        let path = Graph::from_edges(4, 3, &[0, 1, 2], &[1, 2, 3]).unwrap();
        let part = Partitioner::new(&path).unwrap();
        assert!(ColorSetIndex::build(&part, 3).is_err());
    }

    #[test]
    fn test_index_sets_are_zero_based() {
        let sets = IndexSets::new(4);
        assert_eq!(sets.get(3, 2), &[vec![0, 1], vec![0, 2], vec![1, 2]]);
        assert_eq!(sets.get(4, 1).len(), 4);
    }
}
