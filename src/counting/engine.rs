//! One color-coding pass: leaf initialisation and the bottom-up combine

use crate::counting::plan::TemplatePlan;
use crate::counting::table::{alloc_row, Count, DynamicTable};
use crate::error::{Result, SubgraphError};
use crate::graph::Graph;
use rayon::prelude::*;

/// Supplies the rows of neighbours this worker does not own
///
/// Called once per non-leaf sub-template with the table of its passive child, before the
/// combine reads it. `step` numbers the calls of one pass from zero.
pub trait RowExchange {
    fn exchange(
        &mut self,
        step: u32,
        passive: usize,
        table: &DynamicTable,
        remote: &mut DynamicTable,
    ) -> Result<()>;
}

/// Exchange for a graph whose neighbours are all local
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExchange;

impl RowExchange for LocalExchange {
    fn exchange(&mut self, _: u32, _: usize, _: &DynamicTable, _: &mut DynamicTable) -> Result<()> {
        Ok(())
    }
}

/// Where a neighbour's row lives
#[derive(Debug, Clone, Copy, PartialEq)]
enum Neighbor {
    Local(u32),
    Remote(u32),
}

/// Totals of one pass, before normalisation
#[derive(Debug, Clone, Default)]
pub struct PassResult {
    /// Sum over all vertices and color sets of the root table
    pub raw_total: Count,

    /// Same sum for every sub-template, indexed like the partitioner
    pub sub_totals: Vec<Count>,

    /// Root-table sum per local vertex, when requested
    pub vertex_counts: Option<Vec<Count>>,
}

/// Dynamic-programming state of one worker
pub struct CountingEngine<'a> {
    plan: &'a TemplatePlan,
    graph: &'a Graph,
    neighbors: Vec<Vec<Neighbor>>,
    table: DynamicTable,
    remote: DynamicTable,
    keep_vertex_counts: bool,
}

impl<'a> CountingEngine<'a> {
    /// `remote_slot` maps a neighbour id owned elsewhere to its row in the remote table,
    /// which holds `remote_len` rows
    pub fn new<F>(
        plan: &'a TemplatePlan,
        graph: &'a Graph,
        remote_len: usize,
        remote_slot: F,
        keep_vertex_counts: bool,
    ) -> Result<Self>
    where
        F: Fn(u32) -> Option<usize>,
    {
        if graph.is_empty() {
            return Err(SubgraphError::config("cannot count in an empty graph"));
        }

        let mut dangling = 0usize;
        let neighbors = (0..graph.num_vertices())
            .map(|v| {
                graph
                    .adjacent_vertices(v)
                    .iter()
                    .filter_map(|&u| {
                        let resolved = match graph.local_id(u) {
                            Some(local) => Some(Neighbor::Local(local as u32)),
                            None => remote_slot(u).map(|q| Neighbor::Remote(q as u32)),
                        };
                        if resolved.is_none() {
                            dangling += 1;
                        }
                        resolved
                    })
                    .collect()
            })
            .collect();

        if dangling > 0 {
            log::debug!("{} adjacency entries point at vertices no worker owns", dangling);
        }

        Ok(Self {
            plan,
            graph,
            neighbors,
            table: plan.new_table(graph.num_vertices()),
            remote: plan.new_table(remote_len),
            keep_vertex_counts,
        })
    }

    /// Engine over a graph that owns every vertex it references
    pub fn local(plan: &'a TemplatePlan, graph: &'a Graph, keep_vertex_counts: bool) -> Result<Self> {
        Self::new(plan, graph, 0, |_| None, keep_vertex_counts)
    }

    pub fn table(&self) -> &DynamicTable {
        &self.table
    }

    /// Run the full bottom-up recursion for one coloring of the local vertices
    pub fn run_pass(&mut self, colors: &[u8], exchange: &mut dyn RowExchange) -> Result<PassResult> {
        self.check_colors(colors)?;

        let part = self.plan.partitioner();
        let count = part.subtemplate_count();
        let mut sub_totals = vec![0.0; count];
        let mut first_leaf = None;
        let mut step = 0u32;

        // children always follow their parent, so a reverse scan is bottom-up
        for s in (0..count).rev() {
            match (part.active_index(s), part.passive_index(s)) {
                (Some(a), Some(p)) => {
                    log::debug!("Combining sub-template {} (active {}, passive {})", s, a, p);

                    self.remote.init_sub(p)?;
                    exchange.exchange(step, p, &self.table, &mut self.remote)?;
                    step += 1;

                    self.combine(s, a, p)?;
                    self.remote.clear_sub(p);

                    // single-vertex children share the first leaf and live for the whole pass
                    for child in [a, p] {
                        if !part.subtemplate(child).is_leaf() {
                            self.table.clear_sub(child);
                        }
                    }
                }
                _ => match first_leaf {
                    Some(leaf) => self.table.set_to_table(s, leaf),
                    None => {
                        self.init_leaf(s, colors)?;
                        first_leaf = Some(s);
                    }
                },
            }
            sub_totals[s] = self.table.sub_total(s);
        }

        let vertex_counts = self.keep_vertex_counts.then(|| self.table.vertex_totals(0));
        self.table.clear_table();

        Ok(PassResult {
            raw_total: sub_totals[0],
            sub_totals,
            vertex_counts,
        })
    }

    fn check_colors(&self, colors: &[u8]) -> Result<()> {
        if colors.len() != self.graph.num_vertices() {
            return Err(SubgraphError::config(format!(
                "{} colors supplied for {} vertices",
                colors.len(),
                self.graph.num_vertices()
            )));
        }
        let num_colors = self.plan.num_colors();
        if let Some(&bad) = colors.iter().find(|&&c| c as usize >= num_colors) {
            return Err(SubgraphError::config(format!(
                "color {} outside a {}-color palette",
                bad, num_colors
            )));
        }
        Ok(())
    }

    /// `table[s][v][color(v)] = 1` for every local vertex
    fn init_leaf(&mut self, s: usize, colors: &[u8]) -> Result<()> {
        self.table.init_sub(s)?;
        let width = self.table.num_colorsets(s);
        let rows = colors
            .par_iter()
            .map(|&c| -> Result<Option<Box<[Count]>>> {
                let mut row = alloc_row(width)?;
                // the rank of the singleton {c} is c
                row[c as usize] = 1.0;
                Ok(Some(row))
            })
            .collect::<Result<Vec<_>>>()?;
        self.table.fill_sub(s, rows)
    }

    fn combine(&mut self, s: usize, a: usize, p: usize) -> Result<()> {
        self.table.init_sub_with(s, a, p)?;

        let table = &self.table;
        let remote = &self.remote;
        let index = self.plan.colorsets();
        let num_sets = index.num_colorsets(s);
        let passive_width = table.num_colorsets(p);

        let rows = self
            .neighbors
            .par_iter()
            .enumerate()
            .map(|(v, neighbors)| -> Result<Option<Box<[Count]>>> {
                let active = match table.active_row(v) {
                    Some(row) => row,
                    None => return Ok(None),
                };

                // N_p(v, c): passive-child counts summed over the neighbours of v
                let mut sums = vec![0.0; passive_width];
                let mut reached = false;
                for &neighbor in neighbors {
                    let row = match neighbor {
                        Neighbor::Local(u) => table.row(p, u as usize),
                        Neighbor::Remote(q) => remote.row(p, q as usize),
                    };
                    if let Some(row) = row {
                        reached = true;
                        for (acc, x) in sums.iter_mut().zip(row) {
                            *acc += x;
                        }
                    }
                }
                if !reached {
                    return Ok(None);
                }

                let mut out = alloc_row(num_sets)?;
                let mut nonzero = false;
                for n in 0..num_sets {
                    let (ca, cp) = index.splits(s, n);
                    let total: Count = ca
                        .iter()
                        .zip(cp)
                        .map(|(&x, &y)| active[x as usize] * sums[y as usize])
                        .sum();
                    if total != 0.0 {
                        out[index.set_index(s, n)] = total;
                        nonzero = true;
                    }
                }
                Ok(nonzero.then_some(out))
            })
            .collect::<Result<Vec<_>>>()?;

        self.table.fill_sub(s, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::exact::colorful_matches;

    fn four_cycle_with_chord() -> Graph {
        Graph::from_edges(4, 5, &[0, 1, 2, 3, 0], &[1, 2, 3, 0, 2]).unwrap()
    }

    #[test]
    fn test_edge_template_counts_directed_colorful_edges() {
        let path = Graph::from_edges(3, 2, &[0, 1], &[1, 2]).unwrap();
        let edge = Graph::from_edges(2, 1, &[0], &[1]).unwrap();
        let plan = TemplatePlan::new(&edge, 2).unwrap();
        let mut engine = CountingEngine::local(&plan, &path, true).unwrap();

        let result = engine.run_pass(&[0, 1, 0], &mut LocalExchange).unwrap();
        assert_eq!(result.raw_total, 4.0);
        assert_eq!(result.vertex_counts.unwrap(), vec![1.0, 2.0, 1.0]);

        let none = engine.run_pass(&[1, 1, 1], &mut LocalExchange).unwrap();
        assert_eq!(none.raw_total, 0.0);
    }

    #[test]
    fn test_path_matches_brute_force() {
        let graph = four_cycle_with_chord();
        let path = Graph::from_edges(3, 2, &[0, 1], &[1, 2]).unwrap();
        let plan = TemplatePlan::new(&path, 3).unwrap();
        let mut engine = CountingEngine::local(&plan, &graph, true).unwrap();

        for colors in [[0u8, 1, 2, 0], [0, 1, 2, 2], [2, 2, 1, 0], [1, 1, 1, 1]] {
            let result = engine.run_pass(&colors, &mut LocalExchange).unwrap();
            let oracle = colorful_matches(&graph, &path, &colors).unwrap();
            assert_eq!(result.raw_total, oracle.total);
            assert_eq!(result.vertex_counts.unwrap(), oracle.per_root);
        }
    }

    #[test]
    fn test_single_vertex_template() {
        let graph = four_cycle_with_chord();
        let single = Graph::from_edges(1, 0, &[], &[]).unwrap();
        let plan = TemplatePlan::new(&single, 1).unwrap();
        let mut engine = CountingEngine::local(&plan, &graph, false).unwrap();
        let result = engine.run_pass(&[0, 0, 0, 0], &mut LocalExchange).unwrap();
        assert_eq!(result.raw_total, 4.0);
        assert!(result.vertex_counts.is_none());
    }

    #[test]
    fn test_sub_totals_and_cleanup() {
        let graph = four_cycle_with_chord();
        let star = Graph::from_edges(3, 2, &[0, 0], &[1, 2]).unwrap();
        let plan = TemplatePlan::new(&star, 3).unwrap();
        let mut engine = CountingEngine::local(&plan, &graph, false).unwrap();
        let result = engine.run_pass(&[0, 1, 2, 1], &mut LocalExchange).unwrap();

        assert_eq!(result.sub_totals.len(), plan.subtemplate_count());
        assert_eq!(result.sub_totals[0], result.raw_total);
        for s in 0..plan.subtemplate_count() {
            if plan.partitioner().subtemplate(s).is_leaf() {
                assert_eq!(result.sub_totals[s], 4.0);
            }
            assert!(!engine.table().is_sub_init(s));
        }
    }

    #[test]
    fn test_rejects_bad_colorings() {
        let graph = four_cycle_with_chord();
        let edge = Graph::from_edges(2, 1, &[0], &[1]).unwrap();
        let plan = TemplatePlan::new(&edge, 2).unwrap();
        let mut engine = CountingEngine::local(&plan, &graph, false).unwrap();
        assert!(engine.run_pass(&[0, 1], &mut LocalExchange).is_err());
        assert!(engine.run_pass(&[0, 1, 2, 0], &mut LocalExchange).is_err());
    }
}
