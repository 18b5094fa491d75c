//! Adjacency-list graph with global to local vertex mapping

use crate::error::{Result, SubgraphError};
use rayon::prelude::*;
use std::collections::HashSet;
use std::mem;

/// Marks a global id with no local vertex
pub const NO_LOCAL_ID: u32 = u32::MAX;

/// Undirected graph stored as per-vertex neighbour lists
///
/// Vertices carry a global id (as found in input files, possibly sparse) and a dense local
/// index in `[0, num_vertices)`. Neighbour lists hold global ids, so a worker's partition of
/// a larger graph can reference vertices it does not own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    /// Global id of each local vertex
    vertex_ids: Vec<u32>,

    /// Local index of each global id in `[0, max_vertex_id]`, `NO_LOCAL_ID` when absent
    local_ids: Vec<u32>,

    /// Neighbour global ids of each local vertex
    adjacency: Vec<Vec<u32>>,

    /// Number of directed adjacency entries (twice the undirected edge count for a
    /// complete graph, the sum of local degrees for a partition)
    num_edges: usize,

    max_degree: usize,

    max_vertex_id: u32,
}

impl Graph {
    /// Build an undirected graph on vertices `0..vertex_count` from parallel edge arrays
    ///
    /// Each edge contributes an adjacency entry at both endpoints. This is how templates and
    /// sub-templates are created, and how a whole edge-list graph is loaded. An edge listed
    /// again, in either direction, is kept once.
    pub fn from_edges(
        vertex_count: usize,
        edge_count: usize,
        src: &[u32],
        dst: &[u32],
    ) -> Result<Self> {
        if src.len() < edge_count || dst.len() < edge_count {
            return Err(SubgraphError::config(format!(
                "edge arrays hold {}/{} entries, {} edges requested",
                src.len(),
                dst.len(),
                edge_count
            )));
        }
        if vertex_count == 0 {
            return Err(SubgraphError::config("graph must have at least one vertex"));
        }

        let mut adjacency = vec![Vec::new(); vertex_count];
        let mut seen = HashSet::with_capacity(edge_count);
        let mut repeated = 0usize;
        for (&s, &d) in src.iter().zip(dst).take(edge_count) {
            if s as usize >= vertex_count || d as usize >= vertex_count {
                return Err(SubgraphError::config(format!(
                    "edge ({}, {}) references a vertex outside 0..{}",
                    s, d, vertex_count
                )));
            }
            if !seen.insert((s.min(d), s.max(d))) {
                repeated += 1;
                continue;
            }
            adjacency[s as usize].push(d);
            adjacency[d as usize].push(s);
        }
        if repeated > 0 {
            log::debug!("Skipped {} repeated edges", repeated);
        }

        let vertex_ids: Vec<u32> = (0..vertex_count as u32).collect();
        Ok(Self::assemble(vertex_ids, adjacency, vertex_count as u32 - 1))
    }

    /// Assemble a graph from owned vertices and their neighbour lists
    ///
    /// `max_vertex_id` bounds every id appearing either as a vertex or as a neighbour.
    pub(crate) fn assemble(
        vertex_ids: Vec<u32>,
        adjacency: Vec<Vec<u32>>,
        max_vertex_id: u32,
    ) -> Self {
        let mut local_ids = vec![NO_LOCAL_ID; max_vertex_id as usize + 1];
        for (local, &global) in vertex_ids.iter().enumerate() {
            local_ids[global as usize] = local as u32;
        }

        let num_edges = adjacency.iter().map(|list| list.len()).sum();
        let max_degree = adjacency.iter().map(|list| list.len()).max().unwrap_or(0);

        Self {
            vertex_ids,
            local_ids,
            adjacency,
            num_edges,
            max_degree,
            max_vertex_id,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertex_ids.len()
    }

    /// Number of directed adjacency entries
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    pub fn max_vertex_id(&self) -> u32 {
        self.max_vertex_id
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_ids.is_empty()
    }

    /// Neighbour global ids of a local vertex
    pub fn adjacent_vertices(&self, local: usize) -> &[u32] {
        &self.adjacency[local]
    }

    pub fn out_degree(&self, local: usize) -> usize {
        self.adjacency[local].len()
    }

    pub fn global_id(&self, local: usize) -> u32 {
        self.vertex_ids[local]
    }

    /// Global ids of all local vertices, in local order
    pub fn vertex_ids(&self) -> &[u32] {
        &self.vertex_ids
    }

    /// Local index of a global id, if this graph owns it
    pub fn local_id(&self, global: u32) -> Option<usize> {
        match self.local_ids.get(global as usize) {
            Some(&id) if id != NO_LOCAL_ID => Some(id as usize),
            _ => None,
        }
    }

    /// Degree of every local vertex
    pub fn degree_sequence(&self) -> Vec<usize> {
        self.adjacency.iter().map(|list| list.len()).collect()
    }

    /// Whether the undirected edge `{u, v}` exists, both given as local ids of a graph whose
    /// global and local ids coincide (templates)
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.adjacency[u].contains(&(v as u32))
    }

    /// An adjacency entry `(v, u)`, as global ids, with no matching entry `(u, v)`
    ///
    /// For a whole graph this is `None` exactly when the adjacency is undirected and every
    /// neighbour is a vertex of the graph.
    pub fn one_way_entry(&self) -> Option<(u32, u32)> {
        let mut entries: Vec<(u32, u32)> = self
            .adjacency
            .iter()
            .zip(&self.vertex_ids)
            .flat_map(|(list, &v)| list.iter().map(move |&u| (v, u)))
            .collect();
        entries.par_sort_unstable();
        entries
            .par_iter()
            .find_first(|&&(v, u)| entries.binary_search(&(u, v)).is_err())
            .copied()
    }

    /// Release all owned storage; calling it again is a no-op
    pub fn release(&mut self) {
        if self.vertex_ids.is_empty() && self.adjacency.is_empty() {
            return;
        }
        *self = Graph::default();
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        let base = mem::size_of::<Self>();
        let ids = (self.vertex_ids.capacity() + self.local_ids.capacity()) * mem::size_of::<u32>();
        let lists = self
            .adjacency
            .iter()
            .map(|list| list.capacity() * mem::size_of::<u32>() + mem::size_of::<Vec<u32>>())
            .sum::<usize>();
        base + ids + lists
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path3() -> Graph {
        Graph::from_edges(3, 2, &[0, 1], &[1, 2]).unwrap()
    }

    #[test]
    fn test_from_edges_builds_undirected_lists() {
        let g = path3();
        assert_eq!(g.num_vertices(), 3);
        assert_eq!(g.num_edges(), 4);
        assert_eq!(g.max_degree(), 2);
        assert_eq!(g.degree_sequence(), vec![1, 2, 1]);
        assert_eq!(g.adjacent_vertices(1), &[0, 2]);
        assert!(g.has_edge(2, 1));
        assert!(!g.has_edge(0, 2));
    }

    #[test]
    fn test_rebuild_after_release_is_identical() {
        let mut g = path3();
        let copy = g.clone();
        g.release();
        assert!(g.is_empty());
        g.release();
        assert!(g.is_empty());

        let rebuilt = path3();
        assert_eq!(rebuilt, copy);
        assert_eq!(rebuilt.degree_sequence(), vec![1, 2, 1]);
    }

    #[test]
    fn test_clone_is_deep() {
        let g = path3();
        let mut copy = g.clone();
        copy.release();
        assert_eq!(g.degree_sequence(), vec![1, 2, 1]);
    }

    #[test]
    fn test_short_edge_arrays_rejected() {
        let err = Graph::from_edges(3, 3, &[0, 1], &[1, 2]).unwrap_err();
        assert!(matches!(err, SubgraphError::Config(_)));
    }

    #[test]
    fn test_out_of_range_edge_rejected() {
        assert!(Graph::from_edges(2, 1, &[0], &[5]).is_err());
        assert!(Graph::from_edges(0, 0, &[], &[]).is_err());
    }

    #[test]
    fn test_repeated_edges_kept_once() {
        let g = Graph::from_edges(3, 4, &[0, 1, 1, 2], &[1, 0, 2, 1]).unwrap();
        assert_eq!(g.num_edges(), 4);
        assert_eq!(g.adjacent_vertices(1), &[0, 2]);
        assert_eq!(g, path3());
    }

    #[test]
    fn test_one_way_entry() {
        assert_eq!(path3().one_way_entry(), None);

        let one_way = Graph::assemble(vec![0, 1, 2], vec![vec![1, 2], vec![2], vec![1]], 2);
        assert_eq!(one_way.one_way_entry(), Some((0, 1)));

        let dangling = Graph::assemble(vec![0, 1], vec![vec![1, 5], vec![0]], 5);
        assert_eq!(dangling.one_way_entry(), Some((0, 5)));
    }

    #[test]
    fn test_sparse_global_ids() {
        let g = Graph::assemble(vec![10, 4], vec![vec![4, 7], vec![10]], 10);
        assert_eq!(g.local_id(10), Some(0));
        assert_eq!(g.local_id(4), Some(1));
        assert_eq!(g.local_id(7), None);
        assert_eq!(g.local_id(99), None);
        assert_eq!(g.global_id(1), 4);
        assert_eq!(g.num_edges(), 3);
    }
}
