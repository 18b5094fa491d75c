//! Graph construction from per-vertex adjacency records

use crate::error::{Result, SubgraphError};
use crate::graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One line of an adjacency file: a vertex and its neighbour global ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyRecord {
    pub vertex: u32,
    pub neighbors: Vec<u32>,
}

impl AdjacencyRecord {
    pub fn new(vertex: u32, neighbors: Vec<u32>) -> Self {
        Self { vertex, neighbors }
    }
}

/// Builder for incrementally constructing a worker's partition of the big graph
pub struct GraphBuilder {
    /// Mapping from global ids to local indices
    id_to_index: HashMap<u32, u32>,

    /// Global id of each local vertex
    vertex_ids: Vec<u32>,

    /// Adjacency lists for each local vertex
    adjacency_lists: Vec<Vec<u32>>,

    /// Largest id seen as a vertex or a neighbour
    max_seen_id: u32,
}

impl GraphBuilder {
    /// Create a new graph builder with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_index: HashMap::with_capacity(capacity),
            vertex_ids: Vec::with_capacity(capacity),
            adjacency_lists: Vec::with_capacity(capacity),
            max_seen_id: 0,
        }
    }

    /// Get or create the local index for a global id
    fn get_or_create_vertex(&mut self, id: u32) -> u32 {
        if let Some(&idx) = self.id_to_index.get(&id) {
            return idx;
        }

        let idx = self.vertex_ids.len() as u32;
        self.id_to_index.insert(id, idx);
        self.vertex_ids.push(id);
        self.adjacency_lists.push(Vec::new());
        self.max_seen_id = self.max_seen_id.max(id);

        idx
    }

    /// Add a vertex with its neighbours; records for the same vertex are merged
    pub fn add_record(&mut self, record: AdjacencyRecord) {
        let idx = self.get_or_create_vertex(record.vertex) as usize;
        if let Some(&max_nbr) = record.neighbors.iter().max() {
            self.max_seen_id = self.max_seen_id.max(max_nbr);
        }
        self.adjacency_lists[idx].extend(record.neighbors);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = AdjacencyRecord>) {
        for record in records {
            self.add_record(record);
        }
    }

    /// Add the reverse of every one-way adjacency entry; returns how many were added
    ///
    /// A neighbour without a record of its own becomes a vertex. Only meaningful when the
    /// builder holds the whole graph.
    pub fn symmetrize(&mut self) -> usize {
        for list in &mut self.adjacency_lists {
            list.sort_unstable();
            list.dedup();
        }

        let mut missing = Vec::new();
        for (list, &v) in self.adjacency_lists.iter().zip(&self.vertex_ids) {
            for &u in list {
                let has_reverse = self
                    .id_to_index
                    .get(&u)
                    .is_some_and(|&idx| self.adjacency_lists[idx as usize].binary_search(&v).is_ok());
                if !has_reverse {
                    missing.push((u, v));
                }
            }
        }

        for &(u, v) in &missing {
            let idx = self.get_or_create_vertex(u) as usize;
            self.adjacency_lists[idx].push(v);
        }
        missing.len()
    }

    /// Largest id seen so far, as a vertex or as a neighbour
    pub fn max_seen_id(&self) -> u32 {
        self.max_seen_id
    }

    /// Build the graph; `max_vertex_id` is the global maximum over all partitions
    pub fn build(self, max_vertex_id: u32) -> Result<Graph> {
        if self.vertex_ids.is_empty() {
            return Err(SubgraphError::config("graph partition has no vertices"));
        }
        if self.max_seen_id > max_vertex_id {
            return Err(SubgraphError::config(format!(
                "vertex id {} exceeds global maximum {}",
                self.max_seen_id, max_vertex_id
            )));
        }

        let mut adjacency_lists = self.adjacency_lists;
        for list in &mut adjacency_lists {
            list.sort_unstable();
            list.dedup();
        }

        Ok(Graph::assemble(self.vertex_ids, adjacency_lists, max_vertex_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_merges_records() {
        let mut builder = GraphBuilder::with_capacity(4);
        builder.add_record(AdjacencyRecord::new(5, vec![7, 2]));
        builder.add_record(AdjacencyRecord::new(2, vec![5]));
        builder.add_record(AdjacencyRecord::new(5, vec![9, 2]));
        assert_eq!(builder.max_seen_id(), 9);

        let g = builder.build(9).unwrap();
        assert_eq!(g.num_vertices(), 2);
        assert_eq!(g.adjacent_vertices(0), &[2, 7, 9]);
        assert_eq!(g.local_id(2), Some(1));
        assert_eq!(g.max_degree(), 3);
        assert_eq!(g.max_vertex_id(), 9);
    }

    #[test]
    fn test_build_rejects_small_global_max() {
        let mut builder = GraphBuilder::with_capacity(1);
        builder.add_record(AdjacencyRecord::new(1, vec![12]));
        assert!(builder.build(4).is_err());
    }

    #[test]
    fn test_symmetrize_completes_one_way_entries() {
        let mut builder = GraphBuilder::with_capacity(4);
        builder.add_record(AdjacencyRecord::new(0, vec![1, 2]));
        builder.add_record(AdjacencyRecord::new(1, vec![3]));
        builder.add_record(AdjacencyRecord::new(2, vec![0]));
        builder.add_record(AdjacencyRecord::new(3, vec![1, 6]));
        assert_eq!(builder.symmetrize(), 2);
        assert_eq!(builder.symmetrize(), 0);

        let g = builder.build(6).unwrap();
        assert_eq!(g.num_vertices(), 5);
        assert_eq!(g.adjacent_vertices(1), &[0, 3]);
        assert_eq!(g.adjacent_vertices(g.local_id(6).unwrap()), &[3]);
        assert_eq!(g.one_way_entry(), None);
    }

    #[test]
    fn test_empty_partition_rejected() {
        assert!(GraphBuilder::with_capacity(0).build(3).is_err());
    }
}
