//! Vertex ownership and per-worker communication plans

use crate::error::{Result, SubgraphError};
use crate::graph::{AdjacencyRecord, Graph, GraphBuilder};

/// Marks a global id with no remote row slot
const NO_QUEUE: u32 = u32::MAX;

/// Marks a global id that no mapper owns
const NO_OWNER: u32 = u32::MAX;

/// Which mapper owns each global vertex id
#[derive(Debug, Clone, PartialEq)]
pub struct MapperAssignment {
    mapper_num: usize,
    /// Explicit owner per global id; `None` means `id % mapper_num`
    owners: Option<Vec<u32>>,
}

impl MapperAssignment {
    pub fn modulo(mapper_num: usize) -> Result<Self> {
        if mapper_num == 0 {
            return Err(SubgraphError::config("at least one mapper is required"));
        }
        Ok(Self {
            mapper_num,
            owners: None,
        })
    }

    /// Owner table indexed by global id
    pub fn from_table(owners: Vec<u32>, mapper_num: usize) -> Result<Self> {
        Self::modulo(mapper_num)?;
        if let Some((id, &owner)) = owners
            .iter()
            .enumerate()
            .find(|&(_, &owner)| owner != NO_OWNER && owner as usize >= mapper_num)
        {
            return Err(SubgraphError::config(format!(
                "vertex {} assigned to mapper {} but only {} mappers exist",
                id, owner, mapper_num
            )));
        }
        Ok(Self {
            mapper_num,
            owners: Some(owners),
        })
    }

    /// Owner table from `(vertex, mapper)` pairs; unlisted ids have no owner
    pub fn from_pairs(pairs: &[(u32, u32)], mapper_num: usize) -> Result<Self> {
        let max_id = pairs.iter().map(|&(v, _)| v).max().unwrap_or(0);
        let mut owners = vec![NO_OWNER; max_id as usize + 1];
        for &(vertex, mapper) in pairs {
            let slot = &mut owners[vertex as usize];
            if *slot != NO_OWNER && *slot != mapper {
                return Err(SubgraphError::config(format!(
                    "vertex {} assigned to both mapper {} and mapper {}",
                    vertex, *slot, mapper
                )));
            }
            *slot = mapper;
        }
        Self::from_table(owners, mapper_num)
    }

    pub fn mapper_num(&self) -> usize {
        self.mapper_num
    }

    pub fn owner(&self, global: u32) -> Option<usize> {
        match &self.owners {
            None => Some(global as usize % self.mapper_num),
            Some(owners) => match owners.get(global as usize) {
                Some(&owner) if owner != NO_OWNER => Some(owner as usize),
                _ => None,
            },
        }
    }

    /// Cut a whole graph into one partition per mapper
    ///
    /// Every partition keeps full neighbour lists (global ids) and the global maximum id.
    pub fn split(&self, graph: &Graph) -> Result<Vec<Graph>> {
        let mut builders: Vec<GraphBuilder> = (0..self.mapper_num)
            .map(|_| GraphBuilder::with_capacity(graph.num_vertices() / self.mapper_num + 1))
            .collect();

        for v in 0..graph.num_vertices() {
            let global = graph.global_id(v);
            let owner = self.owner(global).ok_or_else(|| {
                SubgraphError::config(format!("vertex {} has no mapper assigned", global))
            })?;
            builders[owner].add_record(AdjacencyRecord::new(
                global,
                graph.adjacent_vertices(v).to_vec(),
            ));
        }

        builders
            .into_iter()
            .enumerate()
            .map(|(m, builder)| {
                builder.build(graph.max_vertex_id()).map_err(|e| {
                    SubgraphError::config(format!("partition of mapper {}: {}", m, e))
                })
            })
            .collect()
    }
}

/// What one worker sends and receives during every exchange step
#[derive(Debug, Clone)]
pub struct CommPlan {
    local_mapper_id: usize,

    /// `comm_mapper_vertex[m]`: local vertices whose rows mapper `m` reads
    comm_mapper_vertex: Vec<Vec<u32>>,

    /// Remote row slot of each global id, `NO_QUEUE` for ids this worker never reads remotely
    abs_v_to_queue: Vec<u32>,

    /// Global id held in each remote row slot
    queue_vertices: Vec<u32>,

    /// Mappers owning at least one neighbour of a local vertex
    expected_senders: Vec<usize>,
}

impl CommPlan {
    pub fn build(graph: &Graph, assignment: &MapperAssignment, local_mapper_id: usize) -> Result<Self> {
        let mapper_num = assignment.mapper_num();
        if local_mapper_id >= mapper_num {
            return Err(SubgraphError::config(format!(
                "mapper id {} outside 0..{}",
                local_mapper_id, mapper_num
            )));
        }

        let mut comm_mapper_vertex = vec![Vec::new(); mapper_num];
        let mut abs_v_to_queue = vec![NO_QUEUE; graph.max_vertex_id() as usize + 1];
        let mut queue_vertices = Vec::new();
        let mut expected = vec![false; mapper_num];

        for v in 0..graph.num_vertices() {
            for &u in graph.adjacent_vertices(v) {
                if graph.local_id(u).is_some() {
                    continue;
                }
                let owner = assignment.owner(u).ok_or_else(|| {
                    SubgraphError::config(format!("neighbour {} has no mapper assigned", u))
                })?;
                if owner == local_mapper_id {
                    // claimed by this mapper but absent from its partition
                    continue;
                }

                comm_mapper_vertex[owner].push(v as u32);
                expected[owner] = true;
                if abs_v_to_queue[u as usize] == NO_QUEUE {
                    abs_v_to_queue[u as usize] = queue_vertices.len() as u32;
                    queue_vertices.push(u);
                }
            }
        }

        for list in &mut comm_mapper_vertex {
            list.dedup();
        }

        let expected_senders = (0..mapper_num).filter(|&m| expected[m]).collect::<Vec<_>>();

        log::debug!(
            "Mapper {}: {} remote neighbours from {} mappers",
            local_mapper_id,
            queue_vertices.len(),
            expected_senders.len()
        );

        Ok(Self {
            local_mapper_id,
            comm_mapper_vertex,
            abs_v_to_queue,
            queue_vertices,
            expected_senders,
        })
    }

    pub fn local_mapper_id(&self) -> usize {
        self.local_mapper_id
    }

    pub fn mapper_num(&self) -> usize {
        self.comm_mapper_vertex.len()
    }

    pub fn comm_vertices(&self, mapper: usize) -> &[u32] {
        &self.comm_mapper_vertex[mapper]
    }

    /// Mappers with at least one dependent vertex, in rotated order from `local_mapper_id + 1`
    /// when `rotate` is set and ascending otherwise
    pub fn send_targets(&self, rotate: bool) -> Vec<usize> {
        let n = self.mapper_num();
        let order: Vec<usize> = if rotate {
            (1..n).map(|k| (self.local_mapper_id + k) % n).collect()
        } else {
            (0..n).filter(|&m| m != self.local_mapper_id).collect()
        };
        order
            .into_iter()
            .filter(|&m| !self.comm_mapper_vertex[m].is_empty())
            .collect()
    }

    pub fn expected_senders(&self) -> &[usize] {
        &self.expected_senders
    }

    pub fn remote_slot(&self, global: u32) -> Option<usize> {
        match self.abs_v_to_queue.get(global as usize) {
            Some(&slot) if slot != NO_QUEUE => Some(slot as usize),
            _ => None,
        }
    }

    pub fn remote_len(&self) -> usize {
        self.queue_vertices.len()
    }

    pub fn queue_vertices(&self) -> &[u32] {
        &self.queue_vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0-1-2-3-4-5 path
    fn path6() -> Graph {
        Graph::from_edges(6, 5, &[0, 1, 2, 3, 4], &[1, 2, 3, 4, 5]).unwrap()
    }

    #[test]
    fn test_modulo_split() {
        let assignment = MapperAssignment::modulo(2).unwrap();
        let parts = assignment.split(&path6()).unwrap();
        assert_eq!(parts[0].vertex_ids(), &[0, 2, 4]);
        assert_eq!(parts[1].vertex_ids(), &[1, 3, 5]);
        assert_eq!(parts[0].adjacent_vertices(1), &[1, 3]);
        assert_eq!(parts[1].max_vertex_id(), 5);
    }

    #[test]
    fn test_comm_plan_is_symmetric() {
        let graph = path6();
        let assignment = MapperAssignment::from_pairs(
            &[(0, 0), (1, 0), (2, 0), (3, 1), (4, 1), (5, 1)],
            2,
        )
        .unwrap();
        let parts = assignment.split(&graph).unwrap();

        let plan0 = CommPlan::build(&parts[0], &assignment, 0).unwrap();
        let plan1 = CommPlan::build(&parts[1], &assignment, 1).unwrap();

        // only the 2-3 edge crosses
        assert_eq!(plan0.comm_vertices(1), &[2]);
        assert_eq!(plan1.comm_vertices(0), &[0]);
        assert_eq!(parts[1].global_id(0), 3);
        assert_eq!(plan0.queue_vertices(), &[3]);
        assert_eq!(plan0.remote_slot(3), Some(0));
        assert_eq!(plan0.remote_slot(4), None);
        assert_eq!(plan0.expected_senders(), &[1]);
        assert_eq!(plan1.expected_senders(), &[0]);
    }

    #[test]
    fn test_send_targets_rotation() {
        let graph = Graph::from_edges(4, 6, &[0, 0, 0, 1, 1, 2], &[1, 2, 3, 2, 3, 3]).unwrap();
        let assignment = MapperAssignment::modulo(4).unwrap();
        let parts = assignment.split(&graph).unwrap();
        let plan = CommPlan::build(&parts[2], &assignment, 2).unwrap();
        assert_eq!(plan.send_targets(false), vec![0, 1, 3]);
        assert_eq!(plan.send_targets(true), vec![3, 0, 1]);
    }

    #[test]
    fn test_bad_assignments() {
        assert!(MapperAssignment::modulo(0).is_err());
        assert!(MapperAssignment::from_table(vec![0, 3], 2).is_err());
        assert!(MapperAssignment::from_pairs(&[(1, 0), (1, 1)], 2).is_err());

        let partial = MapperAssignment::from_pairs(&[(0, 0)], 1).unwrap();
        assert_eq!(partial.owner(0), Some(0));
        assert_eq!(partial.owner(5), None);
        assert!(partial.split(&path6()).is_err());
    }

    #[test]
    fn test_single_mapper_has_no_traffic() {
        let graph = path6();
        let assignment = MapperAssignment::modulo(1).unwrap();
        let parts = assignment.split(&graph).unwrap();
        let plan = CommPlan::build(&parts[0], &assignment, 0).unwrap();
        assert!(plan.send_targets(true).is_empty());
        assert!(plan.expected_senders().is_empty());
        assert_eq!(plan.remote_len(), 0);
    }
}
