//! Recursive decomposition of a tree template into a binary tree of sub-templates

use crate::error::Result;
use crate::graph::Graph;
use crate::template::validate::validate_template;
use std::collections::VecDeque;

/// One node of the partition tree
///
/// Links are indices into the partitioner's flat sub-template array.
#[derive(Debug, Clone)]
pub struct SubTemplate {
    pub graph: Graph,
    pub parent: Option<usize>,
    pub active: Option<usize>,
    pub passive: Option<usize>,
}

impl SubTemplate {
    fn detached(graph: Graph) -> Self {
        Self {
            graph,
            parent: None,
            active: None,
            passive: None,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.graph.num_vertices()
    }

    pub fn is_leaf(&self) -> bool {
        self.num_vertices() == 1
    }
}

/// Splits a template into sub-templates until every leaf is a single vertex
///
/// Each split picks the first neighbour `u` of the current root and cuts the edge
/// `{root, u}`: the side containing `root` becomes the active child (rooted at `root`), the
/// side containing `u` the passive child (rooted at `u`). Both children are relabelled so
/// their root is vertex 0. After [`Partitioner::new`] returns, sub-templates are ordered so
/// that every parent precedes its children.
#[derive(Debug, Clone)]
pub struct Partitioner {
    subtemplates: Vec<SubTemplate>,
}

impl Partitioner {
    pub fn new(template: &Graph) -> Result<Self> {
        validate_template(template)?;

        let mut partitioner = Self {
            subtemplates: vec![SubTemplate::detached(template.clone())],
        };

        if template.num_vertices() > 1 {
            partitioner.partition_recursive(0, 0)?;
        }
        partitioner.sort_subtemplates();

        log::info!(
            "Partitioned {}-vertex template into {} sub-templates",
            template.num_vertices(),
            partitioner.subtemplate_count()
        );

        Ok(partitioner)
    }

    fn partition_recursive(&mut self, s: usize, root: usize) -> Result<()> {
        let (active_root, passive_root) = self.split(s, root)?;

        let a = self.subtemplates.len() - 2;
        let p = self.subtemplates.len() - 1;
        self.subtemplates[s].active = Some(a);
        self.subtemplates[s].passive = Some(p);
        self.subtemplates[a].parent = Some(s);
        self.subtemplates[p].parent = Some(s);

        if !self.subtemplates[a].is_leaf() {
            self.partition_recursive(a, active_root)?;
        }
        if !self.subtemplates[p].is_leaf() {
            self.partition_recursive(p, passive_root)?;
        }

        Ok(())
    }

    /// Create the active and passive children of `s`; returns their local roots
    fn split(&mut self, s: usize, root: usize) -> Result<(usize, usize)> {
        let u = self.subtemplates[s].graph.adjacent_vertices(root)[0] as usize;

        let active_root = self.split_sub(s, root, u)?;
        let passive_root = self.split_sub(s, u, root)?;

        Ok((active_root, passive_root))
    }

    /// Collect the branch of `s` reachable from `root` without crossing `other_root`
    fn split_sub(&mut self, s: usize, root: usize, other_root: usize) -> Result<usize> {
        let graph = &self.subtemplates[s].graph;
        let n = graph.num_vertices();

        let mut visited = vec![false; n];
        visited[root] = true;
        visited[other_root] = true;

        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(u) = queue.pop_front() {
            for &v in graph.adjacent_vertices(u) {
                let v = v as usize;
                if !visited[v] {
                    visited[v] = true;
                    edges.push((u, v));
                    queue.push_back(v);
                }
            }
        }

        // dense relabelling: root first, then order of appearance
        let mut mapping = vec![usize::MAX; n];
        mapping[root] = 0;
        let mut next = 1;
        for &(u, v) in &edges {
            for x in [u, v] {
                if mapping[x] == usize::MAX {
                    mapping[x] = next;
                    next += 1;
                }
            }
        }

        let src: Vec<u32> = edges.iter().map(|&(u, _)| mapping[u] as u32).collect();
        let dst: Vec<u32> = edges.iter().map(|&(_, v)| mapping[v] as u32).collect();
        let child = Graph::from_edges(edges.len() + 1, edges.len(), &src, &dst)?;

        self.subtemplates.push(SubTemplate::detached(child));
        Ok(mapping[root])
    }

    /// Bubble sub-templates (from index 2 on) into non-decreasing parent order
    ///
    /// With parents sorted, every parent index is smaller than its children's indices, so a
    /// reverse scan visits children before parents.
    pub fn sort_subtemplates(&mut self) {
        loop {
            let mut swapped = false;
            for i in 2..self.subtemplates.len() {
                if self.parent_rank(i) < self.parent_rank(i - 1) {
                    self.swap_nodes(i - 1, i);
                    swapped = true;
                }
            }
            if !swapped {
                break;
            }
        }
    }

    fn parent_rank(&self, s: usize) -> usize {
        self.subtemplates[s].parent.unwrap_or(0)
    }

    /// Exchange two nodes and re-point every link that referenced either of them
    fn swap_nodes(&mut self, x: usize, y: usize) {
        self.subtemplates.swap(x, y);

        let remap = |link: &mut Option<usize>| match *link {
            Some(i) if i == x => *link = Some(y),
            Some(i) if i == y => *link = Some(x),
            _ => {}
        };
        for node in &mut self.subtemplates {
            remap(&mut node.parent);
            remap(&mut node.active);
            remap(&mut node.passive);
        }
    }

    pub fn subtemplates(&self) -> &[SubTemplate] {
        &self.subtemplates
    }

    pub fn subtemplate(&self, s: usize) -> &SubTemplate {
        &self.subtemplates[s]
    }

    pub fn subtemplate_count(&self) -> usize {
        self.subtemplates.len()
    }

    pub fn active_index(&self, s: usize) -> Option<usize> {
        self.subtemplates[s].active
    }

    pub fn passive_index(&self, s: usize) -> Option<usize> {
        self.subtemplates[s].passive
    }

    pub fn parent(&self, s: usize) -> Option<usize> {
        self.subtemplates[s].parent
    }

    pub fn num_verts_sub(&self, s: usize) -> usize {
        self.subtemplates[s].num_vertices()
    }

    pub fn num_verts_active(&self, s: usize) -> usize {
        self.active_index(s).map_or(0, |a| self.num_verts_sub(a))
    }

    pub fn num_verts_passive(&self, s: usize) -> usize {
        self.passive_index(s).map_or(0, |p| self.num_verts_sub(p))
    }
}
