//! Exhaustive colorful-embedding count for small graphs
//!
//! Works for any template shape, cycles included, and serves as a reference for the
//! dynamic-programming pass.

use crate::counting::table::Count;
use crate::error::{Result, SubgraphError};
use crate::graph::Graph;

/// Colorful embeddings of a template under one fixed coloring
#[derive(Debug, Clone, PartialEq)]
pub struct ColorfulMatches {
    /// Embeddings that map template vertex 0 onto each local vertex
    pub per_root: Vec<Count>,
    pub total: Count,
}

struct Search<'a> {
    graph: &'a Graph,
    template: &'a Graph,
    colors: &'a [u8],
    images: Vec<usize>,
    used_vertex: Vec<bool>,
    used_color: [bool; 256],
}

impl Search<'_> {
    fn connected(&self, x: usize, y: usize) -> bool {
        self.graph
            .adjacent_vertices(x)
            .contains(&self.graph.global_id(y))
    }

    fn extend(&mut self) -> u64 {
        let i = self.images.len();
        if i == self.template.num_vertices() {
            return 1;
        }

        // an already placed template neighbour narrows the candidates to its graph neighbours
        let anchor = (0..i).find(|&j| self.template.has_edge(i, j));
        let candidates: Vec<usize> = match anchor {
            Some(j) => self
                .graph
                .adjacent_vertices(self.images[j])
                .iter()
                .filter_map(|&u| self.graph.local_id(u))
                .collect(),
            None => (0..self.graph.num_vertices()).collect(),
        };

        let mut count = 0;
        for x in candidates {
            let color = self.colors[x] as usize;
            if self.used_vertex[x] || self.used_color[color] {
                continue;
            }
            let fits = (0..i)
                .filter(|&j| self.template.has_edge(i, j))
                .all(|j| self.connected(self.images[j], x));
            if !fits {
                continue;
            }

            self.used_vertex[x] = true;
            self.used_color[color] = true;
            self.images.push(x);
            count += self.extend();
            self.images.pop();
            self.used_color[color] = false;
            self.used_vertex[x] = false;
        }
        count
    }
}

/// Count injective, edge-preserving maps of `template` into `graph` whose image vertices all
/// carry distinct colors
///
/// `graph` must own every vertex it references.
pub fn colorful_matches(graph: &Graph, template: &Graph, colors: &[u8]) -> Result<ColorfulMatches> {
    if colors.len() != graph.num_vertices() {
        return Err(SubgraphError::config(format!(
            "{} colors supplied for {} vertices",
            colors.len(),
            graph.num_vertices()
        )));
    }
    let foreign = (0..graph.num_vertices())
        .flat_map(|v| graph.adjacent_vertices(v))
        .any(|&u| graph.local_id(u).is_none());
    if foreign {
        return Err(SubgraphError::config(
            "exhaustive matching needs a graph that owns all its neighbours",
        ));
    }

    let mut search = Search {
        graph,
        template,
        colors,
        images: Vec::with_capacity(template.num_vertices()),
        used_vertex: vec![false; graph.num_vertices()],
        used_color: [false; 256],
    };

    let mut per_root = vec![0.0; graph.num_vertices()];
    for (v, slot) in per_root.iter_mut().enumerate() {
        let color = colors[v] as usize;
        search.used_vertex[v] = true;
        search.used_color[color] = true;
        search.images.push(v);
        *slot = search.extend() as Count;
        search.images.clear();
        search.used_color[color] = false;
        search.used_vertex[v] = false;
    }

    let total = per_root.iter().sum();
    Ok(ColorfulMatches { per_root, total })
}
