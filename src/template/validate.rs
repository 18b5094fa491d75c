//! Template shape checks

use crate::error::{Result, SubgraphError};
use crate::graph::Graph;
use petgraph::algo::{connected_components, is_cyclic_undirected};
use petgraph::graph::UnGraph;

/// Reject templates the partitioner cannot decompose
///
/// A template must be non-empty, connected and acyclic: every split removes one tree edge
/// and leaves two smaller trees.
pub fn validate_template(template: &Graph) -> Result<()> {
    let n = template.num_vertices();
    if n == 0 {
        return Err(SubgraphError::config("template has no vertices"));
    }

    let mut shape = UnGraph::<(), ()>::with_capacity(n, template.num_edges() / 2);
    let nodes: Vec<_> = (0..n).map(|_| shape.add_node(())).collect();
    for v in 0..n {
        for &u in template.adjacent_vertices(v) {
            // each undirected edge is stored at both endpoints; keep one copy
            if (u as usize) > v {
                shape.add_edge(nodes[v], nodes[u as usize], ());
            } else if u as usize == v {
                return Err(SubgraphError::config(format!("template has a self-loop at {}", v)));
            }
        }
    }

    if connected_components(&shape) != 1 {
        return Err(SubgraphError::config("template is not connected"));
    }
    if is_cyclic_undirected(&shape) {
        return Err(SubgraphError::config(
            "template contains a cycle; only tree templates can be partitioned",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_trees() {
        let star = Graph::from_edges(4, 3, &[0, 0, 0], &[1, 2, 3]).unwrap();
        assert!(validate_template(&star).is_ok());
        let single = Graph::from_edges(1, 0, &[], &[]).unwrap();
        assert!(validate_template(&single).is_ok());
    }

    #[test]
    fn test_rejects_cycles_and_forests() {
        let triangle = Graph::from_edges(3, 3, &[0, 0, 1], &[1, 2, 2]).unwrap();
        assert!(matches!(validate_template(&triangle), Err(SubgraphError::Config(_))));

        let forest = Graph::from_edges(4, 2, &[0, 2], &[1, 3]).unwrap();
        assert!(validate_template(&forest).is_err());

        let doubled = Graph::from_edges(2, 2, &[0, 0], &[1, 1]).unwrap();
        assert!(validate_template(&doubled).is_err());
    }
}
