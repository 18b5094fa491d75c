//! Automorphism counting for small templates

use crate::graph::Graph;

/// Number of vertex permutations of `template` that preserve adjacency
///
/// Backtracks over partial mappings, pruning on degree and on adjacency to already-mapped
/// vertices. Works for any small graph, not only trees.
pub fn count_automorphisms(template: &Graph) -> u64 {
    let n = template.num_vertices();
    let mut mapping = Vec::with_capacity(n);
    let mut used = vec![false; n];
    extend_mapping(template, &mut mapping, &mut used)
}

fn extend_mapping(template: &Graph, mapping: &mut Vec<usize>, used: &mut [bool]) -> u64 {
    let v = mapping.len();
    if v == template.num_vertices() {
        return 1;
    }

    let mut count = 0;
    for image in 0..template.num_vertices() {
        if used[image] || template.out_degree(image) != template.out_degree(v) {
            continue;
        }
        let consistent = (0..v).all(|u| template.has_edge(u, v) == template.has_edge(mapping[u], image));
        if !consistent {
            continue;
        }

        used[image] = true;
        mapping.push(image);
        count += extend_mapping(template, mapping, used);
        mapping.pop();
        used[image] = false;
    }
    count
}
