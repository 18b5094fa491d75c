//! Template, graph and mapper-assignment file ingestion

use crate::distributed::MapperAssignment;
use crate::error::{Result, SubgraphError};
use crate::graph::{AdjacencyRecord, Graph, GraphBuilder};
use memmap2::Mmap;
use rayon::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

fn parse_u32(path: &Path, line: usize, token: &str) -> Result<u32> {
    token
        .trim()
        .parse::<u32>()
        .map_err(|e| SubgraphError::parse(path, line, format!("`{}`: {}", token, e)))
}

/// Parse the `n`, `m`, then `m` lines of `src dst` format
pub fn parse_edge_list(path: &Path, content: &str) -> Result<Graph> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let mut header = |what: &str| -> Result<usize> {
        let (line, text) = lines
            .next()
            .ok_or_else(|| SubgraphError::parse(path, 0, format!("missing {}", what)))?;
        Ok(parse_u32(path, line, text)? as usize)
    };
    let vertex_count = header("vertex count")?;
    let edge_count = header("edge count")?;
    if vertex_count == 0 {
        return Err(SubgraphError::parse(path, 1, "graph has no vertices"));
    }

    let mut src = Vec::with_capacity(edge_count);
    let mut dst = Vec::with_capacity(edge_count);
    for (line, text) in lines.take(edge_count) {
        let mut tokens = text.split_whitespace();
        let (s, d) = match (tokens.next(), tokens.next()) {
            (Some(s), Some(d)) => (parse_u32(path, line, s)?, parse_u32(path, line, d)?),
            _ => return Err(SubgraphError::parse(path, line, "expected `src dst`")),
        };
        if s as usize >= vertex_count || d as usize >= vertex_count {
            return Err(SubgraphError::parse(
                path,
                line,
                format!("edge ({}, {}) outside 0..{}", s, d, vertex_count),
            ));
        }
        src.push(s);
        dst.push(d);
    }
    if src.len() < edge_count {
        return Err(SubgraphError::parse(
            path,
            0,
            format!("{} edges declared, {} found", edge_count, src.len()),
        ));
    }

    Graph::from_edges(vertex_count, edge_count, &src, &dst)
}

/// Read a template file
pub fn read_template<P: AsRef<Path>>(path: P) -> Result<Graph> {
    let path = path.as_ref();
    let template = parse_edge_list(path, &fs::read_to_string(path)?)?;
    log::info!(
        "Loaded template {} with {} vertices and {} edges",
        path.display(),
        template.num_vertices(),
        template.num_edges() / 2
    );
    Ok(template)
}

/// Read a whole big graph stored in the template format
pub fn read_edge_list_graph<P: AsRef<Path>>(path: P) -> Result<Graph> {
    let path = path.as_ref();
    let graph = parse_edge_list(path, &fs::read_to_string(path)?)?;
    log::info!(
        "Loaded graph {} with {} vertices and {} adjacency entries",
        path.display(),
        graph.num_vertices(),
        graph.num_edges()
    );
    Ok(graph)
}

/// Parse `vertex nbr,nbr,...` lines; lines without neighbours are skipped
pub fn parse_adjacency(path: &Path, content: &str) -> Result<Vec<AdjacencyRecord>> {
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let (vertex, neighbors) = match (parts.next(), parts.next()) {
            (Some(vertex), Some(neighbors)) => (vertex, neighbors),
            _ => continue,
        };
        let neighbors = neighbors
            .split(',')
            .filter(|token| !token.is_empty())
            .map(|token| parse_u32(path, i + 1, token))
            .collect::<Result<Vec<_>>>()?;
        if neighbors.is_empty() {
            continue;
        }
        records.push(AdjacencyRecord::new(parse_u32(path, i + 1, vertex)?, neighbors));
    }
    Ok(records)
}

fn read_adjacency_file(path: &Path) -> Result<Vec<AdjacencyRecord>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: the file is only read, and input shards are not modified while a run loads them
    let mmap = unsafe { Mmap::map(&file)? };
    let content = std::str::from_utf8(&mmap)
        .map_err(|e| SubgraphError::parse(path, 0, format!("not UTF-8: {}", e)))?;
    parse_adjacency(path, content)
}

/// Read adjacency shards in parallel and assemble them into one undirected graph
pub fn read_adjacency_files(paths: &[PathBuf]) -> Result<Graph> {
    if paths.is_empty() {
        return Err(SubgraphError::config("no adjacency files given"));
    }

    let shards = paths
        .par_iter()
        .map(|path| read_adjacency_file(path))
        .collect::<Result<Vec<_>>>()?;

    let total: usize = shards.iter().map(Vec::len).sum();
    let mut builder = GraphBuilder::with_capacity(total);
    for shard in shards {
        builder.extend(shard);
    }
    let added = builder.symmetrize();
    if added > 0 {
        log::warn!(
            "Adjacency files are not undirected; added {} reverse entries",
            added
        );
    }
    let max_vertex_id = builder.max_seen_id();
    let graph = builder
        .build(max_vertex_id)
        .map_err(|_| SubgraphError::config("adjacency files contain no vertices"))?;

    log::info!(
        "Loaded {} adjacency files: {} vertices, {} adjacency entries, max degree {}",
        paths.len(),
        graph.num_vertices(),
        graph.num_edges(),
        graph.max_degree()
    );
    Ok(graph)
}

/// Read `vertex mapper` lines into an assignment over `mapper_num` mappers
pub fn read_assignment_file<P: AsRef<Path>>(path: P, mapper_num: usize) -> Result<MapperAssignment> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let mut pairs = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (None, _) => continue,
            (Some(vertex), Some(mapper)) => pairs.push((
                parse_u32(path, i + 1, vertex)?,
                parse_u32(path, i + 1, mapper)?,
            )),
            (Some(_), None) => {
                return Err(SubgraphError::parse(path, i + 1, "expected `vertex mapper`"))
            }
        }
    }
    MapperAssignment::from_pairs(&pairs, mapper_num)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edge_list() {
        let g = parse_edge_list(Path::new("t"), "3\n2\n0 1\n1 2\n").unwrap();
        assert_eq!(g.degree_sequence(), vec![1, 2, 1]);
    }

    #[test]
    fn test_edge_list_errors() {
        let path = Path::new("t");
        assert!(parse_edge_list(path, "0\n0\n").is_err());
        assert!(parse_edge_list(path, "3\n2\n0 1\n").is_err());
        assert!(parse_edge_list(path, "3\n1\n0 3\n").is_err());
        assert!(matches!(
            parse_edge_list(path, "3\nx\n"),
            Err(SubgraphError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_parse_adjacency_skips_isolated() {
        let records = parse_adjacency(Path::new("a"), "0 1,2\n5\n\n2 0,\n7 \n").unwrap();
        assert_eq!(
            records,
            vec![AdjacencyRecord::new(0, vec![1, 2]), AdjacencyRecord::new(2, vec![0])]
        );
        assert!(parse_adjacency(Path::new("a"), "1 2,x\n").is_err());
    }
}
