use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use subgraph_counter::config::Config;
use subgraph_counter::counting::TemplatePlan;
use subgraph_counter::data::{
    read_adjacency_files, read_assignment_file, read_edge_list_graph, read_template,
};
use subgraph_counter::distributed::{run_local, run_with_assignment};
use subgraph_counter::storage::save_results;
use subgraph_counter::SubgraphError;

/// Fresh scratch directory under the system temp dir
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("subgraph-counter-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn template_round_trip_keeps_degrees() {
    let dir = scratch_dir("template");
    let path = dir.join("path3.t");
    fs::write(&path, "3\n2\n0 1\n1 2\n").unwrap();

    let first = read_template(&path).unwrap();
    let mut released = first.clone();
    released.release();
    released.release();
    assert!(released.is_empty());

    let second = read_template(&path).unwrap();
    assert_eq!(first, second);
    assert_eq!(second.degree_sequence(), vec![1, 2, 1]);
}

#[test]
fn malformed_files_are_configuration_errors() {
    let dir = scratch_dir("malformed");
    let short = dir.join("short.t");
    fs::write(&short, "4\n3\n0 1\n1 2\n").unwrap();
    assert!(matches!(read_template(&short), Err(SubgraphError::Parse { .. })));

    let empty = dir.join("empty.t");
    fs::write(&empty, "").unwrap();
    assert!(read_edge_list_graph(&empty).is_err());

    assert!(matches!(read_template(dir.join("missing.t")), Err(SubgraphError::Io(_))));
    assert!(read_adjacency_files(&[]).is_err());
}

#[test]
fn adjacency_shards_assignment_and_results() {
    let dir = scratch_dir("shards");

    // 6-cycle split over two shards plus an empty one
    let shard_a = dir.join("part-0");
    let shard_b = dir.join("part-1");
    let shard_c = dir.join("part-2");
    fs::write(&shard_a, "0 1,5\n1 0,2\n2 1,3\n").unwrap();
    fs::write(&shard_b, "3 2,4\n4 3,5\n5 4,0\n9\n").unwrap();
    fs::write(&shard_c, "").unwrap();

    let graph = read_adjacency_files(&[shard_a, shard_b, shard_c]).unwrap();
    assert_eq!(graph.num_vertices(), 6);
    assert_eq!(graph.num_edges(), 12);
    assert_eq!(graph.max_vertex_id(), 5);

    let assignment_path = dir.join("assignment");
    fs::write(&assignment_path, "0 0\n1 0\n2 0\n3 1\n4 1\n5 1\n").unwrap();
    let assignment = read_assignment_file(&assignment_path, 2).unwrap();
    assert_eq!(assignment.owner(4), Some(1));
    assert!(read_assignment_file(&assignment_path, 1).is_err());

    let template_path = dir.join("edge.t");
    fs::write(&template_path, "2\n1\n0 1\n").unwrap();
    let template = read_template(&template_path).unwrap();

    let mut config = Config::new(Some(2), 2, 2);
    config.seed = Some(3);
    config.vertex_counts = true;
    let plan = TemplatePlan::new(&template, 2).unwrap();
    let result = run_with_assignment(&graph, &plan, &assignment, &config).unwrap();

    let out = dir.join("results");
    save_results(&result, &plan, &graph, &out).unwrap();
    for name in ["summary.json", "mappers.json", "subtemplates.json", "vertex_counts.json"] {
        assert!(out.join(name).exists(), "{} missing", name);
    }

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["graph_stats"]["vertex_count"], 6);
    assert_eq!(summary["run"]["mapper_count"], 2);
    assert_eq!(summary["template"]["automorphisms"], 2);

    let subtemplates: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("subtemplates.json")).unwrap()).unwrap();
    assert_eq!(subtemplates["subtemplates"].as_array().unwrap().len(), 3);
}

#[test]
fn config_file_is_read() {
    let dir = scratch_dir("config");
    let path = dir.join("config.json");
    fs::write(&path, r#"{ "iterations": 4, "mapper_num": 2, "rotation_pipeline": true }"#).unwrap();
    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.iterations, 4);
    assert!(config.rotation_pipeline);
    assert_eq!(config.send_array_limit, 1000);

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Config::from_file(&path), Err(SubgraphError::Json(_))));
}

#[test]
fn one_directional_shard_loads_undirected() {
    let dir = scratch_dir("one-way");
    let shard = dir.join("part-0");
    // 0 lists 1, but 1 does not list 0
    fs::write(&shard, "0 1,2\n1 3\n2 0\n3 1\n").unwrap();

    let graph = read_adjacency_files(&[shard]).unwrap();
    assert_eq!(graph.num_edges(), 6);
    assert_eq!(graph.one_way_entry(), None);

    let template_path = dir.join("edge.t");
    fs::write(&template_path, "2\n1\n0 1\n").unwrap();
    let template = read_template(&template_path).unwrap();

    let mut config = Config::new(Some(2), 2, 1);
    config.seed = Some(3);
    config.recv_timeout_ms = 20_000;
    let single = run_local(&graph, &template, &config).unwrap();

    config.mapper_num = 2;
    let started = Instant::now();
    let split = run_local(&graph, &template, &config).unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(split.raw_totals, single.raw_totals);
}
