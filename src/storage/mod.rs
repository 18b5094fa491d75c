//! Results persistence module

use crate::counting::TemplatePlan;
use crate::distributed::CountResult;
use crate::error::Result;
use crate::graph::Graph;
use serde_json::{json, to_string_pretty};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Save counting results to the specified directory
pub fn save_results<P: AsRef<Path>>(
    result: &CountResult,
    plan: &TemplatePlan,
    graph: &Graph,
    output_dir: P,
) -> Result<()> {
    let output_dir = output_dir.as_ref();
    log::info!("Saving results to {}", output_dir.display());

    fs::create_dir_all(output_dir)?;

    save_summary(result, graph, output_dir)?;
    save_mappers(result, output_dir)?;
    save_subtemplates(result, plan, output_dir)?;
    if let Some(counts) = &result.vertex_counts {
        save_vertex_counts(counts, output_dir)?;
    }

    log::info!("Results saved successfully");

    Ok(())
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(to_string_pretty(value)?.as_bytes())?;
    Ok(())
}

fn save_summary(result: &CountResult, graph: &Graph, output_dir: &Path) -> Result<()> {
    let summary = json!({
        "graph_stats": {
            "vertex_count": graph.num_vertices(),
            "edge_count": graph.num_edges() / 2,
            "max_degree": graph.max_degree(),
            "avg_degree": graph.num_edges() as f64 / graph.num_vertices().max(1) as f64,
        },
        "template": {
            "vertex_count": result.template_vertices,
            "automorphisms": result.automorphisms,
        },
        "run": {
            "num_colors": result.num_colors,
            "iterations": result.iterations,
            "mapper_count": result.mapper_totals.len(),
        },
        "estimate": result.estimate,
        "std_dev": result.std_dev,
        "rmse": result.rmse,
        "raw_totals": result.raw_totals,
        "estimates": result.estimates,
    });

    write_json(&output_dir.join("summary.json"), &summary)
}

fn save_mappers(result: &CountResult, output_dir: &Path) -> Result<()> {
    let mappers = json!({ "mappers": result.mapper_totals });
    write_json(&output_dir.join("mappers.json"), &mappers)
}

fn save_subtemplates(result: &CountResult, plan: &TemplatePlan, output_dir: &Path) -> Result<()> {
    let partitioner = plan.partitioner();
    let subtemplates = json!({
        "subtemplates": result.subtemplate_totals.iter().enumerate().map(|(s, total)| {
            json!({
                "index": s,
                "vertex_count": partitioner.num_verts_sub(s),
                "parent": partitioner.parent(s),
                "active": partitioner.active_index(s),
                "passive": partitioner.passive_index(s),
                "mean_raw_total": total,
            })
        }).collect::<Vec<_>>()
    });

    write_json(&output_dir.join("subtemplates.json"), &subtemplates)
}

fn save_vertex_counts(counts: &[(u32, f64)], output_dir: &Path) -> Result<()> {
    let vertices = json!({
        "vertices": counts.iter().map(|&(vertex, count)| {
            json!({ "vertex": vertex, "count": count })
        }).collect::<Vec<_>>()
    });
    write_json(&output_dir.join("vertex_counts.json"), &vertices)
}
