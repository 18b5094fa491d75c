//! In-process execution of a whole mapper group and merging of their reports

use crate::config::Config;
use crate::counting::{Count, TemplatePlan};
use crate::distributed::routing::{CommPlan, MapperAssignment};
use crate::distributed::transport::ChannelTransport;
use crate::distributed::worker::{Worker, WorkerReport};
use crate::error::{Result, SubgraphError};
use crate::graph::Graph;
use itertools::Itertools;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::thread;

/// One mapper's share of the estimate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapperTotal {
    pub mapper_id: usize,
    pub num_vertices: usize,
    /// Mean raw root total over iterations
    pub raw_total: Count,
    /// `raw_total` normalised like the estimate
    pub estimate: Count,
}

/// Outcome of a counting run
#[derive(Debug, Clone, Serialize)]
pub struct CountResult {
    pub template_vertices: usize,
    pub num_colors: usize,
    pub automorphisms: u64,
    pub iterations: usize,

    /// Raw root total of every iteration, summed over mappers
    pub raw_totals: Vec<Count>,

    /// Normalised estimate of every iteration
    pub estimates: Vec<Count>,

    /// Mean of `estimates`
    pub estimate: Count,
    pub std_dev: Count,
    /// Root-mean-square deviation of the iteration estimates from their mean
    pub rmse: Count,

    pub mapper_totals: Vec<MapperTotal>,

    /// Mean raw total per sub-template, indexed like the partitioner
    pub subtemplate_totals: Vec<Count>,

    /// `(global id, normalised root count)`, sorted by id
    pub vertex_counts: Option<Vec<(u32, Count)>>,
}

/// Count `template` in `graph` with the mappers of `config`, vertices assigned modulo
pub fn run_local(graph: &Graph, template: &Graph, config: &Config) -> Result<CountResult> {
    let num_colors = config.validate(template.num_vertices())?;
    let plan = TemplatePlan::new(template, num_colors)?;
    let assignment = MapperAssignment::modulo(config.mapper_num)?;
    run_with_assignment(graph, &plan, &assignment, config)
}

/// Count with an explicit vertex-to-mapper assignment
pub fn run_with_assignment(
    graph: &Graph,
    plan: &TemplatePlan,
    assignment: &MapperAssignment,
    config: &Config,
) -> Result<CountResult> {
    config.validate(plan.template_size())?;
    if let Some(num_colors) = config.num_colors {
        if num_colors != plan.num_colors() {
            return Err(SubgraphError::config(format!(
                "configuration asks for {} colors, template plan was built for {}",
                num_colors,
                plan.num_colors()
            )));
        }
    }
    if graph.is_empty() || graph.num_edges() == 0 {
        return Err(SubgraphError::config("input graph has no vertices or no edges"));
    }
    if let Some((v, u)) = graph.one_way_entry() {
        return Err(SubgraphError::config(format!(
            "adjacency entry {} -> {} has no reverse; the input graph must be undirected",
            v, u
        )));
    }
    if assignment.mapper_num() != config.mapper_num {
        return Err(SubgraphError::config(format!(
            "assignment covers {} mappers, configuration asks for {}",
            assignment.mapper_num(),
            config.mapper_num
        )));
    }

    let partitions = assignment.split(graph)?;
    let transports = ChannelTransport::mesh(config.mapper_num, config.recv_timeout());

    // a caller that already sized the global pool gets it as is
    let pool = if config.threads > 0 && config.threads != rayon::current_num_threads() {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .map_err(|e| SubgraphError::Resource(format!("cannot build thread pool: {}", e)))?;
        Some(pool)
    } else {
        None
    };
    let pool = pool.as_ref();

    log::info!(
        "Counting {}-vertex template over {} vertices with {} mappers, {} iterations",
        plan.template_size(),
        graph.num_vertices(),
        config.mapper_num,
        config.iterations
    );

    let outcomes: Vec<Result<WorkerReport>> = thread::scope(|scope| {
        let handles: Vec<_> = partitions
            .iter()
            .zip(transports)
            .enumerate()
            .map(|(mapper_id, (partition, transport))| {
                scope.spawn(move || {
                    let work = || -> Result<WorkerReport> {
                        let comm = CommPlan::build(partition, assignment, mapper_id)?;
                        Worker::new(plan, partition, comm, transport, config).run()
                    };
                    match pool {
                        Some(pool) => pool.install(work),
                        None => work(),
                    }
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(SubgraphError::transport("worker thread panicked")))
            })
            .collect()
    });

    let reports = collect_reports(outcomes)?;
    let result = merge_reports(plan, config, reports);

    log::info!(
        "Estimated {:.3} copies (std dev {:.3}) over {} iterations",
        result.estimate,
        result.std_dev,
        result.iterations
    );

    Ok(result)
}

/// All reports, or the root-cause error when any mapper failed
///
/// A failing mapper aborts its peers, whose resulting transport errors are secondary.
fn collect_reports(outcomes: Vec<Result<WorkerReport>>) -> Result<Vec<WorkerReport>> {
    let mut reports = Vec::with_capacity(outcomes.len());
    let mut first_error: Option<SubgraphError> = None;

    for outcome in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => {
                let replace = match &first_error {
                    None => true,
                    Some(SubgraphError::Transport(_)) => !matches!(e, SubgraphError::Transport(_)),
                    Some(_) => false,
                };
                if replace {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(reports),
    }
}

fn merge_reports(plan: &TemplatePlan, config: &Config, reports: Vec<WorkerReport>) -> CountResult {
    let divide = config.calculate_automorphism;
    let iterations = config.iterations;

    let raw_totals: Vec<Count> = (0..iterations)
        .map(|it| reports.iter().map(|r| r.raw_totals[it]).sum())
        .collect();
    let estimates: Vec<Count> = raw_totals.iter().map(|&raw| plan.normalize(raw, divide)).collect();

    let estimate = estimates.iter().mean();
    let (std_dev, rmse) = if estimates.len() > 1 {
        (estimates.iter().std_dev(), estimates.iter().population_std_dev())
    } else {
        (0.0, 0.0)
    };

    let mapper_totals = reports
        .iter()
        .map(|r| {
            let raw_total = r.raw_totals.iter().sum::<Count>() / iterations as f64;
            MapperTotal {
                mapper_id: r.mapper_id,
                num_vertices: r.num_vertices,
                raw_total,
                estimate: plan.normalize(raw_total, divide),
            }
        })
        .collect();

    let subtemplate_totals = (0..plan.subtemplate_count())
        .map(|s| {
            reports
                .iter()
                .flat_map(|r| r.sub_totals.iter().map(move |totals| totals[s]))
                .sum::<Count>()
                / iterations as f64
        })
        .collect();

    let vertex_counts = if config.vertex_counts {
        let counts = reports
            .iter()
            .flat_map(|r| r.vertex_counts.iter().flatten())
            .map(|&(global, raw)| (global, plan.normalize(raw, divide)))
            .sorted_by_key(|&(global, _)| global)
            .collect();
        Some(counts)
    } else {
        None
    };

    CountResult {
        template_vertices: plan.template_size(),
        num_colors: plan.num_colors(),
        automorphisms: plan.automorphisms(),
        iterations,
        raw_totals,
        estimates,
        estimate,
        std_dev,
        rmse,
        mapper_totals,
        subtemplate_totals,
        vertex_counts,
    }
}
