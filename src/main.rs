use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use subgraph_counter::config::Config;
use subgraph_counter::counting::TemplatePlan;
use subgraph_counter::data::{read_adjacency_files, read_assignment_file, read_edge_list_graph, read_template};
use subgraph_counter::distributed::{run_with_assignment, MapperAssignment};
use subgraph_counter::storage;

#[derive(Parser, Debug)]
#[clap(
    name = "subgraph-counter",
    about = "Color-coding estimation of tree-template occurrences in large graphs"
)]
struct Cli {
    /// Template file (vertex count, edge count, then `src dst` lines)
    #[clap(long)]
    template: PathBuf,

    /// Big graph in the template's edge-list format
    #[clap(long, conflicts_with = "adjacency")]
    graph: Option<PathBuf>,

    /// Big graph as adjacency shards (`vertex nbr,nbr,...` lines)
    #[clap(long, num_args = 1..)]
    adjacency: Vec<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[clap(long)]
    config: Option<PathBuf>,

    /// Vertex-to-mapper assignment file (`vertex mapper` lines); modulo when absent
    #[clap(long)]
    assignment: Option<PathBuf>,

    /// Number of colors (defaults to the template size)
    #[clap(long)]
    colors: Option<usize>,

    /// Number of coloring iterations
    #[clap(long)]
    iterations: Option<usize>,

    /// Number of in-process mappers
    #[clap(long)]
    mappers: Option<usize>,

    /// Maximum update triples per message
    #[clap(long)]
    send_limit: Option<usize>,

    /// Ship update buffers in rotated order as they are built
    #[clap(long)]
    rotation: bool,

    /// Seed for reproducible colorings
    #[clap(long)]
    seed: Option<u64>,

    /// Keep the raw colorful count instead of dividing by automorphisms
    #[clap(long)]
    no_automorphism: bool,

    /// Also write per-vertex counts
    #[clap(long)]
    vertex_counts: bool,

    /// Output directory for results
    #[clap(long, default_value = "count_results")]
    output_dir: PathBuf,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long)]
    threads: Option<usize>,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if self.colors.is_some() {
            config.num_colors = self.colors;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(mappers) = self.mappers {
            config.mapper_num = mappers;
        }
        if let Some(limit) = self.send_limit {
            config.send_array_limit = limit;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.rotation_pipeline |= self.rotation;
        config.vertex_counts |= self.vertex_counts;
        if self.no_automorphism {
            config.calculate_automorphism = false;
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Cli::parse();

    // Configure logging
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };
    args.apply_to(&mut config);

    // Set number of threads
    let num_threads = if config.threads > 0 {
        config.threads
    } else {
        // If threads = 0, use all available cores
        num_cpus::get()
    };

    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    // 1. Load template and big graph
    let template = read_template(&args.template)?;
    let graph = match (&args.graph, args.adjacency.is_empty()) {
        (Some(path), _) => read_edge_list_graph(path)?,
        (None, false) => read_adjacency_files(&args.adjacency)?,
        (None, true) => bail!("either --graph or --adjacency is required"),
    };

    // 2. Precompute the template plan
    let num_colors = config.validate(template.num_vertices())?;
    let plan = TemplatePlan::new(&template, num_colors)?;

    // 3. Assign vertices to mappers
    let assignment = match &args.assignment {
        Some(path) => read_assignment_file(path, config.mapper_num)?,
        None => MapperAssignment::modulo(config.mapper_num)?,
    };

    // 4. Count
    let result = run_with_assignment(&graph, &plan, &assignment, &config)?;

    // 5. Save results
    storage::save_results(&result, &plan, &graph, &args.output_dir)?;

    log::info!(
        "Estimated {:.3} occurrences. Results saved to {}",
        result.estimate,
        args.output_dir.display()
    );

    Ok(())
}
