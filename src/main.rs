//! `communities` — detect communities in DOT or JSON graphs, or evaluate
//! an existing membership against a quality objective.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use graph_communities::io::dot::{parse_dot, write_dot, DotGraph};
use graph_communities::io::json::{parse_json_graph, parse_membership};
use graph_communities::io::{membership_csv, sniff_format, InputFormat};
use graph_communities::{
    detect_clusters, evaluate_quality, ClusterError, InputGraph, Options, PreserveLabels,
};

#[derive(Parser)]
#[command(
    name = "communities",
    version,
    about = "Community detection for weighted graphs (Louvain/Leiden)"
)]
struct Cli {
    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Partition a graph into communities
    Detect(DetectArgs),
    /// Score an existing membership against the chosen objective
    Evaluate(EvaluateArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Input file (DOT or JSON); stdin when omitted
    #[arg(long = "in")]
    input: Option<PathBuf>,

    /// Quality objective: modularity | cpm
    #[arg(long, default_value = "modularity")]
    quality: String,

    /// Resolution parameter (γ) for CPM
    #[arg(long, default_value_t = 1.0)]
    resolution: f64,

    /// Treat the graph as directed (implied by a DOT digraph)
    #[arg(long)]
    directed: bool,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    random_seed: u64,

    /// Move-target enumeration: neighbors | all | random | random-neighbor
    #[arg(long, default_value = "neighbors")]
    candidate_strategy: String,

    /// Allow moves into a fresh singleton community
    #[arg(long)]
    allow_new_community: bool,

    /// Skip moves that would push a community's total size above this cap
    #[arg(long)]
    max_community_size: Option<f64>,

    /// Leiden refinement per level (--refine=false disables)
    #[arg(long, default_value_t = true, num_args(0..=1), default_missing_value = "true", action = ArgAction::Set)]
    refine: bool,

    /// Comma-separated node ids held immobile at the finest level
    #[arg(long, value_delimiter = ',')]
    fixed_nodes: Vec<String>,

    /// Keep community labels stable instead of renumbering by size
    #[arg(long)]
    preserve_labels: bool,

    /// Maximum number of coarsening levels
    #[arg(long, default_value_t = 50)]
    max_levels: usize,

    /// Maximum local-move passes per level
    #[arg(long, default_value_t = 20)]
    max_local_passes: usize,

    /// CPM penalty reported by quality: unit | size-aware
    #[arg(long, default_value = "unit")]
    cpm_mode: String,
}

#[derive(Args)]
struct DetectArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output format: json | csv | dot
    #[arg(long, default_value = "json")]
    out_format: String,

    /// Emit only the membership map (JSON output)
    #[arg(long)]
    membership_only: bool,

    /// Output file; stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Membership file: JSON object of nodeId → communityId
    #[arg(long)]
    membership: PathBuf,

    /// Fail when a node has no membership entry
    #[arg(long)]
    strict: bool,
}

/// Failure with a dedicated process exit code.
#[derive(Debug)]
struct CliError {
    code: i32,
    message: String,
}

impl CliError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli.command) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.code;
    }
    if let Some(cluster) = err.downcast_ref::<ClusterError>() {
        return match cluster {
            ClusterError::MissingMembership(_) => 3,
            _ => 1,
        };
    }
    1
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Detect(args) => run_detect(args),
        Command::Evaluate(args) => run_evaluate(args),
    }
}

/// Reads and parses the input graph; returns the parsed DOT document too
/// when the input was DOT, for overlay output.
fn read_graph(common: &CommonArgs) -> Result<(InputGraph, Option<DotGraph>)> {
    let content = match &common.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            buffer
        }
    };
    let format = sniff_format(common.input.as_deref(), &content)
        .ok_or_else(|| CliError::new(2, "unknown input format (expected DOT or JSON)"))?;
    match format {
        InputFormat::Json => Ok((parse_json_graph(&content)?, None)),
        InputFormat::Dot => {
            let dot = parse_dot(&content)?;
            Ok((dot.graph.clone(), Some(dot)))
        }
    }
}

fn build_options(common: &CommonArgs, dot: Option<&DotGraph>) -> Result<Options> {
    let fixed_nodes: Option<BTreeSet<String>> = if common.fixed_nodes.is_empty() {
        None
    } else {
        Some(common.fixed_nodes.iter().cloned().collect())
    };
    Ok(Options {
        quality: common.quality.parse()?,
        resolution: common.resolution,
        directed: common.directed || dot.is_some_and(|d| d.directed),
        random_seed: common.random_seed,
        candidate_strategy: common.candidate_strategy.parse()?,
        allow_new_community: common.allow_new_community,
        max_community_size: common.max_community_size,
        refine: common.refine,
        fixed_nodes,
        preserve_labels: if common.preserve_labels {
            PreserveLabels::Stable
        } else {
            PreserveLabels::Renumber
        },
        max_levels: common.max_levels,
        max_local_passes: common.max_local_passes,
        cpm_mode: common.cpm_mode.parse()?,
        ..Options::default()
    })
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let (graph, dot) = read_graph(&args.common)?;
    let options = build_options(&args.common, dot.as_ref())?;
    let clusters = detect_clusters(&graph, &options)?;

    let rendered = match args.out_format.as_str() {
        "json" => {
            let value = if args.membership_only {
                clusters.to_json()["membership"].clone()
            } else {
                clusters.to_json()
            };
            let mut text = serde_json::to_string_pretty(&value)?;
            text.push('\n');
            text
        }
        "csv" => membership_csv(&clusters),
        "dot" => {
            let dot = dot.ok_or_else(|| {
                CliError::new(5, "DOT output is only available for DOT input")
            })?;
            write_dot(&dot, |id| clusters.class_of(id))
        }
        other => {
            return Err(CliError::new(4, format!("unknown output format `{other}`")).into())
        }
    };

    match &args.out {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let (graph, dot) = read_graph(&args.common)?;
    let options = build_options(&args.common, dot.as_ref())?;
    let membership_text = fs::read_to_string(&args.membership)
        .with_context(|| format!("reading {}", args.membership.display()))?;
    let membership = parse_membership(&membership_text)?;
    let quality = evaluate_quality(&graph, &membership, &options, args.strict)?;
    println!("{quality}");
    Ok(())
}
