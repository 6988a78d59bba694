use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use streamdbg_lib::parse::{parse_paired_sequences, parse_sequences, split_valid_fragments};
use streamdbg_lib::{
    validate_against_rebuild, write_graph, CompactorConfig, DynCompactor, GraphFormat, Report, StoreKind,
    TraversalState,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "streamdbg")]
#[command(version = "0.1.0")]
#[command(about = "Streaming compact de Bruijn graph construction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand that builds a graph from reads
#[derive(clap::Args)]
struct InputArgs {
    /// Input FASTA/FASTQ files (may be gzipped), streamed in order
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<String>,

    /// Treat inputs as consecutive R1/R2 pairs read in lockstep
    #[arg(long, default_value = "false")]
    paired: bool,

    /// K-mer length
    #[arg(short, long, default_value = "31")]
    k: usize,

    /// Keep both strands apart instead of merging a k-mer with its reverse complement
    #[arg(long, default_value = "false")]
    forward: bool,

    /// K-mer store (exact|counting)
    #[arg(short, long, default_value = "exact")]
    store: String,

    /// Number of threads for read-only analyses (0 = all available cores)
    #[arg(short = 't', long, default_value = "0")]
    threads: usize,

    /// Sequences between periodic reports (0 = never)
    #[arg(long, default_value = "10000")]
    report_interval: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream sequences into a compact de Bruijn graph
    Build {
        #[command(flatten)]
        inputs: InputArgs,

        /// Graph output file
        #[arg(short, long)]
        output: Option<String>,

        /// Graph output format (gfa1|gfa2|fasta|graphml|edgelist|gml)
        #[arg(short, long, default_value = "gfa1")]
        format: String,

        /// Append a JSON report line every report interval (and once at the end)
        #[arg(long)]
        report_json: Option<String>,

        /// Run component analysis with this many sampled roots (0 = exhaustive)
        #[arg(long)]
        components: Option<usize>,

        /// Compare the final graph against a from-scratch rebuild
        #[arg(long, default_value = "false")]
        validate: bool,
    },

    /// Build a graph, then assemble the unitigs through the given seed k-mers
    Assemble {
        #[command(flatten)]
        inputs: InputArgs,

        /// Seed k-mers
        #[arg(long = "seed", required = true, num_args = 1..)]
        seeds: Vec<String>,
    },

    /// Build a graph, then list the decision k-mers of query sequences
    Decisions {
        #[command(flatten)]
        inputs: InputArgs,

        /// Query FASTA/FASTQ file
        #[arg(short, long)]
        query: String,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing: use RUST_LOG if set, otherwise default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build { inputs, output, format, report_json, components, validate } => {
            build_command(inputs, output, format, report_json, components, validate)?;
        }
        Commands::Assemble { inputs, seeds } => {
            assemble_command(inputs, seeds)?;
        }
        Commands::Decisions { inputs, query } => {
            decisions_command(inputs, query)?;
        }
    }

    Ok(())
}

fn make_compactor(args: &InputArgs, components: Option<usize>) -> anyhow::Result<DynCompactor> {
    let mut config = CompactorConfig::new(args.k).map_err(|e| anyhow::anyhow!("{}", e))?;
    config.canonical = !args.forward;
    config.store = args.store.parse::<StoreKind>().map_err(|e| anyhow::anyhow!("{}", e))?;
    config.num_threads = args.threads;
    config.report_interval = args.report_interval;
    config.verbose = args.verbose;
    if let Some(n) = components {
        config.component_sample_size = n;
    }
    Ok(DynCompactor::new(config)?)
}

/// Stream every input into `compactor`, calling `on_update` after each
/// applied fragment
fn ingest<F>(compactor: &mut DynCompactor, args: &InputArgs, mut on_update: F) -> anyhow::Result<()>
where
    F: FnMut(&DynCompactor) -> anyhow::Result<()>,
{
    let k = compactor.k();
    let mut n_records: u64 = 0;
    let mut n_fragments: u64 = 0;

    let mut feed = |_name: &[u8], seq: &[u8]| -> anyhow::Result<()> {
        n_records += 1;
        for (_, fragment) in split_valid_fragments(seq, k) {
            compactor.update(fragment)?;
            n_fragments += 1;
            on_update(compactor)?;
        }
        Ok(())
    };

    if args.paired {
        if args.input.len() % 2 != 0 {
            bail!("--paired needs an even number of inputs, got {}", args.input.len());
        }
        for pair in args.input.chunks(2) {
            info!("Reading pair {} / {}", pair[0], pair[1]);
            parse_paired_sequences(&pair[0], &pair[1], &mut feed)?;
        }
    } else {
        for path in &args.input {
            info!("Reading {}", path);
            parse_sequences(path, &mut feed)?;
        }
    }

    info!("  Read {} records ({} valid fragments)", n_records, n_fragments);
    Ok(())
}

/// Build a cDBG from FASTA/FASTQ input
fn build_command(
    inputs: InputArgs,
    output: Option<String>,
    format: String,
    report_json: Option<String>,
    components: Option<usize>,
    validate: bool,
) -> anyhow::Result<()> {
    let format: GraphFormat = format.parse().map_err(|e| anyhow::anyhow!("{}", e))?;

    info!("Building compact de Bruijn graph...");
    info!("  Inputs: {:?}", inputs.input);
    info!("  k: {}", inputs.k);
    info!("  Canonical: {}", !inputs.forward);
    info!("  Store: {}", inputs.store);

    let mut compactor = make_compactor(&inputs, components)?;

    let mut json_out = match &report_json {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create report file: {}", path))?,
        )),
        None => None,
    };
    let interval = inputs.report_interval;

    let start = std::time::Instant::now();
    ingest(&mut compactor, &inputs, |c| {
        let report = c.report();
        if let Some(out) = json_out.as_mut() {
            if interval > 0 && report.n_updates % interval == 0 {
                writeln!(out, "{}", report.to_json()?)?;
            }
        }
        Ok(())
    })?;
    info!("Graph built in {:.2}s", start.elapsed().as_secs_f64());

    let report = Report::from_compactor(&compactor);
    if let Some(mut out) = json_out {
        writeln!(out, "{}", report.to_json()?)?;
        out.flush()?;
    }
    report.log();
    println!("{}", report);

    if let Some(path) = output {
        info!("Writing {} graph to {}...", format, path);
        let file = File::create(&path).with_context(|| format!("Failed to create output file: {}", path))?;
        let mut writer = BufWriter::new(file);
        write_graph(&compactor, format, &mut writer)?;
        writer.flush()?;
    }

    if components.is_some() {
        info!("Finding connected components...");
        let summary = compactor.find_connected_components()?;
        println!("components = {}", summary.n_components);
        println!("  roots explored = {} (sampled: {})", summary.n_roots, summary.sampled);
        println!("  size: max = {} min = {} mean = {:.2}", summary.max_size, summary.min_size, summary.mean_size);
        debug!("component summary: {}", serde_json::to_string(&summary)?);
    }

    if validate {
        info!("Validating against a full rebuild...");
        let outcome = validate_against_rebuild(&compactor)?;
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        if !outcome.is_consistent() {
            bail!("incremental graph differs from the rebuild");
        }
        println!("✓ VALIDATION PASSED");
    }

    Ok(())
}

/// Assemble the unitigs through each seed k-mer
fn assemble_command(inputs: InputArgs, seeds: Vec<String>) -> anyhow::Result<()> {
    let mut compactor = make_compactor(&inputs, None)?;
    ingest(&mut compactor, &inputs, |_| Ok(()))?;
    let k = compactor.k();

    let mut walker = compactor.walker();
    for (i, seed) in seeds.iter().enumerate() {
        if seed.len() != k {
            warn!("Skipping seed {} of length {} (k = {})", seed, seed.len(), k);
            continue;
        }
        let seed = seed.to_ascii_uppercase();
        let walk = walker.walk(seed.as_bytes())?;
        if walk.right.end_state == TraversalState::BadSeed {
            warn!("Seed {} is not in the graph", seed);
            continue;
        }
        let sequence = String::from_utf8(walk.glue())?;
        println!(
            ">walk_{} seed={} left={:?} right={:?} len={}",
            i,
            seed,
            walk.left.end_state,
            walk.right.end_state,
            sequence.len()
        );
        println!("{}", sequence);
    }

    Ok(())
}

/// List the decision k-mers of every query record
fn decisions_command(inputs: InputArgs, query: String) -> anyhow::Result<()> {
    let mut compactor = make_compactor(&inputs, None)?;
    ingest(&mut compactor, &inputs, |_| Ok(()))?;
    let k = compactor.k();

    info!("Scanning queries in {}...", query);
    let mut n_decisions = 0usize;
    parse_sequences(&query, |name, seq| {
        let name = String::from_utf8_lossy(name);
        for (offset, fragment) in split_valid_fragments(seq, k) {
            for (pos, _hash) in compactor.find_decision_kmers(fragment)? {
                let kmer = String::from_utf8_lossy(&fragment[pos..pos + k]);
                println!("{}\t{}\t{}", name, offset + pos, kmer);
                n_decisions += 1;
            }
        }
        Ok(())
    })?;
    info!("  Found {} decision k-mers", n_decisions);

    Ok(())
}
