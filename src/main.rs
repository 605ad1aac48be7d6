use clap::Parser;
use log::{LevelFilter, info, warn};
use rust_python_gstar::gstar::Gstar;
use rust_python_gstar::io::{create_log_writer, read_newick_lines, write_support_tsv};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Estimate a species tree from gene trees with STAR + Neighbor-Joining and
/// report how often each topology wins under re-weighted branch lengths.
#[derive(Parser, Debug)]
#[command(name = "gstar", version, about = "STAR species tree support from gene trees")]
struct Args {
    /// File with one Newick gene tree per line (.gz accepted)
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Outgroup leaf used to root every species tree
    #[arg(short = 'g', long = "outgroup")]
    outgroup: Option<String>,

    /// Number of random (Dirichlet) schedules; 0 runs the exhaustive 0/1 sweep
    #[arg(short = 't', long = "trials", default_value_t = 0)]
    trials: usize,

    /// Per-trial schedule log (.gz compresses)
    #[arg(short = 'l', long = "schedule-log", default_value = "schedule.log")]
    schedule_log: PathBuf,

    /// Optional TSV output of topology support
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Hide topologies with support below this value in the printed table
    #[arg(long = "threshold", default_value_t = 0.0)]
    threshold: f64,

    /// Seed for random schedules
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Number of worker threads (defaults to all cores)
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Quiet mode: suppresses progress messages
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.quiet { LevelFilter::Warn } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Some(threads) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global() {
            warn!("Could not configure {threads} threads: {e}");
        }
    }

    // Read trees
    let t0 = Instant::now();
    let newicks = match read_newick_lines(&args.input) {
        Ok(lines) => lines,
        Err(e) => {
            eprintln!("Failed to read {:?}: {e}", args.input);
            std::process::exit(2);
        }
    };
    if newicks.is_empty() {
        eprintln!("No trees found in {:?}.", args.input);
        std::process::exit(2);
    }
    let read_s = t0.elapsed().as_secs_f64();
    info!("Reading in {} trees {read_s:.3}s", newicks.len());

    let t1 = Instant::now();
    let mut run = match Gstar::from_newick(&newicks, args.outgroup.as_deref()) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Failed to prepare gene trees: {e}");
            std::process::exit(3);
        }
    };
    if let Some(seed) = args.seed {
        run = run.with_seed(seed);
    }
    info!(
        "{} taxa, {} levels, outgroup '{}'",
        run.star().label_map().len(),
        run.levels(),
        run.outgroup()
    );

    let mut log = match create_log_writer(&args.schedule_log) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Failed to open schedule log {:?}: {e}", args.schedule_log);
            std::process::exit(4);
        }
    };
    if let Err(e) = writeln!(log, "# outgroup: {}", run.outgroup()) {
        eprintln!("Failed to write schedule log {:?}: {e}", args.schedule_log);
        std::process::exit(4);
    }

    let support = match run.run(args.trials, &mut log) {
        Ok(support) => support,
        Err(e) => {
            eprintln!("GSTAR failed: {e}");
            std::process::exit(3);
        }
    };
    drop(log);
    let comp_s = t1.elapsed().as_secs_f64();
    info!("Evaluated {} schedules {comp_s:.3}s", support.trials());

    let (kept, suppressed) = support.split_at(args.threshold);
    for (topology, ratio) in kept {
        println!("{ratio:.6}\t{topology}");
    }
    if suppressed > 0.0 {
        println!("suppressed\t{suppressed:.6}");
    }
    println!("perplexity\t{:.6}", support.perplexity());

    if let Some(output) = &args.output {
        let t2 = Instant::now();
        if let Err(e) = write_support_tsv(output, &support) {
            eprintln!("Failed to write output {output:?}: {e}");
            std::process::exit(4);
        }
        let write_s = t2.elapsed().as_secs_f64();
        info!("Writing to output {write_s:.3}s");
    }
}
