use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use taxoclass::classify::{classify_reads, ClassifyOpts, DriverOpts, ReportMode};
use taxoclass::index::{ClassifyIndex, Index};
use taxoclass::metrics::RunStats;

#[derive(Parser)]
#[command(name = "taxoclass")]
#[command(about = "Metagenomic read classifier over a taxon-tagged FM-index", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportModeArg {
    /// Report every voted (genus, species) pair
    All,
    /// Report only the top-scoring genera with their best species
    Top,
}

impl From<ReportModeArg> for ReportMode {
    fn from(arg: ReportModeArg) -> Self {
        match arg {
            ReportModeArg::All => ReportMode::AllSpecies,
            ReportModeArg::Top => ReportMode::TopGenus,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build a classification index from a taxon-tagged reference FASTA
    Index {
        /// Reference FASTA; each header starts with the encoded taxon id
        #[arg(value_name = "REF.FA")]
        fasta: PathBuf,

        /// Output index file (default: reference path with .tci extension)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Classify reads against a built index
    Classify {
        /// Index file built with 'index'
        #[arg(value_name = "INDEX")]
        index: PathBuf,

        /// Read file(s): one for single-end, two for paired-end
        #[arg(value_name = "READS.FQ", required = true, num_args = 1..=2)]
        reads: Vec<PathBuf>,

        /// Output TSV (default: stdout)
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Cap on materialized reference coordinates per read or pair
        #[arg(short = 'k', long, value_name = "INT", default_value = "5")]
        khits: usize,

        /// Minimum partial-hit length that may vote
        #[arg(short = 'm', long, value_name = "INT", default_value = "22")]
        min_hit_len: usize,

        /// Report mode
        #[arg(long, value_enum, default_value = "all")]
        report_mode: ReportModeArg,

        /// Base seed for the per-read RNG streams
        #[arg(long, value_name = "INT", default_value = "77")]
        seed: u64,

        /// Worker threads (0 = all cores)
        #[arg(short = 't', long, value_name = "INT", default_value = "0")]
        threads: usize,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Index { fasta, output } => {
            let start = Instant::now();
            let index = ClassifyIndex::build_from_fasta(&fasta)?;
            let out_path = output.unwrap_or_else(|| fasta.with_extension("tci"));
            index.save_to(&out_path)?;
            log::info!(
                "indexed {} references in {:.2}s -> {}",
                index.reference_count(),
                start.elapsed().as_secs_f64(),
                out_path.display()
            );
        }
        Commands::Classify {
            index,
            reads,
            output,
            khits,
            min_hit_len,
            report_mode,
            seed,
            threads,
        } => {
            if threads > 0 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()?;
            }
            let index = ClassifyIndex::load_from(&index)?;
            let opts = ClassifyOpts {
                min_hit_len,
                khits,
                report_mode: report_mode.into(),
            };
            let driver = DriverOpts { seed };

            let start = Instant::now();
            let mut out: Box<dyn Write> = match output {
                Some(p) => Box::new(BufWriter::new(File::create(p)?)),
                None => Box::new(BufWriter::new(io::stdout())),
            };
            let metrics = classify_reads(
                &index,
                &opts,
                &driver,
                &reads[0],
                reads.get(1).map(|p| p.as_path()),
                &mut out,
            )?;
            out.flush()?;

            let stats = RunStats {
                metrics,
                wall_time_secs: start.elapsed().as_secs_f64(),
            };
            log::info!("{}", stats);
        }
    }
    Ok(())
}
