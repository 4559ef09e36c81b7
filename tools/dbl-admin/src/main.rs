//! DBL-Admin: build, query and maintain domain filter files.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use dbl_admin::commands;
use dbl_telemetry::{init_logging, TelemetryConfig};

/// DBL-Admin: domain blacklist maintenance tool
#[derive(Parser, Debug)]
#[command(name = "dbl-admin")]
#[command(about = "Build, query and maintain domain filter files")]
struct Args {
    /// Log level filter, overrides DBL_LOG_LEVEL
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a bucketed string file (and optionally its bloom file) from a
    /// newline-delimited domain list
    BuildString {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        id: i32,
        #[arg(long, default_value = "list")]
        name: String,
        /// Also write a bloom file
        #[arg(long)]
        bloom: Option<PathBuf>,
        #[arg(long, default_value = "0.001")]
        fpp: f64,
    },

    /// Build a bucketed digest file from domains or hex digests
    BuildHash {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        id: i32,
        #[arg(long, default_value = "list")]
        name: String,
        #[arg(long, value_enum, default_value = "md5")]
        algorithm: Algorithm,
        /// Input lines are hex digests rather than domains
        #[arg(long)]
        prehashed: bool,
        #[arg(long)]
        bloom: Option<PathBuf>,
        #[arg(long, default_value = "0.001")]
        fpp: f64,
    },

    /// Look domains up in a filter file
    Query {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value = "string")]
        format: Format,
        /// Bloom file to put in front of the filter
        #[arg(long)]
        bloom: Option<PathBuf>,
        /// Also match parent domains
        #[arg(long)]
        hostname: bool,
        domains: Vec<String>,
    },

    /// Inspect or maintain a filter cache
    Cache {
        #[arg(short, long)]
        dir: PathBuf,
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Run one update cycle from a JSON array of list descriptions
    Update {
        #[arg(short, long)]
        dir: PathBuf,
        #[arg(short, long)]
        sources: PathBuf,
        #[arg(long, default_value = "0.001")]
        fpp: f64,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Print the index as JSON
    List,
    /// Delete files of artifacts marked as deleted
    Sweep,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Algorithm {
    Md5,
    Sha1,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    String,
    HashMd5,
    HashSha1,
}

impl From<Algorithm> for shared_types::HashAlgorithm {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::Md5 => shared_types::HashAlgorithm::Md5,
            Algorithm::Sha1 => shared_types::HashAlgorithm::Sha1,
        }
    }
}

impl From<Format> for shared_types::FilterFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::String => shared_types::FilterFormat::String,
            Format::HashMd5 => shared_types::FilterFormat::HashMd5,
            Format::HashSha1 => shared_types::FilterFormat::HashSha1,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    if let Some(level) = args.log_level {
        telemetry = telemetry.with_log_level(level);
    }
    init_logging(&telemetry)?;

    match args.command {
        Command::BuildString {
            input,
            output,
            id,
            name,
            bloom,
            fpp,
        } => commands::build_string(&input, &output, id, &name, bloom.as_deref(), fpp),
        Command::BuildHash {
            input,
            output,
            id,
            name,
            algorithm,
            prehashed,
            bloom,
            fpp,
        } => commands::build_hash(
            &input,
            &output,
            id,
            &name,
            algorithm.into(),
            prehashed,
            bloom.as_deref(),
            fpp,
        ),
        Command::Query {
            file,
            format,
            bloom,
            hostname,
            domains,
        } => {
            let filter = commands::open_filter(&file, format.into(), bloom.as_deref(), hostname)?;
            for line in commands::query(filter.as_ref(), &domains) {
                println!("{line}");
            }
            Ok(())
        }
        Command::Cache { dir, action } => match action {
            CacheAction::List => {
                println!("{}", commands::cache_index_json(&dir)?);
                Ok(())
            }
            CacheAction::Sweep => {
                let removed = commands::cache_sweep(&dir)?;
                println!("removed {} artifact(s)", removed.len());
                Ok(())
            }
        },
        Command::Update { dir, sources, fpp } => {
            let summary = commands::update(&dir, &sources, fpp).await?;
            println!(
                "imported {} failed {} removed {} skipped {}",
                summary.imported.len(),
                summary.failed.len(),
                summary.removed.len(),
                summary.skipped.len()
            );
            Ok(())
        }
    }
}
