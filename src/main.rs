use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use groovdb_api::config::config;
use groovdb_api::fingerprint::{Fingerprint, FingerprintIndex, LigifyIndex, FINGERPRINT_NBITS};
use groovdb_api::merge::merge_sensor_records;
use groovdb_api::models::CategoryRecord;
use groovdb_api::services::OperonService;

#[derive(Parser)]
#[command(name = "groovdb")]
#[command(about = "GroovDB backend tooling - record merging, ligand search, operon lookup")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Merge a JSON array of category records into a sensor view")]
    Merge {
        #[arg(help = "Path to a JSON array of category records")]
        input: PathBuf,
    },

    #[command(about = "Similarity search against a fingerprint artifact")]
    Search {
        #[arg(help = "Path to fingerprints.json or fingerprints.json.gz")]
        artifact: PathBuf,

        #[arg(long, help = "Query fingerprint as a 0/1 bit string")]
        bits: String,

        #[arg(long, help = "Minimum Tanimoto similarity (default from config)")]
        threshold: Option<f64>,

        #[arg(long, help = "Maximum number of hits (default from config)")]
        max_results: Option<usize>,
    },

    #[command(about = "Similarity search against a ligify artifact")]
    LigifySearch {
        #[arg(help = "Path to ligify-fingerprints.json.gz")]
        artifact: PathBuf,

        #[arg(long, help = "Query fingerprint as a 0/1 bit string")]
        bits: String,

        #[arg(long, help = "Minimum Tanimoto similarity (default from config)")]
        threshold: Option<f64>,

        #[arg(long, help = "Maximum number of hits (default from config)")]
        max_results: Option<usize>,
    },

    #[command(about = "Fetch the operon context for a protein accession")]
    Operon {
        accession: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present so local runs pick up GROOV_* overrides.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    match Cli::parse().command {
        Commands::Merge { input } => {
            let raw = std::fs::read(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let records: Vec<CategoryRecord> =
                serde_json::from_slice(&raw).context("parsing category records")?;
            let view = merge_sensor_records(&records);
            println!("{}", serde_json::to_string_pretty(&view)?);
        }

        Commands::Search {
            artifact,
            bits,
            threshold,
            max_results,
        } => {
            let raw = std::fs::read(&artifact)
                .with_context(|| format!("reading {}", artifact.display()))?;
            let index = if artifact.extension().is_some_and(|ext| ext == "gz") {
                FingerprintIndex::from_gzip_slice(&raw)?
            } else {
                FingerprintIndex::from_json_slice(&raw)?
            };

            let query = Fingerprint::from_bit_string(bits.trim())?;
            if query.len() != FINGERPRINT_NBITS {
                tracing::warn!(
                    bits = query.len(),
                    expected = FINGERPRINT_NBITS,
                    "query width differs from the catalog fingerprint width"
                );
            }
            let defaults = &config().fingerprint;
            let matches = index.search(
                &query,
                threshold.unwrap_or(defaults.similarity_threshold),
                max_results.unwrap_or(defaults.max_results),
            );
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }

        Commands::LigifySearch {
            artifact,
            bits,
            threshold,
            max_results,
        } => {
            let raw = std::fs::read(&artifact)
                .with_context(|| format!("reading {}", artifact.display()))?;
            let index = LigifyIndex::from_gzip_slice(&raw)?;

            let query = Fingerprint::from_bit_string(bits.trim())?;
            let defaults = &config().fingerprint;
            let matches = index.search(
                &query,
                threshold.unwrap_or(defaults.similarity_threshold),
                max_results.unwrap_or(defaults.max_results),
            );
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }

        Commands::Operon { accession } => {
            let service = OperonService::new()?;
            let context = service.operon_context(&accession).await?;
            println!("{}", serde_json::to_string_pretty(&context)?);
        }
    }

    Ok(())
}
