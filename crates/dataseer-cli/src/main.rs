//! DataSeer CLI - Command-line interface
//!
//! Usage:
//!   dataseer annotate <tei>... [-o <dir>]
//!   dataseer classify <sentence>...
//!   dataseer features <tei>
//!   dataseer config

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dataseer_client::Services;
use dataseer_core::{AppConfig, Document, LoggingConfig};
use dataseer_extractor::{ClassificationCascade, DatasetPipeline, SectionRelevanceFilter};
use dataseer_parser::TeiParser;

#[derive(Parser)]
#[command(name = "dataseer")]
#[command(about = "Dataset-mention detection for scholarly documents")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables take precedence)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate TEI documents with dataset mentions
    Annotate {
        /// TEI XML files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for the annotated JSON documents (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Documents processed concurrently
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Run the classification cascade on sentences and print the report
    Classify {
        #[arg(required = true)]
        sentences: Vec<String>,
    },
    /// Print the relevance model input for a TEI document
    Features {
        input: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dataseer={0},dataseer_parser={0},dataseer_extractor={0},dataseer_client={0}",
            logging.level
        ))
    });

    // logs go to stderr, stdout carries results
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Read every input, logging the ones that fail
///
/// Returns the parsed documents with their paths and the failure count.
fn read_inputs(parser: &TeiParser, inputs: &[PathBuf]) -> (Vec<(PathBuf, Document)>, usize) {
    let mut docs = Vec::with_capacity(inputs.len());
    let mut failures = 0;
    for input in inputs {
        match parser.parse_file(input) {
            Ok(doc) => docs.push((input.clone(), doc)),
            Err(e) => {
                error!(input = %input.display(), error = %e, "failed to read document");
                failures += 1;
            }
        }
    }
    (docs, failures)
}

fn cascade(services: &Services) -> ClassificationCascade {
    let cascade = ClassificationCascade::new(services.binary(), services.first_level())
        .with_max_batch_size(services.max_batch_size());
    match services.reuse() {
        Some(reuse) => cascade.with_reuse(reuse),
        None => cascade,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging);

    match cli.command {
        Commands::Annotate {
            inputs,
            output,
            concurrency,
        } => {
            let services = Services::init(&config.services)?;
            let pipeline = DatasetPipeline::from_config(
                &config.pipeline,
                cascade(&services),
                SectionRelevanceFilter::new(services.labeler()),
            );

            let (readable, mut failures) = read_inputs(&TeiParser::new(), &inputs);
            let (paths, docs): (Vec<PathBuf>, Vec<Document>) = readable.into_iter().unzip();

            if let Some(dir) = &output {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
            }

            let results = pipeline.process_many(docs, concurrency).await;
            for (input, result) in paths.iter().zip(results) {
                let doc = match result {
                    Ok(doc) => doc,
                    Err(e) => {
                        error!(input = %input.display(), error = %e, "annotation failed");
                        failures += 1;
                        continue;
                    }
                };
                let json = serde_json::to_string_pretty(&doc)?;
                match &output {
                    Some(dir) => {
                        let stem = input
                            .file_stem()
                            .map(|s| s.to_string_lossy().into_owned())
                            .unwrap_or_else(|| doc.id.to_string());
                        let path = dir.join(format!("{stem}.json"));
                        std::fs::write(&path, json)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        info!(
                            input = %input.display(),
                            output = %path.display(),
                            mentions = doc.data_instances().len(),
                            "annotated document written"
                        );
                    }
                    None => println!("{json}"),
                }
            }

            services.shutdown();
            if failures > 0 {
                anyhow::bail!("{failures} of {} documents failed", inputs.len());
            }
        }
        Commands::Classify { sentences } => {
            let services = Services::init_unchecked(&config.services);
            let report = cascade(&services).report(&sentences).await;
            println!("{}", report.to_json()?);
            services.shutdown();
        }
        Commands::Features { input } => {
            let services = Services::init_unchecked(&config.services);
            let pipeline = DatasetPipeline::from_config(
                &config.pipeline,
                cascade(&services),
                SectionRelevanceFilter::new(services.labeler()),
            );
            let doc = TeiParser::new()
                .parse_file(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let stream = pipeline.features(doc).await?;
            print!("{}", stream.text);
            services.shutdown();
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
