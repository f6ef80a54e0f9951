use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use salience_io::{
    AnalysisRequest, AnalysisResponse, ExperimentName, IoError, JsonFileStore, ResultStore,
    ValidationVerdict,
};
use salience_mda::{Analyzer, Dataset};

#[derive(Parser)]
#[command(name = "salience")]
#[command(about = "Significance-aware permutation importance for survey driver analysis")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Rank the drivers of every target in a request and store the response
    Analyze {
        /// Path to the JSON analysis request
        #[arg(long)]
        request: PathBuf,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: ExperimentName,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// RNG seed; overrides the request's options.seed
        #[arg(long)]
        seed: Option<u64>,

        /// Abort the analysis after this many seconds
        #[arg(long)]
        time_limit_secs: Option<f64>,
    },

    /// Check a request without training anything
    Validate {
        /// Path to the JSON analysis request
        #[arg(long)]
        request: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TargetLine {
    name: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_score: Option<f64>,
    top_features: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOutput {
    experiment: String,
    output: PathBuf,
    total_targets: usize,
    successful_targets: usize,
    failed_targets: usize,
    train_samples: usize,
    test_samples: usize,
    targets: Vec<TargetLine>,
    universal_predictors: Vec<String>,
}

fn summarize(experiment: String, output: PathBuf, response: &AnalysisResponse) -> AnalyzeOutput {
    let targets = response
        .targets
        .iter()
        .map(|(name, t)| TargetLine {
            name: name.clone(),
            status: t.status,
            test_score: t.model_performance.as_ref().map(|p| p.test_score),
            top_features: t
                .feature_importance
                .as_ref()
                .map(|fi| {
                    fi.reported
                        .significant
                        .iter()
                        .map(|r| r.feature.clone())
                        .collect()
                })
                .unwrap_or_default(),
            note: t.note.clone(),
        })
        .collect();

    AnalyzeOutput {
        experiment,
        output,
        total_targets: response.summary.total_targets,
        successful_targets: response.summary.successful_targets,
        failed_targets: response.summary.failed_targets,
        train_samples: response.summary.train_samples,
        test_samples: response.summary.test_samples,
        targets,
        universal_predictors: response
            .cross_target_insights
            .universal_predictors
            .iter()
            .map(|u| u.feature.clone())
            .collect(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Analyze {
            request,
            experiment,
            output_dir,
            seed,
            time_limit_secs,
        } => {
            let inputs = AnalysisRequest::from_path(&request)
                .context("failed to read analysis request")?
                .into_inputs()?;
            info!(
                n_samples = inputs.matrix.n_samples(),
                n_targets = inputs.targets.len(),
                "request loaded"
            );

            let mut config = inputs.config;
            if let Some(seed) = seed {
                config = config.with_seed(seed);
            }
            if let Some(secs) = time_limit_secs {
                let limit = Duration::try_from_secs_f64(secs)
                    .with_context(|| format!("invalid --time-limit-secs {secs}"))?;
                config = config.with_time_limit(Some(limit));
            }

            let report = Analyzer::new(config)
                .analyze(inputs.matrix, inputs.metadata, inputs.targets)
                .context("analysis failed")?;
            let response = AnalysisResponse::from(report);

            let store = JsonFileStore::new(&output_dir)?;
            store.save(&experiment, &response)?;

            let output = summarize(experiment.to_string(), store.path_for(&experiment), &response);
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Validate { request } => {
            let parsed = AnalysisRequest::from_path(&request)
                .context("failed to read analysis request")?
                .into_inputs();
            let checked = match parsed {
                Ok(inputs) => inputs.config.validate().and_then(|()| {
                    Dataset::new(inputs.matrix, inputs.metadata, inputs.targets)
                }),
                Err(IoError::InvalidOptions { source }) => Err(source),
                Err(other) => return Err(other.into()),
            };
            let verdict = match checked {
                Ok(dataset) => ValidationVerdict::accepted(&dataset),
                Err(e) => ValidationVerdict::rejected(&e),
            };
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            if !verdict.valid {
                bail!("request is invalid");
            }
        }
    }

    Ok(())
}
