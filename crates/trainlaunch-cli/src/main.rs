//! Trainlaunch - training job launcher CLI
//!
//! The `trainlaunch` command resolves, validates and submits training jobs.
//!
//! ## Commands
//!
//! - `launch`: resolve hyperparameters, check artifacts, build and submit a job
//! - `check`: run the artifact gate only
//! - `metrics`: list metric patterns or test them against a captured log

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use trainlaunch_core::{
    definitions_for, scan_log, Algorithm, ArtifactOutcome, Collaborators, ComputeClass,
    ExecutionMode, JobHandle, JobRequest, LaunchError, LaunchPipeline, LaunchPlan, LaunchSettings,
    NamingPolicy, ValidationResult,
};
use trainlaunch_remote::{
    CreateTrainingJob, CreatedJob, ExecutionService, FsConfigStore, HttpExecutionService,
    HttpObjectStore, HttpRegistry, RemoteError, RemoteResult,
};

#[derive(Parser)]
#[command(name = "trainlaunch")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve, validate and submit RL training jobs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and JSON results
    #[arg(long, global = true)]
    json: bool,

    /// Settings file (TOML); `TRAINLAUNCH_*` variables override it
    #[arg(long, global = true, env = "TRAINLAUNCH_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a training job
    Launch {
        #[command(flatten)]
        request: RequestArgs,

        /// Resolve, validate and build, but do not submit
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every artifact the job depends on exists
    Check {
        #[command(flatten)]
        request: RequestArgs,
    },

    /// Inspect metric definitions
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },
}

#[derive(Subcommand)]
enum MetricsAction {
    /// Print the metric patterns attached to an algorithm's jobs
    List {
        #[arg(short, long)]
        algorithm: String,
    },

    /// Scan a captured training log for lines the patterns would pick up
    Check {
        #[arg(short, long)]
        algorithm: String,

        /// Log file to scan
        #[arg(long)]
        log: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct RequestArgs {
    /// drqn, dqn, ppo or recurrent_ppo
    #[arg(short, long)]
    algorithm: String,

    /// Total environment steps
    #[arg(long)]
    total_steps: u64,

    /// Scenario file name (default: <algorithm>_scenario.yaml)
    #[arg(long)]
    scenario: Option<String>,

    /// Instance type (default: per-algorithm policy)
    #[arg(long)]
    instance_type: Option<String>,

    /// simulation or emulation
    #[arg(long, default_value = "simulation")]
    mode: String,

    #[arg(long)]
    seed: Option<u64>,

    /// Use on-demand capacity instead of spot
    #[arg(long)]
    no_spot: bool,

    /// Training image tag (default: from settings)
    #[arg(long)]
    image_tag: Option<String>,

    /// Hyperparameter override, KEY=VALUE (repeatable)
    #[arg(short = 'H', long = "hyperparameter")]
    hyperparameters: Vec<String>,

    /// Local config directory (default: from settings)
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

impl RequestArgs {
    fn to_request(&self) -> Result<JobRequest> {
        let algorithm: Algorithm = self.algorithm.parse()?;
        let mut request = JobRequest::new(algorithm, self.total_steps)
            .with_mode(self.mode.parse::<ExecutionMode>()?);
        if let Some(scenario) = &self.scenario {
            request = request.with_scenario(scenario.as_str());
        }
        if let Some(instance_type) = &self.instance_type {
            request = request.with_compute_class(instance_type.parse::<ComputeClass>()?);
        }
        if let Some(seed) = self.seed {
            request = request.with_seed(seed);
        }
        if self.no_spot {
            request = request.without_spot();
        }
        request.image_tag = self.image_tag.clone();
        for raw in &self.hyperparameters {
            request = request.with_override(raw.as_str());
        }
        request.validate()?;
        Ok(request)
    }
}

/// Stand-in for a missing execution endpoint; planning never calls it.
struct NoExecutionEndpoint;

#[async_trait]
impl ExecutionService for NoExecutionEndpoint {
    async fn create_training_job(&self, _request: &CreateTrainingJob) -> RemoteResult<CreatedJob> {
        Err(RemoteError::Unavailable(
            "no execution endpoint configured ([endpoints.execution])".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    trainlaunch_core::init_tracing(cli.json, level);

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<LaunchError>() {
            Some(launch) => eprintln!("launch failed at stage '{}': {}", launch.stage(), launch),
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Launch { request, dry_run } => {
            let settings = load_settings(cli.settings.as_deref())?;
            let pipeline = build_pipeline(settings, request.config_dir.as_deref(), !dry_run)?;
            cmd_launch(&pipeline, &request.to_request()?, dry_run, cli.json).await
        }
        Commands::Check { request } => {
            let settings = load_settings(cli.settings.as_deref())?;
            let pipeline = build_pipeline(settings, request.config_dir.as_deref(), false)?;
            cmd_check(&pipeline, &request.to_request()?, cli.json).await
        }
        Commands::Metrics { action } => match action {
            MetricsAction::List { algorithm } => cmd_metrics_list(&algorithm, cli.json),
            MetricsAction::Check { algorithm, log } => {
                cmd_metrics_check(&algorithm, &log, cli.json)
            }
        },
    }
}

fn load_settings(path: Option<&Path>) -> Result<LaunchSettings> {
    Ok(LaunchSettings::load(path)?)
}

/// Wire HTTP clients and the local config store from settings.
fn build_pipeline(
    settings: LaunchSettings,
    config_dir: Option<&Path>,
    submitting: bool,
) -> Result<LaunchPipeline> {
    let endpoints = &settings.endpoints;
    let registry = endpoints
        .registry
        .clone()
        .ok_or_else(|| anyhow!("no registry endpoint configured ([endpoints.registry])"))?;
    let object_store = endpoints
        .object_store
        .clone()
        .ok_or_else(|| anyhow!("no object store endpoint configured ([endpoints.object_store])"))?;

    let execution: Arc<dyn ExecutionService> = match endpoints.execution.clone() {
        Some(ep) => Arc::new(
            HttpExecutionService::new(ep).context("Failed to create execution service client")?,
        ),
        None if submitting => {
            bail!("no execution endpoint configured ([endpoints.execution])")
        }
        None => Arc::new(NoExecutionEndpoint),
    };

    let config_root = config_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.config_dir.clone());
    info!(config_dir = %config_root.display(), region = %settings.region, "Using settings");

    let collaborators = Collaborators {
        config_store: Arc::new(FsConfigStore::new(config_root)),
        registry: Arc::new(HttpRegistry::new(registry).context("Failed to create registry client")?),
        object_store: Arc::new(
            HttpObjectStore::new(object_store).context("Failed to create object store client")?,
        ),
        execution,
    };
    Ok(LaunchPipeline::new(settings, collaborators, NamingPolicy::system()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn outcome_marker(outcome: &ArtifactOutcome) -> &'static str {
    match outcome {
        ArtifactOutcome::Present => "ok",
        ArtifactOutcome::Absent => "MISSING",
        ArtifactOutcome::Error(_) => "ERROR",
    }
}

fn print_validation(result: &ValidationResult) {
    for (reference, outcome) in result.entries() {
        println!(
            "  [{:>7}] {:<16} {}",
            outcome_marker(outcome),
            reference.label,
            reference.location
        );
        if let ArtifactOutcome::Error(reason) = outcome {
            println!("            {}", reason);
        }
    }
}

fn print_plan(plan: &LaunchPlan) {
    let spec = &plan.spec;
    println!("Job:            {}", spec.job_name);
    println!("Algorithm:      {}", spec.algorithm);
    println!("Scenario:       {}", spec.scenario);
    println!("Mode:           {}", spec.execution_mode);
    println!("Image:          {}", spec.image_uri);
    println!(
        "Instance:       {} ({})",
        spec.compute_class,
        spec.compute_class.description()
    );
    println!(
        "Capacity:       {}",
        if spec.spot { "spot" } else { "on-demand" }
    );
    println!("Max runtime:    {}h", spec.stopping.max_runtime_secs / 3_600);
    println!("Spec digest:    {}", spec.spec_digest);
    println!();
    println!("Hyperparameters:");
    for entry in plan.hyperparameters.iter() {
        println!(
            "  {:<32} {:<12} ({})",
            entry.name,
            entry.value.to_transport(),
            format!("{:?}", entry.provenance).to_lowercase()
        );
    }
    if !spec.overflow_hyperparameters.is_empty() {
        println!(
            "  {} beyond the display limit, delivered via HYPERPARAMETERS_JSON only: {}",
            spec.overflow_hyperparameters.len(),
            spec.overflow_hyperparameters.join(", ")
        );
    }
    println!();
    println!("Outputs:");
    println!("  models:       {}", spec.outputs.uri(&spec.outputs.model_prefix));
    println!(
        "  checkpoints:  {}",
        spec.outputs.uri(&spec.outputs.checkpoint_prefix)
    );
    println!(
        "  tensorboard:  {}",
        spec.outputs.uri(&spec.outputs.tensorboard_prefix)
    );
}

fn format_handle(handle: &JobHandle) -> String {
    [
        format!("Submitted:      {}", handle.job_name),
        format!("Job id:         {}", handle.job_id),
        format!("Console:        {}", handle.console_url),
        format!("Logs:           {}", handle.logs_url),
        String::new(),
        "Outputs:".to_string(),
        format!("  models:       {}", handle.model_uri),
        format!("  checkpoints:  {}", handle.checkpoint_uri),
        format!("  tensorboard:  {}", handle.tensorboard_uri),
    ]
    .join("\n")
}

async fn cmd_launch(
    pipeline: &LaunchPipeline,
    request: &JobRequest,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    if dry_run {
        let plan = pipeline.plan(request).await?;
        if json {
            return print_json(&plan);
        }
        print_plan(&plan);
        println!();
        println!("Dry run: nothing submitted.");
        return Ok(());
    }

    let handle = pipeline.launch(request).await?;
    if json {
        print_json(&handle)
    } else {
        println!("{}", format_handle(&handle));
        Ok(())
    }
}

async fn cmd_check(pipeline: &LaunchPipeline, request: &JobRequest, json: bool) -> Result<()> {
    let result = pipeline.check(request).await?;
    if json {
        print_json(&result)?;
    } else {
        println!("Artifacts for {} ({}):", request.algorithm, request.scenario_name());
        print_validation(&result);
    }
    if !result.all_present() {
        return Err(LaunchError::ValidationFailed {
            missing: result.missing(),
        }
        .into());
    }
    Ok(())
}

fn cmd_metrics_list(algorithm: &str, json: bool) -> Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    let definitions = definitions_for(algorithm);
    if json {
        return print_json(&definitions);
    }
    for def in &definitions {
        println!("{:<18} {}", def.name, def.regex);
    }
    Ok(())
}

fn cmd_metrics_check(algorithm: &str, log: &Path, json: bool) -> Result<()> {
    let algorithm: Algorithm = algorithm.parse()?;
    let content = std::fs::read_to_string(log)
        .with_context(|| format!("Failed to read log file {}", log.display()))?;
    let coverage = scan_log(&definitions_for(algorithm), &content)?;

    if json {
        print_json(&coverage)?;
    } else {
        for c in &coverage {
            match &c.last_value {
                Some(v) => println!("  {:<18} {:>6} matches, last {}", c.name, c.matches, v),
                None => println!("  {:<18} {:>6} matches", c.name, c.matches),
            }
        }
    }

    let covered = coverage.iter().filter(|c| c.is_covered()).count();
    if covered == 0 {
        bail!(
            "no metric pattern matched {}; every metric history would be empty",
            log.display()
        );
    }
    if covered < coverage.len() {
        tracing::warn!(
            covered = covered,
            total = coverage.len(),
            "Some metric patterns matched nothing"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trainlaunch_core::LaunchStage;
    use trainlaunch_remote::fakes::{
        MemoryConfigStore, MemoryExecutionService, MemoryObjectStore, MemoryRegistry,
    };

    const REPO: &str = "registry.local/rl/training";

    fn request_args(extra: &[&str]) -> RequestArgs {
        let mut argv = vec!["trainlaunch", "check", "--algorithm", "drqn", "--total-steps", "1000"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Check { request } => request,
            _ => panic!("expected check"),
        }
    }

    fn fake_pipeline(execution: Arc<MemoryExecutionService>, publish: bool) -> LaunchPipeline {
        let registry = Arc::new(MemoryRegistry::new());
        let objects = Arc::new(MemoryObjectStore::new());
        if publish {
            registry.push_image(REPO, "latest");
            objects.put_object("artifacts", "configs/algorithms/drqn.yaml");
            objects.put_object("artifacts", "configs/environments/scenarios/drqn_scenario.yaml");
        }
        let config = MemoryConfigStore::new()
            .with_algorithm("drqn", "hyperparameters:\n  learning_rate: 0.0001\n");
        LaunchPipeline::new(
            LaunchSettings::new("artifacts", REPO, "role"),
            Collaborators {
                config_store: Arc::new(config),
                registry,
                object_store: objects,
                execution,
            },
            NamingPolicy::system(),
        )
    }

    #[test]
    fn test_request_args_defaults() {
        let req = request_args(&[]).to_request().unwrap();
        assert_eq!(req.algorithm, Algorithm::Drqn);
        assert_eq!(req.total_steps, 1000);
        assert_eq!(req.execution_mode, ExecutionMode::Simulation);
        assert!(req.spot);
        assert!(req.overrides.is_empty());
    }

    #[test]
    fn test_request_args_full() {
        let req = request_args(&[
            "--scenario",
            "maze.yaml",
            "--instance-type",
            "ml.g5.xlarge",
            "--mode",
            "aws",
            "--seed",
            "9",
            "--no-spot",
            "-H",
            "learning_rate=0.00005",
            "--hyperparameter",
            "gamma=0.95",
        ])
        .to_request()
        .unwrap();
        assert_eq!(req.scenario.as_deref(), Some("maze.yaml"));
        assert_eq!(req.compute_class, Some(ComputeClass::G5Xlarge));
        assert_eq!(req.execution_mode, ExecutionMode::Emulation);
        assert_eq!(req.seed, Some(9));
        assert!(!req.spot);
        assert_eq!(req.overrides, vec!["learning_rate=0.00005", "gamma=0.95"]);
    }

    #[test]
    fn test_request_args_rejects_bad_values() {
        let err = request_args(&["--mode", "cloud"]).to_request().unwrap_err();
        assert!(err.downcast_ref::<LaunchError>().is_some());

        let err = request_args(&["-H", "learning_rate"]).to_request().unwrap_err();
        let launch = err.downcast_ref::<LaunchError>().unwrap();
        assert_eq!(launch.stage(), LaunchStage::Request);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let mut args = request_args(&[]);
        args.algorithm = "a2c".to_string();
        assert!(args.to_request().is_err());
    }

    #[tokio::test]
    async fn test_dry_run_submits_nothing() {
        let execution = Arc::new(MemoryExecutionService::new());
        let pipeline = fake_pipeline(execution.clone(), true);
        let req = request_args(&[]).to_request().unwrap();

        cmd_launch(&pipeline, &req, true, false).await.unwrap();
        assert_eq!(execution.create_attempts(), 0);

        cmd_launch(&pipeline, &req, false, true).await.unwrap();
        assert_eq!(execution.created_jobs().len(), 1);
    }

    #[tokio::test]
    async fn test_launch_summary_includes_output_locations() {
        let execution = Arc::new(MemoryExecutionService::new());
        let pipeline = fake_pipeline(execution.clone(), true);
        let req = request_args(&[]).to_request().unwrap();

        let handle = pipeline.launch(&req).await.unwrap();
        let summary = format_handle(&handle);
        assert!(summary.contains(&handle.job_id));
        assert!(summary.contains(&format!(
            "s3://artifacts/models/drqn/{}/",
            handle.job_name
        )));
        assert!(summary.contains("checkpoints/drqn/"));
    }

    #[tokio::test]
    async fn test_check_fails_when_artifacts_missing() {
        let execution = Arc::new(MemoryExecutionService::new());
        let pipeline = fake_pipeline(execution.clone(), false);
        let req = request_args(&[]).to_request().unwrap();

        let err = cmd_check(&pipeline, &req, false).await.unwrap_err();
        let launch = err.downcast_ref::<LaunchError>().unwrap();
        assert_eq!(launch.missing_labels().len(), 3);
        assert_eq!(execution.create_attempts(), 0);
    }

    #[test]
    fn test_planning_without_execution_endpoint() {
        let mut settings = LaunchSettings::new("artifacts", REPO, "role");
        settings.endpoints.registry = Some(trainlaunch_remote::RemoteEndpoint::new(
            "http://127.0.0.1:9",
        ));
        settings.endpoints.object_store = Some(trainlaunch_remote::RemoteEndpoint::new(
            "http://127.0.0.1:9",
        ));
        assert!(build_pipeline(settings.clone(), None, false).is_ok());
        assert!(build_pipeline(settings, None, true).is_err());
    }

    #[test]
    fn test_metrics_check_against_log() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.log");
        std::fs::write(&good, "episode_reward: 12.5\nloss: 0.02\n").unwrap();
        assert!(cmd_metrics_check("dqn", &good, false).is_ok());

        let bad = dir.path().join("bad.log");
        std::fs::write(&bad, "EpisodeReward=12.5\n").unwrap();
        assert!(cmd_metrics_check("dqn", &bad, false).is_err());

        assert!(cmd_metrics_check("dqn", &dir.path().join("absent.log"), false).is_err());
    }

    #[test]
    fn test_metrics_list() {
        assert!(cmd_metrics_list("recurrent_ppo", true).is_ok());
        assert!(cmd_metrics_list("a2c", false).is_err());
    }
}
