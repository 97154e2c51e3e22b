// src/main.rs

// Command line entry point: plan, evaluate or fully run a post-recovery
// validation.

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use recovery_validator::config::{Secrets, Settings};
use recovery_validator::context::Context;
use recovery_validator::model::{AcceptanceProfile, ResourceType, ValidationRequest};
use recovery_validator::protocol::{Evaluator, Plan, ToolOutput, plan};
use recovery_validator::report::{render_plan, render_report};
use recovery_validator::tools::LlmClient;
use recovery_validator::validation::validate_plan;
use recovery_validator::ValidationAgent;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Plans and evaluates health checks on recovered VMs and databases.
#[derive(Parser)]
#[command(name = "recovery-validator")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file mapping credentials references to logins
    #[arg(long, global = true, env = "SECRETS_FILE")]
    secrets_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plan for a validation request
    Plan {
        /// Validation request (JSON)
        #[arg(long)]
        request: PathBuf,

        /// Render for humans instead of JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Evaluate recorded tool outputs and print the verdict
    Evaluate {
        /// Tool outputs (JSON array)
        #[arg(long)]
        outputs: PathBuf,

        /// Built-in profile name or profile file
        #[arg(long)]
        profile: Option<String>,

        /// Resource type, used to pick the default profile
        #[arg(long)]
        resource_type: Option<ResourceType>,

        /// Plan that produced the outputs; drives check order
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Plan, execute and evaluate in one go
    Run {
        /// Validation request (JSON)
        #[arg(long)]
        request: PathBuf,

        /// Use this plan instead of generating one
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Built-in profile name or profile file
        #[arg(long)]
        profile: Option<String>,

        /// Print the plan without executing anything
        #[arg(long)]
        dry_run: bool,

        /// Ask the LLM for a short summary of the run
        #[arg(long)]
        summarize: bool,

        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the available tools
    Tools,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("recovery_validator=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}

/// Returns whether the command succeeded; a failed verdict is `false`.
fn run(cli: Cli) -> Result<bool> {
    let mut settings = Settings::from_env().context("invalid environment settings")?;
    if let Some(path) = cli.secrets_file {
        settings.secrets_file = path;
    }

    match cli.command {
        Commands::Plan { request, pretty } => {
            let request: ValidationRequest = read_json(&request)?;
            let plan = plan(&request)?;
            if pretty {
                print!("{}", render_plan(&plan));
            } else {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
            Ok(true)
        }

        Commands::Evaluate {
            outputs,
            profile,
            resource_type,
            plan,
        } => {
            let outputs: Vec<ToolOutput> = read_json(&outputs)?;
            let profile = load_profile(profile.as_deref(), resource_type)?;
            let evaluator = Evaluator::new(&profile);
            let verdict = match plan {
                Some(path) => evaluator.evaluate_plan(&load_plan(&path)?, &outputs),
                None => evaluator.evaluate_outputs(&outputs),
            };
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            Ok(verdict.overall_pass)
        }

        Commands::Run {
            request,
            plan,
            profile,
            dry_run,
            summarize,
            json,
        } => {
            let request: ValidationRequest = read_json(&request)?;
            let resource_type = request.parsed_resource_type().map_err(anyhow::Error::msg)?;
            let reference = profile.or_else(|| request.acceptance_profile.clone());
            let profile = load_profile(reference.as_deref(), Some(resource_type))?;

            let secrets = Secrets::load(&settings.secrets_file)?;
            let mut context = Context::with_default_tools(&settings).with_secrets(secrets);
            if dry_run {
                context = context.enable_dry_run();
            }

            let mut agent = ValidationAgent::new(request, profile, context);
            if summarize {
                agent = agent.with_summarizer(LlmClient::new(
                    &settings.llm_endpoint,
                    &settings.llm_model,
                ));
            }

            let report = match plan {
                Some(path) => agent.run_plan(load_plan(&path)?),
                None => agent.run()?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", render_report(&report));
            }
            Ok(report.dry_run || report.verdict.overall_pass)
        }

        Commands::Tools => {
            let context = Context::with_default_tools(&settings);
            let mut specs: Vec<_> = context.tools.values().map(|t| (t.id(), t.spec())).collect();
            specs.sort_by_key(|(id, _)| *id);
            for (_, spec) in specs {
                println!("{} [{}]", spec.name.bold(), spec.tags.join(", "));
                println!("  {}", spec.description);
                println!("  {} {}", "args:".bright_black(), spec.input_hint);
            }
            Ok(true)
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Loads a plan file and rejects it when it fails validation.
fn load_plan(path: &Path) -> Result<Plan> {
    let plan: Plan = read_json(path)?;
    let errors = validate_plan(&plan);
    if errors.is_empty() {
        return Ok(plan);
    }
    for error in &errors {
        let (message, example) = error.hint();
        eprintln!("{} {message}", "✗".red().bold());
        if let Some(example) = example {
            eprintln!("  {} {example}", "e.g.".bright_black());
        }
    }
    bail!("{} rejected: {} problem(s)", path.display(), errors.len())
}

fn load_profile(
    reference: Option<&str>,
    resource_type: Option<ResourceType>,
) -> Result<AcceptanceProfile> {
    let profile = match (reference, resource_type) {
        (_, Some(resource_type)) => AcceptanceProfile::resolve(reference, resource_type),
        (Some(reference), None) => match AcceptanceProfile::builtin(reference) {
            Some(profile) => Ok(profile),
            None => AcceptanceProfile::from_file(Path::new(reference)),
        },
        (None, None) => Ok(AcceptanceProfile::default()),
    };
    profile.with_context(|| format!("failed to load acceptance profile {reference:?}"))
}
