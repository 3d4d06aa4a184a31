//! `rolegate` — validate a role policy and query its decisions.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use rolegate_observability::LogFormat;
use rolegate_policy::{PolicyConfig, PolicyEngine, RegistrationRules};

#[derive(Parser)]
#[command(name = "rolegate")]
#[command(about = "Role hierarchy and permission policy tool")]
#[command(version)]
struct Cli {
    /// Policy document (JSON). Defaults to the bundled reference policy.
    #[arg(short, long, env = "ROLEGATE_POLICY")]
    policy: Option<PathBuf>,

    /// Log output format (json or text)
    #[arg(long, default_value = "json", env = "ROLEGATE_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate the policy
    Check,

    /// Print every role with its derived data
    Roles,

    /// Resolve a raw role token to its canonical role
    Normalize { token: String },

    /// Explain whether a role may perform an action
    Can {
        role: String,
        action: String,
        /// Exit with status 1 when the action is denied
        #[arg(long)]
        exit_code: bool,
    },

    /// Whether one role can manage another
    Manage { actor: String, target: String },

    /// Roles the given role may create, most privileged first
    Creatable { role: String },
}

#[derive(Debug, Serialize)]
struct CheckSummary<'a> {
    source: String,
    roles: usize,
    default_role: &'a str,
    self_signup_role: String,
    self_signup_owner: Option<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    rolegate_observability::init_with(cli.log_format);

    let (config, source) = match &cli.policy {
        Some(path) => (
            PolicyConfig::from_path(path)
                .with_context(|| format!("loading policy from {}", path.display()))?,
            path.display().to_string(),
        ),
        None => (
            PolicyConfig::reference().context("parsing bundled reference policy")?,
            "reference".to_string(),
        ),
    };
    let engine = PolicyEngine::from_config(&config).context("validating policy")?;
    tracing::debug!(source = %source, "policy ready");

    match cli.command {
        Command::Check => print_json(&check_summary(&config, &engine, source)?)?,
        Command::Roles => print_json(&engine.describe())?,
        Command::Normalize { token } => println!("{}", engine.normalize(&token)),
        Command::Can {
            role,
            action,
            exit_code,
        } => {
            let decision = engine.explain(&role, &action);
            print_json(&decision)?;
            if exit_code && !decision.granted {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Manage { actor, target } => {
            print_json(&serde_json::json!({
                "actor": engine.normalize(&actor),
                "target": engine.normalize(&target),
                "can_manage": engine.can_manage(&actor, &target),
                "can_create": engine.can_create(&actor, &target),
            }))?;
        }
        Command::Creatable { role } => print_json(&engine.creatable_roles_for(&role))?,
    }

    Ok(ExitCode::SUCCESS)
}

/// Resolve the registration rules against the loaded engine's registry.
fn check_summary<'a>(
    config: &PolicyConfig,
    engine: &'a PolicyEngine,
    source: String,
) -> Result<CheckSummary<'a>> {
    let registration = RegistrationRules::from_config(config, engine.registry())
        .context("validating registration rules")?;
    Ok(CheckSummary {
        source,
        roles: engine.all_roles().len(),
        default_role: engine.default_role().as_str(),
        self_signup_role: registration.self_signup_role().to_string(),
        self_signup_owner: registration.self_signup_owner().map(ToString::to_string),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("rendering output")?;
    println!("{rendered}");
    Ok(())
}
