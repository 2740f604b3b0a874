//! push-trigger CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration** — load the trigger TOML file and validate it.
//! 2. **Wire observability** — JSON `tracing` output plus an optional
//!    OpenTelemetry OTLP exporter (see [`telemetry`]).
//! 3. **Construct infrastructure** — a [`trigger::StaticJobCatalog`] from the
//!    config and a [`store::DirectoryJobStore`], injected into
//!    [`trigger::PushTrigger`].
//! 4. **Run once** — decode one push delivery, hand it to the trigger and
//!    print the outcome as JSON on stdout. Ctrl-C cancels outstanding
//!    submissions instead of killing the process mid-write.

mod store;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use trigger::{
    Context, JobId, PushTrigger, StaticJobCatalog, TriggerClients, TriggerConfig, TriggerOutcome,
};

use crate::store::DirectoryJobStore;

/// Turn one GitHub push delivery into post-push job requests.
#[derive(Debug, Parser)]
#[command(name = "push-trigger", version)]
struct Args {
    /// Trigger configuration (TOML).
    #[arg(long, env = "PUSH_TRIGGER_CONFIG")]
    config: PathBuf,

    /// File holding the verified push webhook body.
    #[arg(long)]
    event: PathBuf,

    /// Value of the delivery's `X-GitHub-Delivery` header.
    #[arg(long, env = "GITHUB_DELIVERY")]
    delivery_id: String,

    /// Directory job requests are written to.
    #[arg(long, env = "PUSH_TRIGGER_STORE_DIR", default_value = "jobs")]
    store_dir: PathBuf,

    /// OTLP collector endpoint; span export is off when unset.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    status: &'static str,
    submitted: Vec<JobId>,
}

impl From<TriggerOutcome> for Summary {
    fn from(outcome: TriggerOutcome) -> Self {
        match outcome {
            TriggerOutcome::BranchDeleted => Self {
                status: "branch_deleted",
                submitted: Vec::new(),
            },
            TriggerOutcome::Completed { submitted } => Self {
                status: "completed",
                submitted,
            },
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<TriggerConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: TriggerConfig =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Context for one event: cancelled by `shutdown`, bounded by the configured
/// timeout if there is one.
fn event_context(config: &TriggerConfig, shutdown: CancellationToken) -> Context {
    let ctx = Context::with_token(shutdown);
    match config.submit.timeout() {
        Some(timeout) => ctx.deadline_in(timeout),
        None => ctx,
    }
}

async fn run(args: Args) -> anyhow::Result<Summary> {
    let config = load_config(&args.config)?;
    let body = tokio::fs::read(&args.event)
        .await
        .with_context(|| format!("reading event {}", args.event.display()))?;
    let event = github::parse_push_event(&body, &args.delivery_id)?;

    let clients = TriggerClients {
        catalog: Arc::new(StaticJobCatalog::from_config(&config)),
        store: Arc::new(DirectoryJobStore::new(args.store_dir.clone())),
    };
    let trigger = PushTrigger::new(clients, &config);

    let shutdown = CancellationToken::new();
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding submissions");
            on_interrupt.cancel();
        }
    });
    let ctx = event_context(&config, shutdown);

    let outcome = trigger.handle(&ctx, &event).await?;
    Ok(outcome.into())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let provider = match telemetry::init(args.otlp_endpoint.as_deref()) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("push-trigger: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(args).await;
    let code = match result {
        Ok(summary) => match serde_json::to_string(&summary) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!(error = %err, "Failed to encode summary");
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            error!("Push trigger failed: {err:#}");
            ExitCode::FAILURE
        }
    };

    telemetry::shutdown(provider);
    code
}
