use mimalloc::MiMalloc;
use serde_json::{Value, json};
use std::process::ExitCode;
use std::sync::Arc;
use stratus::config::Config;
use stratus::waiter::TracingPolicy;
use stratus::{ApiClient, OperationHandle, StratusError, WaitContext, Waiters};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const USAGE: &str = "usage: stratus wait <activity|job|disk|tools> <id>";

enum Command {
    Activity(OperationHandle),
    BackupJob(OperationHandle),
    Disk(OperationHandle),
    GuestTools(OperationHandle),
}

impl Command {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        if args.next().as_deref() != Some("wait") {
            return Err(USAGE.to_string());
        }
        let (Some(kind), Some(id), None) = (args.next(), args.next(), args.next()) else {
            return Err(USAGE.to_string());
        };
        let handle = OperationHandle::new(&id).map_err(|err| format!("{err}\n{USAGE}"))?;

        match kind.as_str() {
            "activity" => Ok(Command::Activity(handle)),
            "job" => Ok(Command::BackupJob(handle)),
            "disk" => Ok(Command::Disk(handle)),
            "tools" => Ok(Command::GuestTools(handle)),
            other => Err(format!("unknown wait kind: {other}\n{USAGE}")),
        }
    }

    fn label(&self) -> String {
        match self {
            Command::Activity(handle) => format!("activity {handle}"),
            Command::BackupJob(handle) => format!("job {handle}"),
            Command::Disk(id) => format!("disk {id}"),
            Command::GuestTools(id) => format!("tools {id}"),
        }
    }

    async fn run(self, waiters: &Waiters, ctx: &WaitContext) -> Result<Value, StratusError> {
        match self {
            Command::Activity(handle) => {
                Ok(serde_json::to_value(waiters.activity.wait(ctx, &handle).await?)?)
            }
            Command::BackupJob(handle) => {
                Ok(serde_json::to_value(waiters.backup_job.wait(ctx, &handle).await?)?)
            }
            Command::Disk(id) => Ok(serde_json::to_value(waiters.disk.wait(ctx, &id).await?)?),
            Command::GuestTools(id) => {
                let detection = waiters.guest_tools.wait(ctx, &id).await?;
                let detected = detection.is_detected();
                if !detected {
                    warn!(vm_id = %id, "Guest tools not detected before the detection timeout");
                }
                Ok(json!({
                    "detected": detected,
                    "virtualMachine": detection.into_snapshot(),
                }))
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(usage) => {
            eprintln!("{usage}");
            return Ok(ExitCode::from(2));
        }
    };

    let cfg = Config::from_toml();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let api_cfg = cfg.api();
    info!(
        base_url = %api_cfg.base_url,
        token_url = %api_cfg.auth.token_url,
        auth_flow = ?api_cfg.auth.flow,
        proxy = %api_cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        enable_multiplexing = api_cfg.enable_multiplexing,
        loglevel = %cfg.basic.loglevel,
        "API config (effective)"
    );

    let client = ApiClient::from_config(&api_cfg)?;
    let waiters = Waiters::new(&client, cfg.waiter())
        .with_policy(&client, Arc::new(TracingPolicy::new(command.label())));

    let ctx = match waiters.cfg.timeout {
        Some(timeout) => WaitContext::with_timeout(timeout),
        None => WaitContext::new(),
    };
    let shutdown = ctx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, abandoning wait");
        shutdown.cancel();
    });

    match command.run(&waiters, &ctx).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_cancellation() => {
            error!(error = %err, "Wait abandoned; the operation may still be running");
            Ok(ExitCode::from(130))
        }
        Err(err) => {
            error!(error = %err, "Wait failed");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
