use std::path::Path;
use std::sync::Arc;

use tasknest_core::{AssumeOnline, ReachabilityProbe, SyncScheduler, TcpProbe};

use crate::commands::common::{build_engine, open_context};
use crate::error::CliError;

/// Keep a scheduler running in the foreground until Ctrl-C.
pub async fn run_daemon(db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let context = open_context(db_path, profile)?;
    let engine = Arc::new(build_engine(&context).await?);

    let probe: Arc<dyn ReachabilityProbe> = match context.profile.probe_addr() {
        Some(addr) => Arc::new(TcpProbe::new(addr)),
        None => Arc::new(AssumeOnline),
    };
    let probe_task = engine
        .connectivity()
        .spawn_probe(probe, engine.config().probe_interval);

    let scheduler = SyncScheduler::spawn(engine);
    tracing::info!(
        "Background sync running for profile '{}'; press Ctrl-C to stop",
        context.profile_name
    );

    let signal = tokio::signal::ctrl_c().await;
    scheduler.shutdown().await;
    probe_task.abort();
    signal?;

    println!("Background sync stopped");
    Ok(())
}
