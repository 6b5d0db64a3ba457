//! Long-running scheduler process.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

use super::build_runtime;

/// Arm all timers, save the state every `save_interval` seconds and on
/// Ctrl-C, then stop.
pub async fn serve(config_path: &Path, state_path: &Path, save_interval: u64) -> Result<()> {
    let runtime = build_runtime(config_path, state_path).await?;
    runtime
        .service
        .start()
        .await
        .context("Failed to start scheduler")?;
    info!(state = %state_path.display(), "Feedline is running, press Ctrl-C to stop");

    let mut saver = interval(Duration::from_secs(save_interval.max(1)));
    saver.set_missed_tick_behavior(MissedTickBehavior::Delay);
    saver.tick().await;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Shutdown requested");
                break;
            }
            _ = saver.tick() => {
                if let Err(e) = runtime.store.save(state_path).await {
                    warn!(error = %e, "Failed to save state");
                }
            }
        }
    }

    runtime.service.shutdown().await;
    runtime
        .store
        .save(state_path)
        .await
        .with_context(|| format!("Failed to save state: {}", state_path.display()))?;
    Ok(())
}
