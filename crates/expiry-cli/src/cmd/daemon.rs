use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use expiry_core::{
    cluster::ClusterState,
    expiring::ExpiringActionDb,
    leader::{LeaderOnlyPoller, StandaloneLeader},
    paths,
};
use tracing::{error, info, warn};

use super::poll::{load_config, poll_pass};

/// Poll on a fixed period until Ctrl-C. Each pass reloads the cluster file
/// and saves it when done.
pub fn run(root: &Path, every_millis: Option<u64>) -> anyhow::Result<()> {
    let mut config = load_config(root)?;
    if let Some(ms) = every_millis {
        config.check_expiring_user_action_every_millis = ms;
    }

    // Fail fast on a missing cluster file rather than logging every tick.
    ClusterState::load(root).context("failed to load cluster state")?;
    let db = ExpiringActionDb::open(&paths::expiring_db_path(root))
        .context("failed to open expiring action store")?;

    let lock = Mutex::new(());
    let leader = LeaderOnlyPoller::new(
        "expiring user action poller",
        &StandaloneLeader,
        &lock,
        Duration::from_millis(config.check_expiring_user_action_every_millis),
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        leader
            .run(
                || match poll_pass(root, &config, &db) {
                    Ok(report) => {
                        if report.has_errors() {
                            warn!("poll pass finished with store errors");
                        }
                        if report.deleted() > 0 {
                            info!(deleted = report.deleted(), "expired {} action(s)", report.deleted());
                        }
                    }
                    Err(e) => error!("poll pass failed: {e:#}"),
                },
                async {
                    let _ = tokio::signal::ctrl_c().await;
                },
            )
            .await;
    });

    Ok(())
}
