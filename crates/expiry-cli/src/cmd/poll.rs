use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context};
use expiry_core::{
    cluster::ClusterState,
    config::{ExpiryConfig, WarnLevel},
    expiring::ExpiringActionDb,
    leader::{LeaderOnlyPoller, StandaloneLeader, TickOutcome},
    paths,
    poller::{PollReport, Poller},
};

use crate::output::{format_millis, print_json, print_table};

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let db = ExpiringActionDb::open(&paths::expiring_db_path(root))
        .context("failed to open expiring action store")?;

    let lock = Mutex::new(());
    let leader = LeaderOnlyPoller::new(
        "expiring user action poller",
        &StandaloneLeader,
        &lock,
        Duration::from_millis(config.check_expiring_user_action_every_millis),
    );

    let report = match leader.tick(|| poll_pass(root, &config, &db))? {
        TickOutcome::Ran(report) => report?,
        TickOutcome::NotLeader => bail!("not the leader; nothing was polled"),
    };

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(())
}

/// One poll pass against the cluster file as it is on disk right now. The
/// file is read fresh and written back, so edits made between passes are
/// kept.
pub(crate) fn poll_pass(
    root: &Path,
    config: &ExpiryConfig,
    db: &ExpiringActionDb,
) -> anyhow::Result<PollReport> {
    let cluster = ClusterState::load(root).context("failed to load cluster state")?;
    let report = Poller::new(config, db, &cluster, &cluster, &cluster, &cluster).run_once();
    cluster.save(root).context("failed to save cluster state")?;
    Ok(report)
}

/// Load config and surface validation findings as log lines.
pub(crate) fn load_config(root: &Path) -> anyhow::Result<ExpiryConfig> {
    let config = ExpiryConfig::load(root).context("failed to load config")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => tracing::error!("config: {}", w.message),
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
        }
    }
    Ok(config)
}

fn print_report(report: &PollReport) {
    println!("Polled at {}", format_millis(report.now_millis));
    let rows = report
        .kinds
        .iter()
        .map(|k| {
            vec![
                k.kind.to_string(),
                k.examined.to_string(),
                k.not_due.to_string(),
                k.applied.to_string(),
                k.skipped.to_string(),
                k.failed.to_string(),
                k.missing_request.to_string(),
                k.malformed.to_string(),
                k.deleted.to_string(),
                k.error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(
        &[
            "KIND", "SEEN", "NOT DUE", "APPLIED", "SKIPPED", "FAILED", "NO REQUEST", "MALFORMED",
            "DELETED", "ERROR",
        ],
        rows,
    );
}
