use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use expiry_core::{
    expiring::{policy, ActionKind, ExpiringAction, ExpiringActionDb},
    paths,
    ports::ExpiringActionStore,
};
use serde::Serialize;

use super::poll::load_config;
use crate::output::{format_millis, print_json, print_table};

#[derive(Serialize)]
struct Entry<'a> {
    #[serde(flatten)]
    action: &'a ExpiringAction,
    deadline_millis: Option<i64>,
    due: Option<bool>,
}

pub fn run(root: &Path, kind: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let db = ExpiringActionDb::open(&paths::expiring_db_path(root))
        .context("failed to open expiring action store")?;

    let actions = match kind {
        Some(k) => {
            let kind: ActionKind = k.parse()?;
            db.list_expiring(kind)?
        }
        None => db.list_all()?,
    };

    let now = Utc::now().timestamp_millis();
    let entries: Vec<Entry> = actions
        .iter()
        .map(|action| Entry {
            action,
            deadline_millis: policy::deadline_millis(action, &config).ok(),
            due: policy::is_due(action, now, &config).ok(),
        })
        .collect();

    if json {
        return print_json(&entries);
    }

    if entries.is_empty() {
        println!("No expiring actions.");
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.action.kind().to_string(),
                e.action.request_id.clone(),
                e.action.user.clone(),
                e.action.action_id.clone(),
                format_millis(e.action.start_millis),
                e.deadline_millis
                    .map(format_millis)
                    .unwrap_or_else(|| "-".to_string()),
                match e.due {
                    Some(true) => "yes",
                    Some(false) => "no",
                    None => "invalid",
                }
                .to_string(),
            ]
        })
        .collect();
    print_table(
        &["KIND", "REQUEST", "USER", "ACTION ID", "STARTED", "DEADLINE", "DUE"],
        rows,
    );
    Ok(())
}
