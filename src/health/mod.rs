//! Process-wide component health registry.
//!
//! Long-running pieces (the Slack listener, the gateway) report in here; the
//! gateway serves the snapshot and `doctor` prints it.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub updated_at: String,
    pub last_ok: Option<String>,
    pub last_error: Option<String>,
    pub restart_count: u64,
}

struct Registry {
    started_at: Instant,
    components: Mutex<BTreeMap<String, ComponentHealth>>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| Registry {
        started_at: Instant::now(),
        components: Mutex::new(BTreeMap::new()),
    })
}

fn now_rfc3339() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.to_rfc3339()
}

fn upsert<F>(component: &str, update: F)
where
    F: FnOnce(&mut ComponentHealth),
{
    let mut map = registry().components.lock();
    let now = now_rfc3339();
    let entry = map
        .entry(component.to_string())
        .or_insert_with(|| ComponentHealth {
            status: "starting".into(),
            updated_at: now.clone(),
            last_ok: None,
            last_error: None,
            restart_count: 0,
        });
    update(entry);
    entry.updated_at = now;
}

pub fn mark_component_ok(component: &str) {
    upsert(component, |c| {
        c.status = "ok".into();
        c.last_ok = Some(now_rfc3339());
    });
}

pub fn mark_component_error(component: &str, error: impl ToString) {
    let error = error.to_string();
    upsert(component, move |c| {
        c.status = "error".into();
        c.last_error = Some(error);
    });
}

pub fn bump_component_restart(component: &str) {
    upsert(component, |c| {
        c.restart_count = c.restart_count.saturating_add(1);
    });
}

pub fn snapshot() -> BTreeMap<String, ComponentHealth> {
    registry().components.lock().clone()
}

pub fn snapshot_json() -> serde_json::Value {
    let components = snapshot();
    let healthy = components.values().all(|c| c.status != "error");
    serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "uptime_seconds": registry().started_at.elapsed().as_secs(),
        "components": components,
    })
}
