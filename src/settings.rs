use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A flat settings mapping for one scope (job-wide default, schedule, or VM).
///
/// Settings are kept as an untyped key/value map because jobs carry
/// executor-specific keys the orchestrator never interprets; the only keys
/// the core reads are typed accessors below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(pub serde_json::Map<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Shallow merge: every key of `other` overrides the same key here.
    /// Keys absent from `other` are left untouched.
    pub fn merged_with(&self, other: &Settings) -> Settings {
        let mut merged = self.0.clone();
        for (key, value) in &other.0 {
            merged.insert(key.clone(), value.clone());
        }
        Settings(merged)
    }

    /// Concurrency bound for per-VM fan-out. 0 means unbounded.
    pub fn concurrency(&self) -> usize {
        self.get("concurrency")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize
    }
}

impl FromIterator<(String, Value)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Settings(iter.into_iter().collect())
    }
}

/// Effective schedule-wide settings for one run:
/// `defaults` ⊕ `settings[""]` ⊕ `settings[schedule_id]`, later sources win.
pub fn resolve_schedule_settings(
    defaults: &Settings,
    job_settings: &HashMap<String, Settings>,
    schedule_id: &str,
) -> Settings {
    let mut resolved = defaults.clone();
    if let Some(job_wide) = job_settings.get("") {
        resolved = resolved.merged_with(job_wide);
    }
    if let Some(per_schedule) = job_settings.get(schedule_id) {
        resolved = resolved.merged_with(per_schedule);
    }
    resolved
}

/// Effective settings for one VM: the schedule-wide result overridden by
/// that VM's entry, if any. An absent per-VM entry changes nothing.
pub fn resolve_vm_settings(
    schedule_settings: &Settings,
    job_settings: &HashMap<String, Settings>,
    vm_id: &str,
) -> Settings {
    match job_settings.get(vm_id) {
        Some(per_vm) => schedule_settings.merged_with(per_vm),
        None => schedule_settings.clone(),
    }
}
