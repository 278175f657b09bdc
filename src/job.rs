use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::settings::Settings;

/// An opaque membership pattern (e.g. a simple id pattern) resolved to a
/// concrete id list by a [`crate::resolve::PatternResolver`]. The
/// orchestrator never inspects its contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdPattern(pub Value);

impl IdPattern {
    pub fn new(value: Value) -> Self {
        Self(value)
    }
}

/// A configured, repeatable backup job targeting sets of VMs, SRs and
/// remotes. Immutable for the duration of one run.
///
/// `settings` is keyed by scope: `""` holds the job-wide defaults, a
/// schedule id holds that schedule's overrides, a VM uuid holds per-VM
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupJob {
    pub id: String,
    pub name: String,
    pub srs: IdPattern,
    pub remotes: IdPattern,
    pub vms: IdPattern,
    #[serde(default)]
    pub settings: HashMap<String, Settings>,
}

/// A named recurrence binding. Within a run it serves only as a
/// settings-lookup scope and as the parent-task label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Schedule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}
