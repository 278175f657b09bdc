use crate::settings::Settings;

/// Run-level configuration shared by every job: the snapshot name-label
/// template and the bottom layer of the settings merge.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Template for the name label of snapshots created by executors.
    /// Placeholders: `{job.name}`, `{vm.name_label}`.
    pub snapshot_name_label_tpl: String,
    /// Defaults underneath job-wide, per-schedule and per-VM settings.
    pub default_settings: Settings,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            snapshot_name_label_tpl: "[{job.name}] {vm.name_label}".to_string(),
            default_settings: Settings::new(),
        }
    }
}
