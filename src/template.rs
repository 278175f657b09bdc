use crate::resolve::VmRecord;

/// Compiled snapshot name-label template.
///
/// Supports two placeholders: `{job.name}` (fixed at compile time) and
/// `{vm.name_label}` (substituted per VM at render time). Anything else
/// passes through verbatim.
#[derive(Debug, Clone)]
pub struct SnapshotNameTemplate {
    template: String,
}

impl SnapshotNameTemplate {
    pub fn compile(template: &str, job_name: &str) -> Self {
        Self {
            template: template.replace("{job.name}", job_name),
        }
    }

    pub fn render(&self, vm: &VmRecord) -> String {
        self.template.replace("{vm.name_label}", &vm.name_label)
    }
}
