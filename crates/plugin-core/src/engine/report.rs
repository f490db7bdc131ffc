//! Reconciliation states and reports

use serde::Serialize;

use plugin_meta::PluginRecord;

/// Where a plugin stands during a reconciliation pass.
///
/// `Declared -> Checking -> {UpToDate | NeedsInstall | NeedsReinstall}
/// -> Installing -> {Installed | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PluginState {
    Declared,
    Checking,
    UpToDate,
    NeedsInstall,
    NeedsReinstall,
    Installing,
    Installed,
    Failed,
}

impl PluginState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::UpToDate | Self::Installed | Self::Failed)
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Declared => "declared",
            Self::Checking => "checking",
            Self::UpToDate => "up to date",
            Self::NeedsInstall => "needs install",
            Self::NeedsReinstall => "needs reinstall",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Final state of one plugin after a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginOutcome {
    pub name: String,
    pub state: PluginState,
    /// Version present once the pass finished, if any.
    pub version: Option<String>,
    pub error: Option<String>,
}

/// Result of [`super::ReconciliationEngine::reconcile`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub plugins: Vec<PluginOutcome>,
    /// Schema fragments registered after the pass.
    pub schemas_registered: usize,
    pub schema_errors: Vec<String>,
}

impl ReconcileReport {
    /// Every plugin reached `UpToDate` or `Installed` and all schemas registered.
    pub fn success(&self) -> bool {
        self.schema_errors.is_empty() && self.plugins.iter().all(|p| p.state != PluginState::Failed)
    }

    pub fn state_of(&self, name: &str) -> Option<PluginState> {
        self.plugins.iter().find(|p| p.name == name).map(|p| p.state)
    }

    pub fn failed(&self) -> impl Iterator<Item = &PluginOutcome> {
        self.plugins.iter().filter(|p| p.state == PluginState::Failed)
    }

    /// Record a transition. Only terminal states end up in the report.
    pub(crate) fn transition(&mut self, name: &str, state: PluginState) {
        tracing::debug!(plugin = %name, state = ?state, "State transition");
        if state.is_terminal() && state != PluginState::Failed {
            self.settle(name, state, None, None);
        }
    }

    pub(crate) fn up_to_date(&mut self, record: &PluginRecord) {
        self.transition(&record.name, PluginState::UpToDate);
        self.set_version(&record.name, Some(record.version.clone()));
    }

    pub(crate) fn installed(&mut self, record: &PluginRecord) {
        self.transition(&record.name, PluginState::Installed);
        self.set_version(&record.name, Some(record.version.clone()));
    }

    pub(crate) fn failed_with(&mut self, name: &str, error: &crate::Error) {
        tracing::debug!(plugin = %name, state = ?PluginState::Failed, "State transition");
        self.settle(name, PluginState::Failed, None, Some(error.to_string()));
    }

    fn settle(&mut self, name: &str, state: PluginState, version: Option<String>, error: Option<String>) {
        let outcome = PluginOutcome {
            name: name.to_string(),
            state,
            version,
            error,
        };
        match self.plugins.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = outcome,
            None => self.plugins.push(outcome),
        }
    }

    fn set_version(&mut self, name: &str, version: Option<String>) {
        if let Some(p) = self.plugins.iter_mut().find(|p| p.name == name) {
            p.version = version;
        }
    }
}

/// A catalog record joined with what is on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginStatus {
    pub record: PluginRecord,
    /// Version in the live plugin directory; `None` when missing on disk.
    pub installed_version: Option<String>,
    pub latest_version: Option<String>,
    pub can_be_updated: bool,
}

impl PluginStatus {
    /// Catalog and disk disagree.
    pub fn has_drift(&self) -> bool {
        self.installed_version.as_deref() != Some(self.record.version.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_non_terminal_transitions_not_reported() {
        let mut report = ReconcileReport::default();
        report.transition("a", PluginState::Declared);
        report.transition("a", PluginState::Checking);
        report.transition("a", PluginState::NeedsInstall);
        assert!(report.plugins.is_empty());
    }

    #[test]
    fn test_last_terminal_state_wins() {
        let mut report = ReconcileReport::default();
        report.failed_with("a", &Error::NotFound { id: "a".into() });
        report.transition("a", PluginState::Installed);

        assert_eq!(report.state_of("a"), Some(PluginState::Installed));
        assert_eq!(report.plugins.len(), 1);
        assert!(report.success());
    }

    #[test]
    fn test_failure_carries_message() {
        let mut report = ReconcileReport::default();
        report.failed_with("a", &Error::store("disk full"));

        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some("Store error: disk full"));
        assert!(!report.success());
    }
}
