use crate::collectors::families::FamilyKey;
use std::collections::HashSet;

/// Days covered by the time entry families, today included.
pub const TIME_ENTRY_WINDOW_DAYS: u32 = 7;

/// Redmine `status_id` filter for each per-project issue count.
///
/// Values use Redmine's short syntax: `open`, `closed`, `*` or a status id.
/// Status ids are instance specific, so every category is configured on its
/// own. `None` leaves the category's family empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusFilters {
    pub open: Option<String>,
    pub closed: Option<String>,
    pub resolved: Option<String>,
    pub on_hold: Option<String>,
    pub in_progress: Option<String>,
    pub feedback: Option<String>,
}

/// Category names and default filters, in [`StatusFilters::table`] order.
///
/// Defaults follow Redmine's stock workflow: 2 In Progress, 3 Resolved,
/// 4 Feedback. There is no stock on-hold status.
pub const STATUS_CATEGORIES: [(&str, Option<&str>); 6] = [
    ("open", Some("open")),
    ("closed", Some("closed")),
    ("resolved", Some("3")),
    ("on-hold", None),
    ("in-progress", Some("2")),
    ("feedback", Some("4")),
];

impl Default for StatusFilters {
    fn default() -> Self {
        Self::from_values(STATUS_CATEGORIES.map(|(_, default)| default.map(str::to_string)))
    }
}

impl StatusFilters {
    /// Filters given in [`STATUS_CATEGORIES`] order.
    #[must_use]
    pub fn from_values(values: [Option<String>; 6]) -> Self {
        let [open, closed, resolved, on_hold, in_progress, feedback] = values;
        Self {
            open,
            closed,
            resolved,
            on_hold,
            in_progress,
            feedback,
        }
    }

    /// The count family and status filter of every category.
    #[must_use]
    pub fn table(&self) -> [(FamilyKey, Option<&str>); 6] {
        [
            (FamilyKey::RedmineOpenIssueCount, self.open.as_deref()),
            (FamilyKey::RedmineClosedIssueCount, self.closed.as_deref()),
            (FamilyKey::RedmineResolvedIssueCount, self.resolved.as_deref()),
            (FamilyKey::RedmineOnHoldIssueCount, self.on_hold.as_deref()),
            (FamilyKey::RedmineInProgressIssueCount, self.in_progress.as_deref()),
            (FamilyKey::RedmineFeedbackIssueCount, self.feedback.as_deref()),
        ]
    }
}

#[derive(Clone, Debug, Default)]
pub struct CollectorConfig {
    pub enabled_collectors: HashSet<String>,
    pub statuses: StatusFilters,
}

impl CollectorConfig {
    /// Create an empty config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable collectors by name
    #[must_use]
    pub fn with_enabled(mut self, collectors: &[String]) -> Self {
        self.enabled_collectors = collectors.iter().cloned().collect();
        self
    }

    #[must_use]
    pub fn with_statuses(mut self, statuses: StatusFilters) -> Self {
        self.statuses = statuses;
        self
    }

    /// Check if a collector is enabled
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_collectors.contains(name)
    }
}
