//! Options for install and uninstall operations

use std::collections::BTreeMap;

use crate::kind::Category;

/// Per-category name filters for selective installs
///
/// A category absent from the map is installed unfiltered.
pub type CategoryFilters = BTreeMap<Category, Vec<String>>;

/// Options for install operation
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Target namespace
    pub namespace: String,

    /// Install templates as ClusterWorkflowTemplates
    pub cluster: bool,

    /// Update resources even when the installed version is newer or equal
    pub force: bool,

    /// Dry run mode (issue every mutation with the dry-run flag)
    pub dry_run: bool,

    /// Registry recorded in provenance labels
    pub registry: String,

    /// Parent package (`name@version`); defaults to the package itself
    pub parent: Option<String>,

    /// Restrict installation to named resources per category
    pub filters: CategoryFilters,

    /// Override `spec.schedule` of CronWorkflows
    pub cron_schedule: Option<String>,

    /// Override `spec.timezone` of CronWorkflows
    pub time_zone: Option<String>,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            cluster: false,
            force: false,
            dry_run: false,
            registry: "local".to_string(),
            parent: None,
            filters: CategoryFilters::new(),
            cron_schedule: None,
            time_zone: None,
        }
    }
}

impl InstallOptions {
    /// Create default install options for a namespace
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Install at cluster scope
    pub fn cluster(mut self) -> Self {
        self.cluster = true;
        self
    }

    /// Force updates past the version guard
    pub fn force(mut self) -> Self {
        self.force = true;
        self
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Only install the named resources of a category
    pub fn with_filter<I, S>(mut self, category: Category, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .insert(category, names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_cron_schedule(mut self, schedule: impl Into<String>) -> Self {
        self.cron_schedule = Some(schedule.into());
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Filter for one category, if any
    pub fn filter_for(&self, category: Category) -> Option<&[String]> {
        self.filters.get(&category).map(Vec::as_slice)
    }

    /// Suffix appended to diagnostics
    pub(crate) fn dry_run_suffix(&self) -> &'static str {
        dry_run_suffix(self.dry_run)
    }
}

/// Options for uninstall operation
#[derive(Debug, Clone)]
pub struct UninstallOptions {
    /// Namespace holding the package's namespaced objects
    pub namespace: String,

    /// The package was installed with cluster-scoped templates
    pub cluster: bool,

    /// Dry run mode
    pub dry_run: bool,
}

impl UninstallOptions {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            cluster: false,
            dry_run: false,
        }
    }

    pub fn cluster(mut self) -> Self {
        self.cluster = true;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

pub(crate) fn dry_run_suffix(dry_run: bool) -> &'static str {
    if dry_run { " (dry run)" } else { "" }
}
