use crate::collectors::families::{FamilyKey, MetricFamily};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, NaiveDate};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Build a fresh, empty family for every key.
#[must_use]
pub fn define_families(
    keys: impl IntoIterator<Item = FamilyKey>,
) -> BTreeMap<FamilyKey, MetricFamily> {
    keys.into_iter()
        .map(|key| (key, MetricFamily::new(key.definition())))
        .collect()
}

/// State of one collection cycle.
///
/// Holds the cycle start time and the families declared for it. Collectors
/// only get a shared reference; observations are added through
/// [`Cycle::observe`], which may be called from concurrently polled
/// sub-collectors. A cycle is consumed by [`Cycle::into_snapshot`] and never
/// reused.
#[derive(Debug)]
pub struct Cycle {
    started: DateTime<Local>,
    families: Mutex<BTreeMap<FamilyKey, MetricFamily>>,
}

impl Cycle {
    /// Start a cycle now with empty families for `keys`.
    #[must_use]
    pub fn begin(keys: impl IntoIterator<Item = FamilyKey>) -> Self {
        Self::starting_at(Local::now(), keys)
    }

    #[must_use]
    pub fn starting_at(
        started: DateTime<Local>,
        keys: impl IntoIterator<Item = FamilyKey>,
    ) -> Self {
        Self {
            started,
            families: Mutex::new(define_families(keys)),
        }
    }

    #[must_use]
    pub const fn started(&self) -> DateTime<Local> {
        self.started
    }

    /// Cycle start as whole epoch seconds; the value of every detail gauge.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn timestamp(&self) -> f64 {
        self.started.timestamp() as f64
    }

    /// Local calendar date of the cycle start.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.started.date_naive()
    }

    fn families(&self) -> MutexGuard<'_, BTreeMap<FamilyKey, MetricFamily>> {
        match self.families.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("cycle families lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Add one observation to a declared family.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` was not declared for this cycle or the label
    /// count does not match the family
    pub fn observe<S: AsRef<str>>(&self, key: FamilyKey, label_values: &[S], value: f64) -> Result<()> {
        let mut families = self.families();
        let family = families
            .get_mut(&key)
            .ok_or_else(|| anyhow!("family {} is not declared in this cycle", key.name()))?;
        family.add(label_values, value)
    }

    /// Record a detail observation valued with the cycle timestamp.
    ///
    /// # Errors
    ///
    /// See [`Cycle::observe`]
    pub fn mark<S: AsRef<str>>(&self, key: FamilyKey, label_values: &[S]) -> Result<()> {
        self.observe(key, label_values, self.timestamp())
    }

    /// Number of observations recorded so far across all families.
    #[must_use]
    pub fn observation_count(&self) -> usize {
        self.families().values().map(|f| f.observations().len()).sum()
    }

    /// Finish the cycle, yielding every declared family in declaration order.
    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        let families = match self.families.into_inner() {
            Ok(families) => families,
            Err(poisoned) => poisoned.into_inner(),
        };

        Snapshot {
            families: families.into_values().collect(),
        }
    }
}

/// The families produced by one completed cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    families: Vec<MetricFamily>,
}

impl Snapshot {
    #[must_use]
    pub fn families(&self) -> &[MetricFamily] {
        &self.families
    }

    #[must_use]
    pub fn family(&self, key: FamilyKey) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name() == key.name())
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.families.iter().map(MetricFamily::name).collect()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for family in &self.families {
            write!(f, "{family}")?;
        }
        Ok(())
    }
}
