use crate::domain::model::Item;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which item timestamp a lookback window is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowBasis {
    Approved,
    Revised,
    /// Either timestamp falls inside the window.
    Any,
}

type Predicate = Arc<dyn Fn(&Item) -> bool + Send + Sync>;

/// Validity predicate selecting the items that take part in one aggregation.
#[derive(Clone)]
pub struct Window {
    description: String,
    predicate: Predicate,
}

impl Window {
    pub fn all() -> Self {
        Self::from_fn("all items", |_| true)
    }

    pub fn from_fn(
        description: impl Into<String>,
        predicate: impl Fn(&Item) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Items whose `basis` timestamp is no older than `days` before `now`.
    /// Items lacking the timestamp fall outside. A lookback reaching past the
    /// earliest representable instant admits every dated item.
    pub fn lookback(basis: WindowBasis, days: i64, now: DateTime<Utc>) -> Self {
        let since = Duration::try_days(days)
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let within = move |at: Option<DateTime<Utc>>| at.is_some_and(|at| at >= since);
        Self::from_fn(
            format!("{:?} since {}", basis, since.format("%F")).to_lowercase(),
            move |item: &Item| match basis {
                WindowBasis::Approved => within(item.approved_at),
                WindowBasis::Revised => within(item.revised_at),
                WindowBasis::Any => within(item.approved_at) || within(item.revised_at),
            },
        )
    }

    /// Narrows the window to items not in any of `states` (e.g. superseded).
    pub fn excluding_states(self, states: Vec<String>) -> Self {
        if states.is_empty() {
            return self;
        }
        let description = format!("{}, state not in [{}]", self.description, states.join(", "));
        let inner = self.predicate;
        Self::from_fn(description, move |item: &Item| {
            let excluded = item
                .state
                .as_deref()
                .is_some_and(|state| states.iter().any(|s| s == state));
            !excluded && inner(item)
        })
    }

    pub fn contains(&self, item: &Item) -> bool {
        (self.predicate)(item)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
