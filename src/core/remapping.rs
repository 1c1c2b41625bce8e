use crate::domain::model::canonical_key;
use crate::utils::error::{FlowError, Result};
use serde::{Deserialize, Serialize};

/// What to do when a group is remapped more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    LastWriteWins,
}

/// A proposed move of one group under a new area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemappingRule {
    pub group: String,
    pub target: String,
}

/// Ordered group -> new area rules; each group appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Remapping {
    rules: Vec<RemappingRule>,
}

impl Remapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, G, T>(pairs: I, policy: DuplicatePolicy) -> Result<Self>
    where
        I: IntoIterator<Item = (G, T)>,
        G: Into<String>,
        T: Into<String>,
    {
        let mut remapping = Self::new();
        for (group, target) in pairs {
            remapping.insert(group, target, policy)?;
        }
        Ok(remapping)
    }

    /// Adds a rule. Groups are stored by id, so `g2` and `(g2)` name the
    /// same group. A repeated group either fails or replaces the earlier
    /// target in place, keeping its original position.
    pub fn insert(
        &mut self,
        group: impl Into<String>,
        target: impl Into<String>,
        policy: DuplicatePolicy,
    ) -> Result<()> {
        let group = canonical_key(&group.into()).to_string();
        let target = target.into();

        match self.rules.iter_mut().find(|rule| rule.group == group) {
            Some(existing) => match policy {
                DuplicatePolicy::Reject => Err(FlowError::DuplicateRemapping {
                    group,
                    first: existing.target.clone(),
                    second: target,
                }),
                DuplicatePolicy::LastWriteWins => {
                    tracing::warn!(
                        "Group '{}' remapped again: '{}' replaces '{}'",
                        group,
                        target,
                        existing.target
                    );
                    existing.target = target;
                    Ok(())
                }
            },
            None => {
                self.rules.push(RemappingRule { group, target });
                Ok(())
            }
        }
    }

    /// Merges `other` into `self` rule by rule under `policy`.
    pub fn extend(&mut self, other: Remapping, policy: DuplicatePolicy) -> Result<()> {
        for rule in other.rules {
            self.insert(rule.group, rule.target, policy)?;
        }
        Ok(())
    }

    /// Reads `group,new_area` rows; a header line is expected.
    pub fn from_csv(data: &[u8], policy: DuplicatePolicy) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(data);
        let mut remapping = Self::new();
        for row in reader.deserialize::<RemappingRule>() {
            let rule = row?;
            remapping.insert(rule.group, rule.target, policy)?;
        }
        Ok(remapping)
    }

    pub fn rules(&self) -> &[RemappingRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
