//! Rule model shared by classification, execution, and undo.
//!
//! These types carry no behaviour beyond ordering: a [`Config`] keeps its
//! rules sorted by ascending priority, and everything else is plain data.

use crate::file_category::CategoryMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// The kind of predicate a [`Condition`] evaluates.
///
/// Names match the `type` tags used in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    /// A file with one of the given names exists (case-insensitive).
    ContainsFilenamePattern,
    /// A file with one of the given names exists (exact match).
    ContainsFilename,
    /// A subdirectory with one of the given names exists (case-insensitive).
    ContainsSubdirectoryNamed,
    /// The directory has no subdirectories.
    HasNoSubdirectories,
    /// The share of files in the listed categories reaches `threshold`.
    FileCategoryPercentage,
    /// Some subdirectory `S` has a sibling archive `S.zip`, `S.rar` or `S.7z`.
    SubfolderMatchesArchive,
    /// The image capture date matches a `YYYY-MM-DD` template with `*` wildcards.
    ExifDateMatches,
    /// Any tag this build does not know. Never holds.
    #[serde(other)]
    Unsupported,
}

/// One atomic predicate inside a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    #[serde(default)]
    pub values: Vec<String>,
    /// Only read by [`ConditionKind::FileCategoryPercentage`].
    #[serde(default)]
    pub threshold: f64,
}

impl Condition {
    pub fn new<I, S>(kind: ConditionKind, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            values: values.into_iter().map(Into::into).collect(),
            threshold: 0.0,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

/// A prioritized rule: the logical AND of its conditions.
///
/// `category` may contain the `{exif_year}` placeholder, which is replaced
/// with the capture year when the rule matches an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub category: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn new(category: impl Into<String>, priority: i32, conditions: Vec<Condition>) -> Self {
        Self {
            category: category.into(),
            priority,
            conditions,
        }
    }
}

/// The extension map and the rule list, ready for classification.
///
/// Rules are sorted once, stably, by ascending priority. Evaluation order is
/// exactly this order and the first full match wins.
#[derive(Debug, Clone, Default)]
pub struct Config {
    categories: CategoryMap,
    rules: Vec<Rule>,
}

impl Config {
    pub fn new(categories: CategoryMap, mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|rule| rule.priority);
        Self { categories, rules }
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// One proposed or executed move. `from` never equals `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Action {
    pub from: PathBuf,
    pub to: PathBuf,
    /// The resolved category name.
    pub reason: String,
}

/// The actions proposed by one scan.
///
/// Order across chunks follows enumeration order; order inside a chunk is
/// whatever order the workers finished in. A cancelled scan still yields a
/// valid, partial plan.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    actions: Vec<Action>,
    cancelled: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>, cancelled: bool) -> Self {
        Self { actions, cancelled }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// True when the scan stopped early because cancellation was requested.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Number of proposed moves per category.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for action in &self.actions {
            *counts.entry(action.reason.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the approved subset of this plan, preserving plan order.
    pub fn select<F>(&self, mut approve: F) -> Vec<Action>
    where
        F: FnMut(&Action) -> bool,
    {
        self.actions
            .iter()
            .filter(|action| approve(action))
            .cloned()
            .collect()
    }
}

/// What a journal entry records. Only moves are journaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Move,
    /// Any kind this version does not know; undo leaves it alone.
    #[serde(other)]
    Unknown,
}

/// A move that physically happened.
///
/// `to` is the realized destination, which differs from the planned one when
/// a collision forced a ` (n)` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub action: ActionKind,
    pub from: PathBuf,
    pub to: PathBuf,
}

impl JournalEntry {
    pub fn moved(from: PathBuf, to: PathBuf) -> Self {
        Self {
            action: ActionKind::Move,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_sorted_by_priority() {
        let config = Config::new(
            CategoryMap::new(),
            vec![
                Rule::new("Late", 30, Vec::new()),
                Rule::new("Early", 10, Vec::new()),
                Rule::new("Middle", 20, Vec::new()),
            ],
        );

        let order: Vec<_> = config.rules().iter().map(|r| r.category.as_str()).collect();
        assert_eq!(order, vec!["Early", "Middle", "Late"]);
    }

    #[test]
    fn test_equal_priorities_keep_input_order() {
        let config = Config::new(
            CategoryMap::new(),
            vec![
                Rule::new("First", 5, Vec::new()),
                Rule::new("Second", 5, Vec::new()),
                Rule::new("Zero", 0, Vec::new()),
            ],
        );

        let order: Vec<_> = config.rules().iter().map(|r| r.category.as_str()).collect();
        assert_eq!(order, vec!["Zero", "First", "Second"]);
    }

    #[test]
    fn test_condition_deserializes_with_defaults() {
        let condition: Condition =
            serde_json::from_str(r#"{"type": "has_no_subdirectories"}"#).unwrap();
        assert_eq!(condition.kind, ConditionKind::HasNoSubdirectories);
        assert!(condition.values.is_empty());
        assert_eq!(condition.threshold, 0.0);
    }

    #[test]
    fn test_unknown_condition_type_is_unsupported() {
        let condition: Condition =
            serde_json::from_str(r#"{"type": "smells_like_teen_spirit", "values": ["x"]}"#)
                .unwrap();
        assert_eq!(condition.kind, ConditionKind::Unsupported);
    }

    #[test]
    fn test_journal_entry_wire_format() {
        let entry = JournalEntry::moved(PathBuf::from("a.txt"), PathBuf::from("Docs/a.txt"));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "MOVE");
        assert_eq!(json["from"], "a.txt");
        assert_eq!(json["to"], "Docs/a.txt");
    }

    #[test]
    fn test_plan_select_preserves_order() {
        let action = |name: &str, reason: &str| Action {
            from: PathBuf::from(name),
            to: PathBuf::from(reason).join(name),
            reason: reason.to_string(),
        };
        let plan = Plan::new(
            vec![
                action("a.pdf", "Documents"),
                action("b.png", "Images"),
                action("c.pdf", "Documents"),
            ],
            false,
        );

        let approved = plan.select(|a| a.reason == "Documents");
        assert_eq!(approved.len(), 2);
        assert_eq!(approved[0].from, PathBuf::from("a.pdf"));
        assert_eq!(approved[1].from, PathBuf::from("c.pdf"));
        assert_eq!(plan.category_counts()["Documents"], 2);
    }
}
