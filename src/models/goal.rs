use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::category::CategoryName;
use super::note::{Note, NoteInput};
use super::order::mean_progress;
use super::sub_goal::{SubGoal, SubGoalInput, SubGoalPatch};
use crate::error::StoreError;

/// Minimum number of categories a goal must carry.
pub const MIN_CATEGORIES: usize = 1;
/// Maximum number of categories a goal may carry.
pub const MAX_CATEGORIES: usize = 5;

/// A trackable team objective.
///
/// # Invariants
/// - `categories` holds between [`MIN_CATEGORIES`] and [`MAX_CATEGORIES`]
///   distinct names.
/// - While `sub_goals` is non-empty, `progress` is the rounded mean of the
///   sub-goals' progress and is not independently settable.
/// - `order` values across all goals form the dense sequence `0..N`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner: String,
    pub categories: Vec<CategoryName>,
    pub size: GoalSize,
    /// Completion percentage, 0–100.
    pub progress: u8,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status_note: Option<String>,
    /// Position on the board across the full, unfiltered goal list.
    pub order: u32,
    pub sub_goals: Vec<SubGoal>,
    pub notes: Vec<Note>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Priority tier of a goal, which also drives its card size on the board.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GoalSize {
    Xs,
    Small,
    #[default]
    Medium,
    Large,
    Xl,
}

impl GoalSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xs => "xs",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Xl => "xl",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "xs" => Some(Self::Xs),
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "xl" => Some(Self::Xl),
            _ => None,
        }
    }
}

impl Goal {
    pub fn has_sub_goals(&self) -> bool {
        !self.sub_goals.is_empty()
    }

    pub fn references(&self, category: &CategoryName) -> bool {
        self.categories.contains(category)
    }

    /// Re-derive `progress` from the sub-goals.
    ///
    /// With no sub-goals the current value is kept unless `reset_when_empty`
    /// is set, which is what removing the last sub-goal does.
    fn sync_progress(&mut self, reset_when_empty: bool) {
        if self.has_sub_goals() {
            self.progress = mean_progress(self.sub_goals.iter().map(|sg| sg.progress));
        } else if reset_when_empty {
            self.progress = 0;
        }
    }

    pub fn sub_goal_index(&self, sub_goal_id: Uuid) -> Option<usize> {
        self.sub_goals.iter().position(|sg| sg.id == sub_goal_id)
    }

    pub fn add_sub_goal(&mut self, sub_goal: SubGoal) {
        self.sub_goals.push(sub_goal);
        self.sync_progress(false);
    }

    /// Remove a sub-goal. Removing the last one resets progress to 0.
    pub fn remove_sub_goal(&mut self, sub_goal_id: Uuid) -> Option<SubGoal> {
        let index = self.sub_goal_index(sub_goal_id)?;
        let removed = self.sub_goals.remove(index);
        self.sync_progress(true);
        Some(removed)
    }

    /// Apply a partial edit to a sub-goal, re-aggregating progress.
    pub fn patch_sub_goal(&mut self, sub_goal_id: Uuid, patch: SubGoalPatch) -> bool {
        let Some(index) = self.sub_goal_index(sub_goal_id) else {
            return false;
        };
        patch.apply(&mut self.sub_goals[index]);
        self.sync_progress(false);
        true
    }

    /// Swap a sub-goal with its predecessor. Returns false at the top.
    pub fn move_sub_goal_up(&mut self, sub_goal_id: Uuid) -> bool {
        match self.sub_goal_index(sub_goal_id) {
            Some(index) if index > 0 => {
                self.sub_goals.swap(index, index - 1);
                true
            }
            _ => false,
        }
    }

    /// Swap a sub-goal with its successor. Returns false at the bottom.
    pub fn move_sub_goal_down(&mut self, sub_goal_id: Uuid) -> bool {
        match self.sub_goal_index(sub_goal_id) {
            Some(index) if index + 1 < self.sub_goals.len() => {
                self.sub_goals.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }

    /// Build the full-replace write for this goal's current state.
    pub fn to_input(&self) -> GoalInput {
        GoalInput {
            title: self.title.clone(),
            description: self.description.clone(),
            owner: self.owner.clone(),
            categories: self.categories.iter().map(|c| c.to_string()).collect(),
            size: self.size,
            progress: i32::from(self.progress),
            start_date: self.start_date,
            due_date: self.due_date,
            status_note: self.status_note.clone(),
            sub_goals: self.sub_goals.iter().map(SubGoalInput::from).collect(),
            notes: self.notes.iter().map(NoteInput::from).collect(),
        }
    }
}

/// Input for creating a goal or fully replacing an existing one.
///
/// Updates use delete-then-recreate semantics for `sub_goals` and `notes`:
/// whatever is supplied here becomes the complete new collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalInput {
    pub title: String,
    pub description: Option<String>,
    pub owner: String,
    pub categories: Vec<String>,
    #[serde(default)]
    pub size: GoalSize,
    /// Ignored when `sub_goals` is non-empty; progress is derived instead.
    #[serde(default)]
    pub progress: i32,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status_note: Option<String>,
    #[serde(default)]
    pub sub_goals: Vec<SubGoalInput>,
    #[serde(default)]
    pub notes: Vec<NoteInput>,
}

impl GoalInput {
    /// Minimal input with the required fields set.
    pub fn new(title: impl Into<String>, owner: impl Into<String>, categories: &[&str]) -> Self {
        Self {
            title: title.into(),
            description: None,
            owner: owner.into(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            size: GoalSize::default(),
            progress: 0,
            start_date: None,
            due_date: None,
            status_note: None,
            sub_goals: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Check every write invariant and return the normalized category set.
    ///
    /// Category names are trimmed and de-duplicated before the 1–5 bound is
    /// applied. Violations are rejected, never clamped.
    pub fn validate(&self) -> Result<Vec<CategoryName>, StoreError> {
        require_text("Goal title", &self.title)?;
        require_text("Goal owner", &self.owner)?;
        check_progress("Goal progress", self.progress)?;

        for sg in &self.sub_goals {
            require_text("Sub-goal title", &sg.title)?;
            require_text("Sub-goal owner", &sg.owner)?;
            check_progress("Sub-goal progress", sg.progress)?;
        }

        for note in &self.notes {
            require_text("Note content", &note.content)?;
        }

        unique_ids("Sub-goal", self.sub_goals.iter().filter_map(|sg| sg.id))?;
        unique_ids("Note", self.notes.iter().filter_map(|note| note.id))?;

        let mut categories: Vec<CategoryName> = Vec::with_capacity(self.categories.len());
        for raw in &self.categories {
            let name = CategoryName::new(raw.as_str())?;
            if !categories.contains(&name) {
                categories.push(name);
            }
        }

        if categories.len() < MIN_CATEGORIES || categories.len() > MAX_CATEGORIES {
            return Err(StoreError::validation(format!(
                "Must provide {}-{} categories (got {})",
                MIN_CATEGORIES,
                MAX_CATEGORIES,
                categories.len()
            )));
        }

        Ok(categories)
    }

    /// The progress the stored goal will carry: the sub-goal mean when there
    /// are sub-goals, otherwise the supplied value.
    ///
    /// Call after [`GoalInput::validate`]; out-of-range values saturate.
    pub fn effective_progress(&self) -> u8 {
        if self.sub_goals.is_empty() {
            clamp_progress(self.progress)
        } else {
            mean_progress(self.sub_goals.iter().map(|sg| clamp_progress(sg.progress)))
        }
    }
}

pub(crate) fn clamp_progress(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

fn require_text(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::validation(format!("{} is required", field)));
    }
    Ok(())
}

fn unique_ids(entity: &str, ids: impl Iterator<Item = Uuid>) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(StoreError::validation(format!(
                "{} id {} appears more than once",
                entity, id
            )));
        }
    }
    Ok(())
}

fn check_progress(field: &str, value: i32) -> Result<(), StoreError> {
    if !(0..=100).contains(&value) {
        return Err(StoreError::validation(format!(
            "{} must be between 0 and 100 (got {})",
            field, value
        )));
    }
    Ok(())
}
