use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A child objective owned by exactly one goal.
///
/// Sub-goals have no numeric position field: their index in the parent's
/// `sub_goals` list is the order, and it can be changed with move up/down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGoal {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub owner: String,
    /// Completion percentage, 0–100.
    pub progress: u8,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status_note: Option<String>,
}

/// Sub-goal as supplied inside a goal write.
///
/// `id` is optional so clients can keep stable ids across full-replace
/// updates; a fresh id is assigned when it is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubGoalInput {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub owner: String,
    /// Defaults to 0.
    #[serde(default)]
    pub progress: i32,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status_note: Option<String>,
}

impl From<&SubGoal> for SubGoalInput {
    fn from(sg: &SubGoal) -> Self {
        Self {
            id: Some(sg.id),
            title: sg.title.clone(),
            description: sg.description.clone(),
            owner: sg.owner.clone(),
            progress: i32::from(sg.progress),
            start_date: sg.start_date,
            due_date: sg.due_date,
            status_note: sg.status_note.clone(),
        }
    }
}

/// A new sub-goal added from the board. Owner falls back to the parent
/// goal's owner.
#[derive(Debug, Clone, Default)]
pub struct NewSubGoal {
    pub title: String,
    pub description: Option<String>,
    pub owner: Option<String>,
}

/// Partial edit of an existing sub-goal. Absent fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct SubGoalPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub progress: Option<u8>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status_note: Option<String>,
}

impl SubGoalPatch {
    pub(crate) fn apply(self, sg: &mut SubGoal) {
        if let Some(title) = self.title {
            sg.title = title;
        }
        if let Some(description) = self.description {
            sg.description = Some(description);
        }
        if let Some(owner) = self.owner {
            sg.owner = owner;
        }
        if let Some(progress) = self.progress {
            sg.progress = progress;
        }
        if let Some(start) = self.start_date {
            sg.start_date = Some(start);
        }
        if let Some(due) = self.due_date {
            sg.due_date = Some(due);
        }
        if let Some(note) = self.status_note {
            sg.status_note = Some(note);
        }
    }
}
