use serde::{Deserialize, Serialize};

use super::goal::Goal;
use super::order::mean_progress;

/// Board roll-up shown above the goal cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub total_goals: usize,
    /// Rounded mean progress over every goal, 0 when there are none.
    pub overall_progress: u8,
    pub filtered_goals: usize,
    /// Rounded mean progress over the visible goals, 0 when none are visible.
    pub filtered_progress: u8,
}

impl BoardSummary {
    pub fn compute(all: &[Goal], visible: &[&Goal]) -> Self {
        Self {
            total_goals: all.len(),
            overall_progress: mean_progress(all.iter().map(|g| g.progress)),
            filtered_goals: visible.len(),
            filtered_progress: mean_progress(visible.iter().map(|g| g.progress)),
        }
    }
}

/// Sorted, de-duplicated owners of every goal and sub-goal.
pub fn owners(goals: &[Goal]) -> Vec<String> {
    let mut owners: Vec<String> = goals
        .iter()
        .flat_map(|g| {
            std::iter::once(g.owner.clone()).chain(g.sub_goals.iter().map(|sg| sg.owner.clone()))
        })
        .collect();
    owners.sort();
    owners.dedup();
    owners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryName, GoalSize, SubGoal};
    use chrono::Utc;
    use uuid::Uuid;

    fn goal(owner: &str, progress: u8, sub_owners: &[&str]) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            title: "g".to_string(),
            description: None,
            owner: owner.to_string(),
            categories: vec![CategoryName::new("AI").unwrap()],
            size: GoalSize::Small,
            progress,
            start_date: None,
            due_date: None,
            status_note: None,
            order: 0,
            sub_goals: sub_owners
                .iter()
                .map(|o| SubGoal {
                    id: Uuid::new_v4(),
                    title: "s".to_string(),
                    description: None,
                    owner: o.to_string(),
                    progress,
                    start_date: None,
                    due_date: None,
                    status_note: None,
                })
                .collect(),
            notes: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_of_empty_board_is_zero() {
        let s = BoardSummary::compute(&[], &[]);
        assert_eq!(s.total_goals, 0);
        assert_eq!(s.overall_progress, 0);
        assert_eq!(s.filtered_progress, 0);
    }

    #[test]
    fn summary_averages_all_and_visible() {
        let goals = vec![goal("a", 10, &[]), goal("b", 25, &[]), goal("c", 90, &[])];
        let visible: Vec<&Goal> = goals.iter().take(2).collect();
        let s = BoardSummary::compute(&goals, &visible);
        assert_eq!(s.total_goals, 3);
        assert_eq!(s.overall_progress, 42);
        assert_eq!(s.filtered_goals, 2);
        assert_eq!(s.filtered_progress, 18);
    }

    #[test]
    fn owners_include_sub_goal_owners_once() {
        let goals = vec![goal("kim", 0, &["lee", "kim"]), goal("choi", 0, &["lee"])];
        assert_eq!(owners(&goals), vec!["choi", "kim", "lee"]);
    }
}
