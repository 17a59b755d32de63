//! Plain-text rendering of the board for the CLI.

use crate::models::{BoardSummary, Category, Goal, GoalSize};

const BAR_WIDTH: usize = 10;
const FILLED: char = '█';
const EMPTY: char = '░';
const PIN: char = '*';

fn size_label(size: GoalSize) -> &'static str {
    match size {
        GoalSize::Xs => "XS",
        GoalSize::Small => "S",
        GoalSize::Medium => "M",
        GoalSize::Large => "L",
        GoalSize::Xl => "XL",
    }
}

/// Fixed-width progress bar, e.g. `███░░░░░░░  30%`.
pub fn progress_bar(progress: u8) -> String {
    let filled = (usize::from(progress.min(100)) * BAR_WIDTH + 50) / 100;
    let mut bar: String = std::iter::repeat(FILLED).take(filled).collect();
    bar.extend(std::iter::repeat(EMPTY).take(BAR_WIDTH - filled));
    format!("{} {:>3}%", bar, progress)
}

/// Render goals in board order with their sub-goals and pinned notes.
///
/// Example output:
/// ```text
/// 1. Launch chatbot [L] @kim  (AI, SERVICE)
///    ██████░░░░  61%
///    ├── Pilot in CS team @lee ████░░░░░░  40%
///    └── Rollout @kim ████████░░  81%
///    * Vendor contract signed
/// ```
pub fn render_board(goals: &[&Goal]) -> String {
    let mut output = String::new();
    for (i, goal) in goals.iter().enumerate() {
        render_goal(&mut output, i + 1, goal);
    }
    output
}

fn render_goal(output: &mut String, position: usize, goal: &Goal) {
    let categories: Vec<&str> = goal.categories.iter().map(|c| c.as_str()).collect();
    output.push_str(&format!(
        "{}. {} [{}] @{}  ({})\n",
        position,
        goal.title,
        size_label(goal.size),
        goal.owner,
        categories.join(", ")
    ));
    output.push_str(&format!("   {}", progress_bar(goal.progress)));
    if let Some(due) = goal.due_date {
        output.push_str(&format!("  due {}", due));
    }
    output.push('\n');

    for (i, sg) in goal.sub_goals.iter().enumerate() {
        let branch = if i == goal.sub_goals.len() - 1 {
            "└── "
        } else {
            "├── "
        };
        output.push_str(&format!(
            "   {}{} @{} {}\n",
            branch,
            sg.title,
            sg.owner,
            progress_bar(sg.progress)
        ));
    }

    for note in goal.notes.iter().filter(|n| n.is_pinned) {
        output.push_str(&format!("   {} {}\n", PIN, note.content));
    }
}

pub fn render_summary(summary: &BoardSummary) -> String {
    if summary.filtered_goals == summary.total_goals {
        format!(
            "{} goals, {}% overall",
            summary.total_goals, summary.overall_progress
        )
    } else {
        format!(
            "{} goals, {}% overall (showing {}, {}%)",
            summary.total_goals,
            summary.overall_progress,
            summary.filtered_goals,
            summary.filtered_progress
        )
    }
}

pub fn render_categories(categories: &[Category]) -> String {
    let mut output = String::new();
    for category in categories {
        output.push_str(&format!("{} {}\n", category.color, category.name));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryName, Note, SubGoal};
    use chrono::Utc;
    use uuid::Uuid;

    fn goal() -> Goal {
        Goal {
            id: Uuid::new_v4(),
            title: "Launch chatbot".to_string(),
            description: None,
            owner: "kim".to_string(),
            categories: vec![
                CategoryName::new("AI").unwrap(),
                CategoryName::new("SERVICE").unwrap(),
            ],
            size: GoalSize::Large,
            progress: 61,
            start_date: None,
            due_date: None,
            status_note: None,
            order: 0,
            sub_goals: vec![
                SubGoal {
                    id: Uuid::new_v4(),
                    title: "Pilot".to_string(),
                    description: None,
                    owner: "lee".to_string(),
                    progress: 40,
                    start_date: None,
                    due_date: None,
                    status_note: None,
                },
                SubGoal {
                    id: Uuid::new_v4(),
                    title: "Rollout".to_string(),
                    description: None,
                    owner: "kim".to_string(),
                    progress: 81,
                    start_date: None,
                    due_date: None,
                    status_note: None,
                },
            ],
            notes: vec![
                Note {
                    id: Uuid::new_v4(),
                    content: "Vendor contract signed".to_string(),
                    created_at: Utc::now(),
                    is_pinned: true,
                },
                Note {
                    id: Uuid::new_v4(),
                    content: "unpinned chatter".to_string(),
                    created_at: Utc::now(),
                    is_pinned: false,
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(progress_bar(0), "░░░░░░░░░░   0%");
        assert_eq!(progress_bar(100), "██████████ 100%");
        assert_eq!(progress_bar(61), "██████░░░░  61%");
    }

    #[test]
    fn board_lists_sub_goals_as_branches() {
        let g = goal();
        let output = render_board(&[&g]);
        assert!(output.starts_with("1. Launch chatbot [L] @kim  (AI, SERVICE)\n"));
        assert!(output.contains("├── Pilot @lee"));
        assert!(output.contains("└── Rollout @kim"));
    }

    #[test]
    fn board_shows_only_pinned_notes() {
        let g = goal();
        let output = render_board(&[&g]);
        assert!(output.contains("* Vendor contract signed"));
        assert!(!output.contains("unpinned chatter"));
    }

    #[test]
    fn summary_mentions_filter_only_when_narrowed() {
        let all = BoardSummary {
            total_goals: 3,
            overall_progress: 42,
            filtered_goals: 3,
            filtered_progress: 42,
        };
        assert_eq!(render_summary(&all), "3 goals, 42% overall");

        let narrowed = BoardSummary {
            filtered_goals: 1,
            filtered_progress: 90,
            ..all
        };
        assert_eq!(render_summary(&narrowed), "3 goals, 42% overall (showing 1, 90%)");
    }
}
