//! Sample data for a fresh board.

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::Result;
use crate::models::*;

/// Categories every seeded board starts with, as `(name, color)`.
pub const SEED_CATEGORIES: &[(&str, &str)] = &[
    ("SERVICE", "#3b82f6"),
    ("AI", "#8b5cf6"),
    ("OPERATIONS", "#10b981"),
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub goals_created: Vec<String>,
}

/// Create the seed categories that are missing and, if the board has no
/// goals yet, three sample goals (one with sub-goals and a note). Existing
/// categories keep their color.
pub fn seed(db: &Database) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for (name, color) in SEED_CATEGORIES {
        if db.find_category_by_name(&CategoryName::new(*name)?)?.is_some() {
            continue;
        }
        db.create_category(CreateCategoryInput {
            name: name.to_string(),
            color: color.to_string(),
        })?;
        report.categories_created += 1;
    }

    if !db.list_goals()?.is_empty() {
        tracing::info!("Board already has goals, skipping sample goals");
        return Ok(report);
    }

    for input in sample_goals() {
        let goal = db.create_goal(input)?;
        report.goals_created.push(goal.title);
    }

    tracing::info!(
        "Seeded {} categories and {} goals",
        report.categories_created,
        report.goals_created.len()
    );
    Ok(report)
}

fn sample_goals() -> Vec<GoalInput> {
    let mut chatbot = sample(
        "Build AI chatbot",
        "AI chatbot for first-line customer support",
        "Kim",
        "AI",
        40,
        GoalSize::Medium,
        ("2025-02-01", "2025-08-31"),
        "Design phase",
    );
    chatbot.sub_goals = vec![
        sample_step("Pick an LLM vendor", "Kim", 50),
        sample_step("Pilot with the support team", "Park", 30),
    ];
    chatbot.notes = vec![NoteInput {
        id: None,
        content: "Vendor comparison: https://example.com/llm-vendors".to_string(),
        is_pinned: true,
        created_at: None,
    }];

    vec![
        sample(
            "Improve customer service",
            "Raise customer satisfaction through better service quality",
            "Hong",
            "SERVICE",
            60,
            GoalSize::Large,
            ("2025-01-01", "2025-06-30"),
            "In progress",
        ),
        chatbot,
        sample(
            "Automate operations",
            "Automate repetitive work to improve efficiency",
            "Lee",
            "OPERATIONS",
            80,
            GoalSize::Small,
            ("2025-01-15", "2025-04-30"),
            "Almost done",
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn sample(
    title: &str,
    description: &str,
    owner: &str,
    category: &str,
    progress: i32,
    size: GoalSize,
    (start, due): (&str, &str),
    status_note: &str,
) -> GoalInput {
    let mut input = GoalInput::new(title, owner, &[category]);
    input.description = Some(description.to_string());
    input.progress = progress;
    input.size = size;
    input.start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok();
    input.due_date = NaiveDate::parse_from_str(due, "%Y-%m-%d").ok();
    input.status_note = Some(status_note.to_string());
    input
}

fn sample_step(title: &str, owner: &str, progress: i32) -> SubGoalInput {
    SubGoalInput {
        id: None,
        title: title.to_string(),
        description: None,
        owner: owner.to_string(),
        progress,
        start_date: None,
        due_date: None,
        status_note: None,
    }
}
