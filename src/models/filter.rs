use serde::{Deserialize, Serialize};

use super::category::CategoryName;
use super::goal::Goal;

/// Board filter. A goal is visible when all three predicates hold.
///
/// - `categories`: `None` selects every category; `Some(list)` keeps goals
///   sharing at least one category with `list` (an empty list hides all).
/// - `owner`: `None` matches anyone, otherwise an exact owner match.
/// - `search`: case-insensitive substring of title, description or owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalFilter {
    pub categories: Option<Vec<CategoryName>>,
    pub owner: Option<String>,
    pub search: Option<String>,
}

impl GoalFilter {
    pub fn is_empty(&self) -> bool {
        self.categories.is_none() && self.owner.is_none() && self.search.is_none()
    }

    pub fn matches(&self, goal: &Goal) -> bool {
        if let Some(selected) = &self.categories {
            if !goal.categories.iter().any(|c| selected.contains(c)) {
                return false;
            }
        }

        if let Some(owner) = &self.owner {
            if &goal.owner != owner {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_title = goal.title.to_lowercase().contains(&needle);
            let in_description = goal
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            let in_owner = goal.owner.to_lowercase().contains(&needle);
            if !(in_title || in_description || in_owner) {
                return false;
            }
        }

        true
    }

    /// Goals passing the filter, in their board order.
    pub fn apply<'a>(&self, goals: &'a [Goal]) -> Vec<&'a Goal> {
        goals.iter().filter(|g| self.matches(g)).collect()
    }
}

/// Query-string form of [`GoalFilter`].
///
/// `categories` is comma-separated; `categories=` (present but empty)
/// selects no category at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalQuery {
    pub categories: Option<String>,
    pub owner: Option<String>,
    pub q: Option<String>,
}

impl From<GoalQuery> for GoalFilter {
    fn from(query: GoalQuery) -> Self {
        let categories = query.categories.map(|raw| {
            raw.split(',')
                .filter_map(|name| CategoryName::new(name).ok())
                .collect()
        });
        let owner = query.owner.filter(|o| !o.is_empty());
        let search = query.q.filter(|q| !q.trim().is_empty());

        Self {
            categories,
            owner,
            search,
        }
    }
}

impl From<&GoalFilter> for GoalQuery {
    fn from(filter: &GoalFilter) -> Self {
        Self {
            categories: filter.categories.as_ref().map(|names| {
                names
                    .iter()
                    .map(CategoryName::as_str)
                    .collect::<Vec<_>>()
                    .join(",")
            }),
            owner: filter.owner.clone(),
            q: filter.search.clone(),
        }
    }
}
