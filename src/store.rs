//! In-memory board state backed by a persistence collaborator.
//!
//! [`GoalStore`] holds the latest known snapshot of goals and categories.
//! Every mutation that touches persisted data is confirmed by the
//! [`Persistence`] implementation before the snapshot is changed, so a
//! failed call leaves the store exactly as it was.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::*;

/// Storage the store writes through.
///
/// Implemented by [`crate::db::Database`] for in-process use and by
/// [`crate::client::GoalboardClient`] for talking to a running server.
/// Lookups that miss return [`StoreError::NotFound`].
#[allow(async_fn_in_trait)]
pub trait Persistence {
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn create_category(&self, input: CreateCategoryInput) -> Result<Category>;
    async fn update_category(&self, id: Uuid, input: UpdateCategoryInput) -> Result<Category>;
    async fn delete_category(&self, id: Uuid) -> Result<()>;

    async fn list_goals(&self) -> Result<Vec<Goal>>;
    async fn create_goal(&self, input: GoalInput) -> Result<Goal>;
    async fn update_goal(&self, id: Uuid, input: GoalInput) -> Result<Goal>;
    async fn delete_goal(&self, id: Uuid) -> Result<()>;
    async fn reorder_goals(&self, entries: Vec<ReorderEntry>) -> Result<()>;
}

pub struct GoalStore<P> {
    persistence: P,
    goals: Vec<Goal>,
    categories: Vec<Category>,
}

impl<P: Persistence> GoalStore<P> {
    /// An empty store. Call [`GoalStore::refresh`] to load the snapshot.
    pub fn new(persistence: P) -> Self {
        Self {
            persistence,
            goals: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub async fn load(persistence: P) -> Result<Self> {
        let mut store = Self::new(persistence);
        store.refresh().await?;
        Ok(store)
    }

    /// Replace the snapshot with the persisted state.
    pub async fn refresh(&mut self) -> Result<()> {
        let mut goals = self.persistence.list_goals().await?;
        let categories = self.persistence.list_categories().await?;
        goals.sort_by_key(|g| g.order);

        tracing::debug!(
            "Loaded {} goals and {} categories",
            goals.len(),
            categories.len()
        );
        self.goals = goals;
        self.categories = categories;
        Ok(())
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    // ============================================================
    // Queries
    // ============================================================

    /// All goals in board order.
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn goal(&self, id: Uuid) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == id)
    }

    pub fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Goals passing `filter`, in board order.
    pub fn visible_goals(&self, filter: &GoalFilter) -> Vec<&Goal> {
        filter.apply(&self.goals)
    }

    pub fn summary(&self, filter: &GoalFilter) -> BoardSummary {
        BoardSummary::compute(&self.goals, &self.visible_goals(filter))
    }

    pub fn owners(&self) -> Vec<String> {
        owners(&self.goals)
    }

    /// Display color per category name.
    pub fn category_colors(&self) -> BTreeMap<CategoryName, String> {
        self.categories
            .iter()
            .map(|c| (c.name.clone(), c.color.clone()))
            .collect()
    }

    /// Color for a category name, falling back to the default color for
    /// names the snapshot does not know yet.
    pub fn color_of(&self, name: &CategoryName) -> &str {
        self.categories
            .iter()
            .find(|c| &c.name == name)
            .map(|c| c.color.as_str())
            .unwrap_or(DEFAULT_CATEGORY_COLOR)
    }

    fn goal_index(&self, id: Uuid) -> Result<usize> {
        self.goals
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| StoreError::not_found("Goal", id))
    }

    fn category_index(&self, id: Uuid) -> Result<usize> {
        self.categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("Category", id))
    }

    // ============================================================
    // Goal writes
    // ============================================================

    /// Create a goal at the end of the board.
    pub async fn create_goal(&mut self, input: GoalInput) -> Result<Goal> {
        let names = input.validate()?;
        self.upsert_categories(&names).await?;

        let goal = self
            .persistence
            .create_goal(input)
            .await
            .inspect_err(|e| tracing::warn!(kind = e.kind(), "Create goal failed: {}", e))?;

        tracing::info!("Created goal '{}' ({})", goal.title, goal.id);
        self.goals.push(goal.clone());
        self.goals.sort_by_key(|g| g.order);
        Ok(goal)
    }

    /// Fully replace a goal. Sub-goals and notes in `input` become the new
    /// collections; progress is derived when sub-goals are present.
    pub async fn update_goal(&mut self, id: Uuid, input: GoalInput) -> Result<Goal> {
        let index = self.goal_index(id)?;
        let names = input.validate()?;
        self.upsert_categories(&names).await?;

        let goal = self
            .persistence
            .update_goal(id, input)
            .await
            .inspect_err(|e| tracing::warn!(kind = e.kind(), "Update goal {} failed: {}", id, e))?;

        tracing::debug!("Updated goal {}", id);
        self.goals[index] = goal.clone();
        Ok(goal)
    }

    /// Delete a goal with its sub-goals and notes. Remaining goals are
    /// renumbered so `order` stays dense.
    pub async fn delete_goal(&mut self, id: Uuid) -> Result<()> {
        let index = self.goal_index(id)?;

        self.persistence
            .delete_goal(id)
            .await
            .inspect_err(|e| tracing::warn!(kind = e.kind(), "Delete goal {} failed: {}", id, e))?;

        let removed = self.goals.remove(index);
        for (order, goal) in self.goals.iter_mut().enumerate() {
            goal.order = order as u32;
        }
        tracing::info!("Deleted goal '{}' ({})", removed.title, id);
        Ok(())
    }

    /// Move `active` to the position currently held by `over`.
    ///
    /// Positions are taken from the full, unfiltered collection; goals in
    /// between shift by one. Only goals whose order changed are sent to
    /// persistence. Dropping a goal on itself does nothing.
    pub async fn reorder(&mut self, active: Uuid, over: Uuid) -> Result<()> {
        if active == over {
            return Ok(());
        }

        let from = self.goal_index(active)?;
        let to = self.goal_index(over)?;

        let mut ids: Vec<Uuid> = self.goals.iter().map(|g| g.id).collect();
        move_index(&mut ids, from, to);

        let entries: Vec<ReorderEntry> = ids
            .iter()
            .enumerate()
            .map(|(order, &id)| ReorderEntry {
                id,
                order: order as u32,
            })
            .filter(|entry| self.goal(entry.id).is_some_and(|g| g.order != entry.order))
            .collect();

        if entries.is_empty() {
            return Ok(());
        }

        self.persistence
            .reorder_goals(entries.clone())
            .await
            .inspect_err(|e| tracing::warn!(kind = e.kind(), "Reorder failed: {}", e))?;

        for entry in &entries {
            if let Some(goal) = self.goals.iter_mut().find(|g| g.id == entry.id) {
                goal.order = entry.order;
            }
        }
        self.goals.sort_by_key(|g| g.order);

        tracing::debug!("Moved goal {} to position {} ({} changed)", active, to, entries.len());
        Ok(())
    }

    // ============================================================
    // Sub-goal writes
    // ============================================================

    /// Append a sub-goal with progress 0. The owner defaults to the goal's.
    pub async fn add_sub_goal(&mut self, goal_id: Uuid, new: NewSubGoal) -> Result<Uuid> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        let sub_goal = SubGoal {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            owner: new.owner.unwrap_or_else(|| edited.owner.clone()),
            progress: 0,
            start_date: None,
            due_date: None,
            status_note: None,
        };
        let id = sub_goal.id;
        edited.add_sub_goal(sub_goal);

        self.save_edit(edited).await?;
        Ok(id)
    }

    pub async fn update_sub_goal(
        &mut self,
        goal_id: Uuid,
        sub_goal_id: Uuid,
        patch: SubGoalPatch,
    ) -> Result<()> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        if !edited.patch_sub_goal(sub_goal_id, patch) {
            return Err(StoreError::not_found("Sub-goal", sub_goal_id));
        }
        self.save_edit(edited).await
    }

    /// Delete a sub-goal. Deleting the last one resets goal progress to 0.
    pub async fn delete_sub_goal(&mut self, goal_id: Uuid, sub_goal_id: Uuid) -> Result<()> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        if edited.remove_sub_goal(sub_goal_id).is_none() {
            return Err(StoreError::not_found("Sub-goal", sub_goal_id));
        }
        self.save_edit(edited).await
    }

    /// Returns `false` without writing when the sub-goal is already first.
    pub async fn move_sub_goal_up(&mut self, goal_id: Uuid, sub_goal_id: Uuid) -> Result<bool> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        if edited.sub_goal_index(sub_goal_id).is_none() {
            return Err(StoreError::not_found("Sub-goal", sub_goal_id));
        }
        if !edited.move_sub_goal_up(sub_goal_id) {
            return Ok(false);
        }
        self.save_edit(edited).await?;
        Ok(true)
    }

    /// Returns `false` without writing when the sub-goal is already last.
    pub async fn move_sub_goal_down(&mut self, goal_id: Uuid, sub_goal_id: Uuid) -> Result<bool> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        if edited.sub_goal_index(sub_goal_id).is_none() {
            return Err(StoreError::not_found("Sub-goal", sub_goal_id));
        }
        if !edited.move_sub_goal_down(sub_goal_id) {
            return Ok(false);
        }
        self.save_edit(edited).await?;
        Ok(true)
    }

    // ============================================================
    // Note writes
    // ============================================================

    /// Add a note at the top of the goal's note list.
    pub async fn add_note(&mut self, goal_id: Uuid, content: impl Into<String>) -> Result<Uuid> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        let note = Note {
            id: Uuid::new_v4(),
            content: content.into(),
            created_at: Utc::now(),
            is_pinned: false,
        };
        let id = note.id;
        edited.notes.insert(0, note);

        self.save_edit(edited).await?;
        Ok(id)
    }

    /// Flip a note's pin flag and return the new value.
    pub async fn toggle_note_pin(&mut self, goal_id: Uuid, note_id: Uuid) -> Result<bool> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        let note = edited
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| StoreError::not_found("Note", note_id))?;
        note.is_pinned = !note.is_pinned;
        let pinned = note.is_pinned;

        self.save_edit(edited).await?;
        Ok(pinned)
    }

    pub async fn delete_note(&mut self, goal_id: Uuid, note_id: Uuid) -> Result<()> {
        let mut edited = self.goals[self.goal_index(goal_id)?].clone();
        let before = edited.notes.len();
        edited.notes.retain(|n| n.id != note_id);
        if edited.notes.len() == before {
            return Err(StoreError::not_found("Note", note_id));
        }
        self.save_edit(edited).await
    }

    /// Write an edited copy of a goal as a full replace, applying the
    /// persisted result on success.
    async fn save_edit(&mut self, edited: Goal) -> Result<()> {
        self.update_goal(edited.id, edited.to_input()).await?;
        Ok(())
    }

    // ============================================================
    // Category writes
    // ============================================================

    pub async fn create_category(&mut self, input: CreateCategoryInput) -> Result<Category> {
        let name = CategoryName::new(input.name.as_str())?;
        if self.categories.iter().any(|c| c.name == name) {
            return Err(StoreError::conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let category = self.persistence.create_category(input).await?;
        tracing::info!("Created category '{}'", category.name);
        self.categories.push(category.clone());
        self.categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(category)
    }

    /// Rename a category. Every goal carrying the old name carries the new
    /// one afterwards.
    pub async fn rename_category(&mut self, id: Uuid, name: impl Into<String>) -> Result<Category> {
        let index = self.category_index(id)?;
        let name = CategoryName::new(name)?;
        if self.categories.iter().any(|c| c.name == name && c.id != id) {
            return Err(StoreError::conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let updated = self
            .persistence
            .update_category(
                id,
                UpdateCategoryInput {
                    name: Some(name.to_string()),
                    color: None,
                },
            )
            .await
            .inspect_err(|e| tracing::warn!(kind = e.kind(), "Rename category failed: {}", e))?;

        let old = std::mem::replace(&mut self.categories[index], updated.clone()).name;
        for goal in &mut self.goals {
            for category in &mut goal.categories {
                if *category == old {
                    *category = updated.name.clone();
                }
            }
        }
        self.categories.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::info!("Renamed category '{}' to '{}'", old, updated.name);
        Ok(updated)
    }

    pub async fn recolor_category(&mut self, id: Uuid, color: impl Into<String>) -> Result<Category> {
        let index = self.category_index(id)?;
        let updated = self
            .persistence
            .update_category(
                id,
                UpdateCategoryInput {
                    name: None,
                    color: Some(color.into()),
                },
            )
            .await?;

        self.categories[index] = updated.clone();
        Ok(updated)
    }

    /// Delete a category that no goal references.
    ///
    /// The check scans every goal's categories in the snapshot; a referenced
    /// category is refused without contacting persistence.
    pub async fn delete_category(&mut self, id: Uuid) -> Result<()> {
        let index = self.category_index(id)?;
        let name = &self.categories[index].name;

        let users = self.goals.iter().filter(|g| g.references(name)).count();
        if users > 0 {
            return Err(StoreError::conflict(format!(
                "Category '{}' is used by {} goal(s)",
                name, users
            )));
        }

        self.persistence.delete_category(id).await?;
        let removed = self.categories.remove(index);
        tracing::info!("Deleted category '{}'", removed.name);
        Ok(())
    }

    /// Create every category in `names` the snapshot does not know yet,
    /// with the default color. Each confirmed category is applied as soon
    /// as it is created.
    async fn upsert_categories(&mut self, names: &[CategoryName]) -> Result<()> {
        for name in names {
            if self.categories.iter().any(|c| &c.name == name) {
                continue;
            }

            let category = self
                .persistence
                .create_category(CreateCategoryInput {
                    name: name.to_string(),
                    color: DEFAULT_CATEGORY_COLOR.to_string(),
                })
                .await?;
            tracing::info!("Auto-created category '{}'", category.name);
            self.categories.push(category);
        }
        self.categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn store() -> GoalStore<Database> {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        GoalStore::load(db).await.unwrap()
    }

    #[tokio::test]
    async fn create_goal_upserts_unknown_categories() {
        let mut store = store().await;
        store
            .create_goal(GoalInput::new("Ship it", "kim", &["NEW"]))
            .await
            .unwrap();

        assert_eq!(store.categories().len(), 1);
        assert_eq!(store.categories()[0].color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(store.persistence().list_categories().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reorder_onto_self_is_a_noop() {
        let mut store = store().await;
        let a = store
            .create_goal(GoalInput::new("A", "kim", &["AI"]))
            .await
            .unwrap();
        store
            .create_goal(GoalInput::new("B", "kim", &["AI"]))
            .await
            .unwrap();

        store.reorder(a.id, a.id).await.unwrap();
        let orders: Vec<u32> = store.goals().iter().map(|g| g.order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[tokio::test]
    async fn new_sub_goal_inherits_goal_owner() {
        let mut store = store().await;
        let goal = store
            .create_goal(GoalInput::new("A", "park", &["AI"]))
            .await
            .unwrap();

        let sub_id = store
            .add_sub_goal(
                goal.id,
                NewSubGoal {
                    title: "First step".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let goal = store.goal(goal.id).unwrap();
        assert_eq!(goal.sub_goals[0].id, sub_id);
        assert_eq!(goal.sub_goals[0].owner, "park");
        assert_eq!(goal.sub_goals[0].progress, 0);
    }

    #[tokio::test]
    async fn color_of_unknown_category_is_default() {
        let store = store().await;
        let name = CategoryName::new("GHOST").unwrap();
        assert_eq!(store.color_of(&name), DEFAULT_CATEGORY_COLOR);
    }
}
