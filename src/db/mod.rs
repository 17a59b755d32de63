//! SQLite persistence for categories and goals.
//!
//! Every write re-checks the board invariants so that raw API clients get
//! the same guarantees as the in-memory store: 1–5 categories per goal,
//! derived progress when sub-goals exist, a dense `order` sequence, and no
//! deletion of categories that are still referenced.

mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::models::*;
use crate::store::Persistence;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Path of the database in the platform data directory.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "goalboard")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("goalboard.db"))
    }

    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Category operations
    // ============================================================

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT id, name, color FROM categories ORDER BY name")?;

        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(categories)
    }

    pub fn find_category_by_name(&self, name: &CategoryName) -> Result<Option<Category>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        category_by_name(&conn, name)
    }

    pub fn create_category(&self, input: CreateCategoryInput) -> Result<Category> {
        let name = CategoryName::new(input.name)?;
        let color = validate_color(&input.color)?;

        let conn = self.conn.lock().expect("database lock poisoned");
        if category_by_name(&conn, &name)?.is_some() {
            return Err(StoreError::conflict(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO categories (id, name, color, created_at) VALUES (?, ?, ?, ?)",
            (id.to_string(), &name, &color, timestamp(now())),
        )?;

        Ok(Category { id, name, color })
    }

    /// Rename and/or recolor a category.
    ///
    /// Goals reference categories through `goal_categories`, so a rename is
    /// visible on every referencing goal as soon as this transaction commits.
    pub fn update_category(&self, id: Uuid, input: UpdateCategoryInput) -> Result<Option<Category>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let Some(existing) = category_by_id(&tx, id)? else {
            return Ok(None);
        };

        let name = match input.name {
            Some(raw) => CategoryName::new(raw)?,
            None => existing.name.clone(),
        };
        let color = match input.color {
            Some(raw) => validate_color(&raw)?,
            None => existing.color.clone(),
        };

        let renamed = name != existing.name;
        if renamed {
            if let Some(other) = category_by_name(&tx, &name)? {
                if other.id != id {
                    return Err(StoreError::conflict(format!(
                        "Category '{}' already exists",
                        name
                    )));
                }
            }
        }

        tx.execute(
            "UPDATE categories SET name = ?, color = ? WHERE id = ?",
            (&name, &color, id.to_string()),
        )?;

        if renamed {
            let touched = tx.execute(
                "UPDATE goals SET updated_at = ?
                 WHERE id IN (SELECT goal_id FROM goal_categories WHERE category_id = ?)",
                (timestamp(now()), id.to_string()),
            )?;
            tracing::info!(
                "Renamed category '{}' to '{}' ({} goals)",
                existing.name,
                name,
                touched
            );
        }

        tx.commit()?;

        Ok(Some(Category { id, name, color }))
    }

    /// Delete a category. Refused with `Conflict` while any goal uses it.
    pub fn delete_category(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let Some(existing) = category_by_id(&tx, id)? else {
            return Ok(false);
        };

        let references: i64 = tx.query_row(
            "SELECT COUNT(*) FROM goal_categories WHERE category_id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if references > 0 {
            return Err(StoreError::conflict(format!(
                "Category '{}' is used by {} goal(s)",
                existing.name, references
            )));
        }

        tx.execute("DELETE FROM categories WHERE id = ?", [id.to_string()])?;
        tx.commit()?;
        Ok(true)
    }

    // ============================================================
    // Goal operations
    // ============================================================

    /// All goals in board order, with sub-goals in position order and notes
    /// newest first.
    pub fn list_goals(&self) -> Result<Vec<Goal>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM goals ORDER BY sort_order, created_at",
            GOAL_COLUMNS
        ))?;

        let mut goals = stmt
            .query_map([], goal_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for goal in &mut goals {
            load_children(&conn, goal)?;
        }

        Ok(goals)
    }

    pub fn get_goal(&self, id: Uuid) -> Result<Option<Goal>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        goal_by_id(&conn, id)
    }

    /// Create a goal at the end of the board.
    ///
    /// Unknown category names are created with [`DEFAULT_CATEGORY_COLOR`]
    /// before the goal row is written.
    pub fn create_goal(&self, input: GoalInput) -> Result<Goal> {
        let categories = input.validate()?;

        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let id = Uuid::new_v4();
        let now = now();

        let category_ids = upsert_categories(&tx, &categories)?;
        let order: u32 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM goals",
            [],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO goals (id, title, description, owner, size, progress, start_date, due_date, status_note, sort_order, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.title.trim(),
                &input.description,
                input.owner.trim(),
                input.size.as_str(),
                input.effective_progress(),
                input.start_date.map(|d| d.to_string()),
                input.due_date.map(|d| d.to_string()),
                &input.status_note,
                order,
                timestamp(now),
                timestamp(now),
            ),
        )?;

        write_children(&tx, id, &category_ids, &input, now)?;

        let goal = goal_by_id(&tx, id)?.ok_or_else(|| StoreError::not_found("Goal", id))?;
        tx.commit()?;

        tracing::debug!("Created goal {} at order {}", id, order);
        Ok(goal)
    }

    /// Replace a goal's fields, categories, sub-goals and notes.
    ///
    /// `order` and `created_at` are kept; use [`Database::reorder_goals`] to
    /// move a goal.
    pub fn update_goal(&self, id: Uuid, input: GoalInput) -> Result<Option<Goal>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let exists: Option<String> = tx
            .query_row("SELECT id FROM goals WHERE id = ?", [id.to_string()], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let categories = input.validate()?;

        // Dropping the last sub-goal resets progress rather than keeping the
        // derived value the caller echoed back.
        let stored_sub_goals: i64 = tx.query_row(
            "SELECT COUNT(*) FROM sub_goals WHERE goal_id = ?",
            [id.to_string()],
            |row| row.get(0),
        )?;
        let progress = if stored_sub_goals > 0 && input.sub_goals.is_empty() {
            0
        } else {
            input.effective_progress()
        };

        let now = now();
        let category_ids = upsert_categories(&tx, &categories)?;

        tx.execute(
            "UPDATE goals SET title = ?, description = ?, owner = ?, size = ?, progress = ?, start_date = ?, due_date = ?, status_note = ?, updated_at = ?
             WHERE id = ?",
            (
                input.title.trim(),
                &input.description,
                input.owner.trim(),
                input.size.as_str(),
                progress,
                input.start_date.map(|d| d.to_string()),
                input.due_date.map(|d| d.to_string()),
                &input.status_note,
                timestamp(now),
                id.to_string(),
            ),
        )?;

        tx.execute(
            "DELETE FROM goal_categories WHERE goal_id = ?",
            [id.to_string()],
        )?;
        tx.execute("DELETE FROM sub_goals WHERE goal_id = ?", [id.to_string()])?;
        tx.execute("DELETE FROM notes WHERE goal_id = ?", [id.to_string()])?;
        write_children(&tx, id, &category_ids, &input, now)?;

        let goal = goal_by_id(&tx, id)?;
        tx.commit()?;
        Ok(goal)
    }

    /// Delete a goal with its sub-goals and notes, then close the gap it
    /// leaves in the board order.
    pub fn delete_goal(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        let rows = tx.execute("DELETE FROM goals WHERE id = ?", [id.to_string()])?;
        if rows == 0 {
            return Ok(false);
        }

        compact_order(&tx)?;
        tx.commit()?;
        Ok(true)
    }

    /// Apply a batch of order changes atomically.
    ///
    /// The batch may cover only the goals whose position changed, but the
    /// resulting order across all goals must be exactly `0..N`. Unknown ids
    /// and non-dense results roll the whole batch back.
    pub fn reorder_goals(&self, entries: &[ReorderEntry]) -> Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;

        for entry in entries {
            let rows = tx.execute(
                "UPDATE goals SET sort_order = ? WHERE id = ?",
                (entry.order, entry.id.to_string()),
            )?;
            if rows == 0 {
                return Err(StoreError::not_found("Goal", entry.id));
            }
        }

        let orders = {
            let mut stmt = tx.prepare("SELECT sort_order FROM goals")?;
            let orders = stmt
                .query_map([], |row| row.get::<_, u32>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            orders
        };
        if !is_dense(orders) {
            return Err(StoreError::validation(
                "Reorder must leave goal orders numbered 0..N-1 without gaps or duplicates",
            ));
        }

        tx.commit()?;
        tracing::debug!("Reordered {} goals", entries.len());
        Ok(())
    }

    /// Sorted owners of all goals and sub-goals.
    pub fn owners(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT owner FROM goals UNION SELECT owner FROM sub_goals ORDER BY owner",
        )?;
        let owners = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(owners)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

impl Persistence for Database {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        Database::list_categories(self)
    }

    async fn create_category(&self, input: CreateCategoryInput) -> Result<Category> {
        Database::create_category(self, input)
    }

    async fn update_category(&self, id: Uuid, input: UpdateCategoryInput) -> Result<Category> {
        Database::update_category(self, id, input)?
            .ok_or_else(|| StoreError::not_found("Category", id))
    }

    async fn delete_category(&self, id: Uuid) -> Result<()> {
        if Database::delete_category(self, id)? {
            Ok(())
        } else {
            Err(StoreError::not_found("Category", id))
        }
    }

    async fn list_goals(&self) -> Result<Vec<Goal>> {
        Database::list_goals(self)
    }

    async fn create_goal(&self, input: GoalInput) -> Result<Goal> {
        Database::create_goal(self, input)
    }

    async fn update_goal(&self, id: Uuid, input: GoalInput) -> Result<Goal> {
        Database::update_goal(self, id, input)?.ok_or_else(|| StoreError::not_found("Goal", id))
    }

    async fn delete_goal(&self, id: Uuid) -> Result<()> {
        if Database::delete_goal(self, id)? {
            Ok(())
        } else {
            Err(StoreError::not_found("Goal", id))
        }
    }

    async fn reorder_goals(&self, entries: Vec<ReorderEntry>) -> Result<()> {
        Database::reorder_goals(self, &entries)
    }
}

// ============================================================
// Row mapping and shared statements
// ============================================================

const GOAL_COLUMNS: &str = "id, title, description, owner, size, progress, start_date, due_date, status_note, sort_order, created_at, updated_at";

impl FromSql for CategoryName {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        CategoryName::new(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for CategoryName {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

fn category_from_row(row: &rusqlite::Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        color: row.get(2)?,
    })
}

fn goal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        owner: row.get(3)?,
        categories: Vec::new(),
        size: GoalSize::from_str(&row.get::<_, String>(4)?).unwrap_or_default(),
        progress: row.get(5)?,
        start_date: parse_date(row.get(6)?),
        due_date: parse_date(row.get(7)?),
        status_note: row.get(8)?,
        order: row.get(9)?,
        sub_goals: Vec::new(),
        notes: Vec::new(),
        created_at: parse_datetime(row.get::<_, String>(10)?),
        updated_at: parse_datetime(row.get::<_, String>(11)?),
    })
}

fn category_by_id(conn: &Connection, id: Uuid) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, color FROM categories WHERE id = ?",
            [id.to_string()],
            category_from_row,
        )
        .optional()?;
    Ok(category)
}

fn category_by_name(conn: &Connection, name: &CategoryName) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name, color FROM categories WHERE name = ?",
            [name],
            category_from_row,
        )
        .optional()?;
    Ok(category)
}

fn goal_by_id(conn: &Connection, id: Uuid) -> Result<Option<Goal>> {
    let goal = conn
        .query_row(
            &format!("SELECT {} FROM goals WHERE id = ?", GOAL_COLUMNS),
            [id.to_string()],
            goal_from_row,
        )
        .optional()?;

    match goal {
        Some(mut goal) => {
            load_children(conn, &mut goal)?;
            Ok(Some(goal))
        }
        None => Ok(None),
    }
}

fn load_children(conn: &Connection, goal: &mut Goal) -> Result<()> {
    let goal_id = goal.id.to_string();

    let mut stmt = conn.prepare(
        "SELECT c.name FROM goal_categories gc
         JOIN categories c ON c.id = gc.category_id
         WHERE gc.goal_id = ? ORDER BY c.name",
    )?;
    goal.categories = stmt
        .query_map([&goal_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<CategoryName>>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, title, description, owner, progress, start_date, due_date, status_note
         FROM sub_goals WHERE goal_id = ? ORDER BY position",
    )?;
    goal.sub_goals = stmt
        .query_map([&goal_id], |row| {
            Ok(SubGoal {
                id: parse_uuid(row.get::<_, String>(0)?),
                title: row.get(1)?,
                description: row.get(2)?,
                owner: row.get(3)?,
                progress: row.get(4)?,
                start_date: parse_date(row.get(5)?),
                due_date: parse_date(row.get(6)?),
                status_note: row.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, content, is_pinned, created_at
         FROM notes WHERE goal_id = ? ORDER BY created_at DESC, rowid DESC",
    )?;
    goal.notes = stmt
        .query_map([&goal_id], |row| {
            Ok(Note {
                id: parse_uuid(row.get::<_, String>(0)?),
                content: row.get(1)?,
                is_pinned: row.get(2)?,
                created_at: parse_datetime(row.get::<_, String>(3)?),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(())
}

/// Resolve category names to ids, creating missing categories with the
/// default color. This is the explicit upsert step of every goal write.
fn upsert_categories(conn: &Connection, names: &[CategoryName]) -> Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(names.len());
    for name in names {
        let id = match category_by_name(conn, name)? {
            Some(category) => category.id,
            None => {
                let id = Uuid::new_v4();
                conn.execute(
                    "INSERT INTO categories (id, name, color, created_at) VALUES (?, ?, ?, ?)",
                    (id.to_string(), name, DEFAULT_CATEGORY_COLOR, timestamp(now())),
                )?;
                tracing::info!("Auto-created category '{}'", name);
                id
            }
        };
        ids.push(id);
    }
    Ok(ids)
}

fn write_children(
    conn: &Connection,
    goal_id: Uuid,
    category_ids: &[Uuid],
    input: &GoalInput,
    now: DateTime<Utc>,
) -> Result<()> {
    for category_id in category_ids {
        conn.execute(
            "INSERT INTO goal_categories (goal_id, category_id) VALUES (?, ?)",
            (goal_id.to_string(), category_id.to_string()),
        )?;
    }

    for (position, sg) in input.sub_goals.iter().enumerate() {
        if let Some(id) = sg.id {
            claim_child_id(conn, "sub_goals", "Sub-goal", id)?;
        }
        conn.execute(
            "INSERT INTO sub_goals (id, goal_id, position, title, description, owner, progress, start_date, due_date, status_note, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                sg.id.unwrap_or_else(Uuid::new_v4).to_string(),
                goal_id.to_string(),
                position as i64,
                sg.title.trim(),
                &sg.description,
                sg.owner.trim(),
                clamp_progress(sg.progress),
                sg.start_date.map(|d| d.to_string()),
                sg.due_date.map(|d| d.to_string()),
                &sg.status_note,
                timestamp(now),
            ),
        )?;
    }

    for note in &input.notes {
        if let Some(id) = note.id {
            claim_child_id(conn, "notes", "Note", id)?;
        }
        let created_at = note.created_at.map(|t| t.trunc_subsecs(6)).unwrap_or(now);
        conn.execute(
            "INSERT INTO notes (id, goal_id, content, is_pinned, created_at) VALUES (?, ?, ?, ?, ?)",
            (
                note.id.unwrap_or_else(Uuid::new_v4).to_string(),
                goal_id.to_string(),
                &note.content,
                note.is_pinned,
                timestamp(created_at),
            ),
        )?;
    }

    Ok(())
}

/// Fail with a conflict when a supplied child id is already stored.
///
/// Callers clear the goal's own children first, so any hit belongs to
/// another goal.
fn claim_child_id(conn: &Connection, table: &str, entity: &str, id: Uuid) -> Result<()> {
    let owner: Option<String> = conn
        .query_row(
            &format!("SELECT goal_id FROM {} WHERE id = ?", table),
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        Some(goal_id) => Err(StoreError::conflict(format!(
            "{} {} already belongs to goal {}",
            entity, id, goal_id
        ))),
        None => Ok(()),
    }
}

/// Renumber goals to `0..N` keeping their relative order.
fn compact_order(conn: &Connection) -> Result<()> {
    let ids = {
        let mut stmt = conn.prepare("SELECT id FROM goals ORDER BY sort_order, created_at")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids
    };

    for (order, id) in ids.iter().enumerate() {
        conn.execute(
            "UPDATE goals SET sort_order = ? WHERE id = ? AND sort_order != ?",
            (order as i64, id, order as i64),
        )?;
    }
    Ok(())
}

fn validate_color(raw: &str) -> Result<String> {
    let color = raw.trim();
    if color.is_empty() {
        return Err(StoreError::validation("Category color must not be empty"));
    }
    Ok(color.to_string())
}

/// Current time at the precision timestamps are stored with.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_date(s: Option<String>) -> Option<NaiveDate> {
    s.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
