use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use log::{debug, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// Format used to store and display deadlines.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where a task is in its life. Storage keeps this as the nullable
/// `deleted_at` column.
#[derive(Debug, Clone, PartialEq)]
pub enum Lifecycle {
    Active,
    Deleted(DateTime<Local>),
}

/// A single task, saved as an entry in the tasks table.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub deadline: NaiveDate,
    pub status: String,
    pub lifecycle: Lifecycle,
}

/// The user editable part of a task, as written by insert and update.
/// The deadline is kept as the text the user typed.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub deadline: String,
    pub status: String,
}

impl Task {
    pub fn fields(&self) -> TaskFields {
        TaskFields {
            title: self.title.clone(),
            description: self.description.clone(),
            assignee: self.assignee.clone(),
            deadline: self.deadline.format(DATE_FORMAT).to_string(),
            status: self.status.clone(),
        }
    }
}

/// Open the task database, creating the table if it is missing.
pub fn open_database(path: &Path) -> Result<Connection> {
    let db = Connection::open(path)
        .with_context(|| format!("Failed to open database {}.", path.display()))?;
    debug!("opened database {}", path.display());
    init_tasks(&db)?;
    register_functions(&db)?;
    Ok(db)
}

/// `lower_unicode(text)`: full Unicode lower casing, which SQLite's
/// `lower()` and `LIKE` only do for ASCII.
fn register_functions(db: &Connection) -> Result<()> {
    db.create_scalar_function(
        "lower_unicode",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<String>(0)?;
            Ok(text.to_lowercase())
        },
    )
    .context("Failed to register lower_unicode function.")?;
    Ok(())
}

/// Initialize the tasks table.
pub fn init_tasks(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE IF NOT EXISTS tasks (
                  id              INTEGER PRIMARY KEY AUTOINCREMENT,
                  title           TEXT NOT NULL,
                  description     TEXT NOT NULL,
                  assignee        TEXT NOT NULL,
                  deadline        TEXT NOT NULL,
                  status          TEXT NOT NULL,
                  deleted_at      TEXT
                  )",
        [],
    )
    .context("Failed to create tasks table.")?;
    Ok(())
}

/// Insert a new active task and return its id.
pub fn add_task(db: &Connection, fields: &TaskFields) -> Result<i64> {
    debug!(
        "inserting ({}, {}, {}, {}, {})",
        fields.title, fields.description, fields.assignee, fields.deadline, fields.status
    );
    db.execute(
        "INSERT INTO tasks (title, description, assignee, deadline, status) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            fields.title,
            fields.description,
            fields.assignee,
            fields.deadline,
            fields.status
        ],
    )
    .context("Failed to insert task to database.")?;
    Ok(db.last_insert_rowid())
}

/// Active tasks where the keyword appears, ignoring case, in the title,
/// description, assignee or status. An empty keyword matches every
/// active task.
pub fn search_tasks(db: &Connection, keyword: &str) -> Result<Vec<Task>> {
    let pattern = format!("%{}%", keyword);
    let mut stmt = db
        .prepare(
            "SELECT id, title, description, assignee, deadline, status, deleted_at FROM tasks \
             WHERE deleted_at IS NULL \
             AND (lower_unicode(title) LIKE lower_unicode(?1) \
                  OR lower_unicode(description) LIKE lower_unicode(?1) \
                  OR lower_unicode(assignee) LIKE lower_unicode(?1) \
                  OR lower_unicode(status) LIKE lower_unicode(?1)) \
             ORDER BY id",
        )
        .context("Failed to prepare task search.")?;
    let mapped_rows = stmt
        .query_map(params![pattern], task_from_row)
        .context("Failed to search tasks in database.")?;

    let mut tasks = Vec::new();
    for task in mapped_rows {
        tasks.push(task.context("Failed to read task from database.")?);
    }
    Ok(tasks)
}

/// Returns the active task with the given id, if any.
pub fn active_task(db: &Connection, id: i64) -> Result<Option<Task>> {
    let task = db
        .query_row(
            "SELECT id, title, description, assignee, deadline, status, deleted_at FROM tasks WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            task_from_row,
        )
        .optional()
        .with_context(|| format!("Failed to obtain task {} from database.", id))?;
    Ok(task)
}

/// Overwrite the five editable fields of an active task. Returns the
/// number of rows written, zero when the task is gone.
pub fn update_task(db: &Connection, id: i64, fields: &TaskFields) -> Result<usize> {
    let changed = db
        .execute(
            "UPDATE tasks SET title = ?1, description = ?2, assignee = ?3, deadline = ?4, status = ?5 \
             WHERE id = ?6 AND deleted_at IS NULL",
            params![
                fields.title,
                fields.description,
                fields.assignee,
                fields.deadline,
                fields.status,
                id
            ],
        )
        .context("Failed to update task in database.")?;
    info!("updated task {} ({} row)", id, changed);
    Ok(changed)
}

/// Mark an active task as deleted at the given time. The row is kept.
pub fn soft_delete_task(db: &Connection, id: i64, at: DateTime<Local>) -> Result<usize> {
    let changed = db
        .execute(
            "UPDATE tasks SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![at, id],
        )
        .context("Failed to delete task in database.")?;
    info!("soft deleted task {} ({} row)", id, changed);
    Ok(changed)
}

/// Return a task from a row in this order: [id, title, description,
/// assignee, deadline, status, deleted_at]
pub fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let lifecycle = match row.get::<_, Option<DateTime<Local>>>(6)? {
        Some(at) => Lifecycle::Deleted(at),
        None => Lifecycle::Active,
    };
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        assignee: row.get(3)?,
        deadline: row.get::<_, NaiveDate>(4)?,
        status: row.get(5)?,
        lifecycle,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub fn fields(title: &str, assignee: &str) -> TaskFields {
        TaskFields {
            title: title.to_string(),
            description: "Q1 summary".to_string(),
            assignee: assignee.to_string(),
            deadline: "2025-03-31".to_string(),
            status: "open".to_string(),
        }
    }

    pub fn any_task(db: &Connection, id: i64) -> Result<Option<Task>> {
        let task = db
            .query_row(
                "SELECT id, title, description, assignee, deadline, status, deleted_at FROM tasks WHERE id = ?1",
                params![id],
                task_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to obtain task {} from database.", id))?;
        Ok(task)
    }

    fn database() -> (TempDir, Connection) {
        let dir = TempDir::new().unwrap();
        let db = open_database(&dir.path().join("tasks.sqlite")).unwrap();
        (dir, db)
    }

    #[test]
    fn new_database_has_tasks_table() {
        let (_dir, db) = database();
        assert!(search_tasks(&db, "").unwrap().is_empty());
    }

    #[test]
    fn reopening_keeps_tasks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.sqlite");
        let id = add_task(&open_database(&path).unwrap(), &fields("Report", "Alice")).unwrap();
        let db = open_database(&path).unwrap();
        assert_eq!(active_task(&db, id).unwrap().unwrap().title, "Report");
    }

    #[test]
    fn added_task_is_active() {
        let (_dir, db) = database();
        let id = add_task(&db, &fields("Report", "Alice")).unwrap();
        let task = active_task(&db, id).unwrap().unwrap();
        assert_eq!(task.id, id);
        assert_eq!(task.lifecycle, Lifecycle::Active);
        assert_eq!(task.deadline, NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
        assert_eq!(task.fields(), fields("Report", "Alice"));
    }

    #[test]
    fn search_matches_any_text_column_ignoring_ascii_case() {
        let (_dir, db) = database();
        add_task(&db, &fields("Report", "Alice")).unwrap();
        add_task(&db, &fields("Deploy", "Bob")).unwrap();

        let found = search_tasks(&db, "alice").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].assignee, "Alice");

        assert_eq!(search_tasks(&db, "OPEN").unwrap().len(), 2);
        assert_eq!(search_tasks(&db, "summary").unwrap().len(), 2);
        assert_eq!(search_tasks(&db, "").unwrap().len(), 2);
        assert!(search_tasks(&db, "zzz").unwrap().is_empty());
    }

    #[test]
    fn search_ignores_case_beyond_ascii() {
        let (_dir, db) = database();
        add_task(&db, &fields("Report", "ÉLISE")).unwrap();
        add_task(&db, &fields("Report", "Ａｌｉｃｅ")).unwrap();
        add_task(&db, &fields("報告書", "Bob")).unwrap();

        let found = search_tasks(&db, "élise").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].assignee, "ÉLISE");

        let found = search_tasks(&db, "ａｌｉｃｅ").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].assignee, "Ａｌｉｃｅ");

        assert_eq!(search_tasks(&db, "ＡＬＩＣＥ").unwrap().len(), 1);
        assert_eq!(search_tasks(&db, "告").unwrap().len(), 1);
    }

    #[test]
    fn existing_empty_file_gets_the_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.sqlite");
        std::fs::File::create(&path).unwrap();
        let db = open_database(&path).unwrap();
        assert!(search_tasks(&db, "").unwrap().is_empty());
        assert_eq!(add_task(&db, &fields("Report", "Alice")).unwrap(), 1);
    }

    #[test]
    fn soft_deleted_task_is_hidden_but_kept() {
        let (_dir, db) = database();
        let id = add_task(&db, &fields("Report", "Alice")).unwrap();
        assert_eq!(soft_delete_task(&db, id, Local::now()).unwrap(), 1);

        assert!(active_task(&db, id).unwrap().is_none());
        assert!(search_tasks(&db, "").unwrap().is_empty());
        let kept = any_task(&db, id).unwrap().unwrap();
        assert!(matches!(kept.lifecycle, Lifecycle::Deleted(_)));
    }

    #[test]
    fn deleted_task_is_not_updated() {
        let (_dir, db) = database();
        let id = add_task(&db, &fields("Report", "Alice")).unwrap();
        soft_delete_task(&db, id, Local::now()).unwrap();
        assert_eq!(update_task(&db, id, &fields("Other", "Bob")).unwrap(), 0);
        assert_eq!(any_task(&db, id).unwrap().unwrap().title, "Report");
    }

    #[test]
    fn ids_are_not_reused() {
        let (_dir, db) = database();
        let first = add_task(&db, &fields("Report", "Alice")).unwrap();
        soft_delete_task(&db, first, Local::now()).unwrap();
        let second = add_task(&db, &fields("Report", "Alice")).unwrap();
        assert!(second > first);
    }
}
