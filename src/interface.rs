use anyhow::Result;
use chrono::Local;
use log::debug;
use rusqlite::Connection;

use crate::config::Config;
use crate::input::{ask_optional, ask_required, Console, Format};
use crate::model::{self, Task, TaskFields};
use crate::table::Layout;

// Each operation opens its own connection. Failing to open it is the only
// error returned to the caller; everything else is reported and swallowed.
// The connection is closed when it goes out of scope.

pub fn add_task<C: Console>(console: &mut C, config: &Config) -> Result<()> {
    console.say("--- New task ---")?;
    let fields = TaskFields {
        title: ask_required(console, "* Title: ", Format::Text)?,
        description: ask_required(console, "* Description: ", Format::Text)?,
        assignee: ask_required(console, "* Assignee: ", Format::Text)?,
        deadline: ask_required(console, "* Deadline (YYYY-MM-DD): ", Format::Date)?,
        status: ask_required(console, "* Status: ", Format::Text)?,
    };

    let db = model::open_database(&config.database_file)?;
    match model::add_task(&db, &fields) {
        Ok(id) => console.say(&format!("Task added (ID {}).", id))?,
        Err(e) => console.error(&format!("add failed: {:#}", e))?,
    }
    Ok(())
}

pub fn list<C: Console>(console: &mut C, config: &Config) -> Result<()> {
    let db = model::open_database(&config.database_file)?;
    let keyword = console.read_line("Search keyword: ")?;
    match model::search_tasks(&db, keyword.trim()) {
        Ok(tasks) => {
            debug!("{} task(s) match {:?}", tasks.len(), keyword.trim());
            for line in Layout::tasks().render(&tasks) {
                console.say(&line)?;
            }
        }
        Err(e) => console.error(&format!("list failed: {:#}", e))?,
    }
    Ok(())
}

pub fn update_task<C: Console>(console: &mut C, config: &Config) -> Result<()> {
    let db = model::open_database(&config.database_file)?;
    let raw_id = console.read_line("ID of the task to update: ")?;
    let task = match lookup(console, &db, &raw_id, "update")? {
        Some(task) => task,
        None => return Ok(()),
    };

    console.say("--- Enter new values (leave blank to keep the current value) ---")?;
    let current = task.fields();
    let fields = TaskFields {
        title: ask_optional(console, "* New title: ", Format::Text)?.unwrap_or(current.title),
        description: ask_optional(console, "* New description: ", Format::Text)?
            .unwrap_or(current.description),
        assignee: ask_optional(console, "* New assignee: ", Format::Text)?
            .unwrap_or(current.assignee),
        deadline: ask_optional(console, "* New deadline (YYYY-MM-DD): ", Format::Date)?
            .unwrap_or(current.deadline),
        status: ask_optional(console, "* New status: ", Format::Text)?.unwrap_or(current.status),
    };

    match model::update_task(&db, task.id, &fields) {
        Ok(_) => console.say("Task updated.")?,
        Err(e) => console.error(&format!("update failed: {:#}", e))?,
    }
    Ok(())
}

pub fn delete_task<C: Console>(console: &mut C, config: &Config) -> Result<()> {
    let db = model::open_database(&config.database_file)?;
    let raw_id = console.read_line("ID of the task to delete: ")?;
    let task = match lookup(console, &db, &raw_id, "delete")? {
        Some(task) => task,
        None => return Ok(()),
    };

    let answer = console.read_line(&format!("Delete ID:{}? (y/n): ", task.id))?;
    if answer.to_lowercase() != "y" {
        debug!("deletion of task {} not confirmed", task.id);
        return Ok(());
    }

    match model::soft_delete_task(&db, task.id, Local::now()) {
        Ok(_) => console.say("Task deleted.")?,
        Err(e) => console.error(&format!("delete failed: {:#}", e))?,
    }
    Ok(())
}

/// Find the active task the user referred to, reporting when there is
/// none. Ids that are not numbers can't exist.
fn lookup<C: Console>(
    console: &mut C,
    db: &Connection,
    raw_id: &str,
    operation: &str,
) -> Result<Option<Task>> {
    let found = match raw_id.trim().parse::<i64>() {
        Ok(id) => model::active_task(db, id),
        Err(_) => Ok(None),
    };
    match found {
        Ok(Some(task)) => Ok(Some(task)),
        Ok(None) => {
            console.error(&format!("Task ID {} does not exist.", raw_id.trim()))?;
            Ok(None)
        }
        Err(e) => {
            console.error(&format!("{} failed: {:#}", operation, e))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::tests::{errors, output, scripted};
    use crate::model::tests::{any_task, fields};
    use crate::model::Lifecycle;
    use tempfile::TempDir;

    fn config() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let config = Config {
            database_file: dir.path().join("tasks.sqlite"),
        };
        (dir, config)
    }

    fn seed(config: &Config) -> i64 {
        let db = model::open_database(&config.database_file).unwrap();
        model::add_task(&db, &fields("Report", "Alice")).unwrap()
    }

    fn stored(config: &Config, id: i64) -> Task {
        let db = model::open_database(&config.database_file).unwrap();
        any_task(&db, id).unwrap().unwrap()
    }

    fn reject_writes(config: &Config, event: &str) {
        let db = model::open_database(&config.database_file).unwrap();
        db.execute_batch(&format!(
            "CREATE TRIGGER reject BEFORE {} ON tasks BEGIN SELECT RAISE(ABORT, 'write rejected'); END;",
            event
        ))
        .unwrap();
    }

    #[test]
    fn add_then_list() {
        let (_dir, config) = config();
        let mut console = scripted("Report\nQ1 summary\nAlice\n2025-03-31\nopen\n");
        add_task(&mut console, &config).unwrap();
        assert!(output(&console).contains("Task added (ID 1)."));

        let mut console = scripted("Alice\n");
        list(&mut console, &config).unwrap();
        let out = output(&console);
        assert!(out.contains(
            "| 1    | Report     | Q1 summary                     | Alice        | 2025-03-31   | open         |"
        ));
        assert_eq!(out.lines().filter(|l| l.starts_with("| 1 ")).count(), 1);
    }

    #[test]
    fn add_reprompts_for_invalid_values() {
        let (_dir, config) = config();
        let mut console = scripted("\nReport\nQ1 summary\nAlice\n2025/03/31\n2025-03-31\nopen\n");
        add_task(&mut console, &config).unwrap();
        let errors = errors(&console);
        assert!(errors.contains("This field is required."));
        assert!(errors.contains("Invalid date format"));
        assert_eq!(stored(&config, 1).deadline.to_string(), "2025-03-31");
    }

    #[test]
    fn list_without_match_prints_nothing() {
        let (_dir, config) = config();
        seed(&config);
        let mut console = scripted("zzz\n");
        list(&mut console, &config).unwrap();
        assert_eq!(output(&console), "Search keyword: ");
        assert!(errors(&console).is_empty());
    }

    #[test]
    fn update_with_blanks_keeps_values() {
        let (_dir, config) = config();
        let id = seed(&config);
        let before = stored(&config, id);
        let mut console = scripted(&format!("{}\n\n\n\n\n\n", id));
        update_task(&mut console, &config).unwrap();
        assert!(output(&console).contains("Task updated."));
        assert_eq!(stored(&config, id), before);
    }

    #[test]
    fn update_changes_given_fields() {
        let (_dir, config) = config();
        let id = seed(&config);
        let mut console = scripted(&format!(" {} \nFinal report\n\nBob\nsoon\n\ndone\n", id));
        update_task(&mut console, &config).unwrap();
        let task = stored(&config, id);
        assert_eq!(task.title, "Final report");
        assert_eq!(task.description, "Q1 summary");
        assert_eq!(task.assignee, "Bob");
        assert_eq!(task.deadline.to_string(), "2025-03-31");
        assert_eq!(task.status, "done");
        assert!(errors(&console).contains("Invalid date format"));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let (_dir, config) = config();
        seed(&config);
        for raw in &["42", "abc"] {
            let mut console = scripted(&format!("{}\n", raw));
            update_task(&mut console, &config).unwrap();
            assert!(errors(&console).contains(&format!("Task ID {} does not exist.", raw)));
            assert!(!output(&console).contains("New title"));
        }
    }

    #[test]
    fn delete_requires_y() {
        let (_dir, config) = config();
        let id = seed(&config);
        for answer in &["n", "N", "", "yes", " y"] {
            let mut console = scripted(&format!("{}\n{}\n", id, answer));
            delete_task(&mut console, &config).unwrap();
            assert_eq!(stored(&config, id).lifecycle, Lifecycle::Active);
            assert!(!output(&console).contains("Task deleted."));
            assert!(errors(&console).is_empty());
        }

        let mut console = scripted(&format!("{}\nY\n", id));
        delete_task(&mut console, &config).unwrap();
        assert!(output(&console).contains(&format!("Delete ID:{}? (y/n): ", id)));
        assert!(output(&console).contains("Task deleted."));
        assert!(matches!(stored(&config, id).lifecycle, Lifecycle::Deleted(_)));
    }

    #[test]
    fn update_after_delete_is_not_found() {
        let (_dir, config) = config();
        let id = seed(&config);
        let mut console = scripted(&format!("{}\ny\n", id));
        delete_task(&mut console, &config).unwrap();
        let deleted = stored(&config, id);

        let mut console = scripted(&format!("{}\nOther\n\n\n\n\n", id));
        update_task(&mut console, &config).unwrap();
        assert!(errors(&console).contains(&format!("Task ID {} does not exist.", id)));
        assert_eq!(stored(&config, id), deleted);

        let mut console = scripted(&format!("{}\n", id));
        delete_task(&mut console, &config).unwrap();
        assert!(errors(&console).contains("does not exist"));
    }

    #[test]
    fn unopenable_database_is_an_error() {
        let (dir, _) = config();
        let config = Config {
            database_file: dir.path().join("missing").join("tasks.sqlite"),
        };
        assert!(list(&mut scripted("\n"), &config).is_err());
    }

    #[test]
    fn failed_add_is_reported() {
        colored::control::set_override(true);
        let (_dir, config) = config();
        reject_writes(&config, "INSERT");
        let mut console = scripted("Report\nQ1 summary\nAlice\n2025-03-31\nopen\n");
        assert!(add_task(&mut console, &config).is_ok());
        let errors = errors(&console);
        assert!(errors.starts_with("\x1b[31madd failed: "));
        assert!(errors.contains("write rejected"));
        assert!(!output(&console).contains("Task added"));
    }

    #[test]
    fn failed_update_is_reported() {
        colored::control::set_override(true);
        let (_dir, config) = config();
        let id = seed(&config);
        reject_writes(&config, "UPDATE");
        let mut console = scripted(&format!("{}\nOther\n\n\n\n\n", id));
        assert!(update_task(&mut console, &config).is_ok());
        let errors = errors(&console);
        assert!(errors.starts_with("\x1b[31mupdate failed: "));
        assert!(errors.contains("write rejected"));
        assert_eq!(stored(&config, id).title, "Report");
    }

    #[test]
    fn failed_delete_is_reported() {
        colored::control::set_override(true);
        let (_dir, config) = config();
        let id = seed(&config);
        reject_writes(&config, "UPDATE");
        let mut console = scripted(&format!("{}\ny\n", id));
        assert!(delete_task(&mut console, &config).is_ok());
        let errors = errors(&console);
        assert!(errors.starts_with("\x1b[31mdelete failed: "));
        assert!(errors.contains("write rejected"));
        assert_eq!(stored(&config, id).lifecycle, Lifecycle::Active);
    }
}
