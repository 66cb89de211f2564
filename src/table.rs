//! Fixed width table rendering that lines up double width text.
//!
//! Widths follow the East Asian Width property: Fullwidth, Wide and
//! Ambiguous characters take two cells, everything else one. Fields wider
//! than their column are never truncated.

use crate::east_asian_width::is_double_width;
use crate::model::{Task, DATE_FORMAT};

/// A task attribute that can be shown in a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field {
    Id,
    Title,
    Description,
    Assignee,
    Deadline,
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub width: usize,
    pub label: &'static str,
    pub field: Field,
}

/// The columns of a table, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub columns: Vec<Column>,
}

impl Layout {
    /// ID(4), Title(10), Description(30), Assignee(12), Deadline(12), Status(12).
    pub fn tasks() -> Layout {
        let column = |width, label, field| Column { width, label, field };
        Layout {
            columns: vec![
                column(4, "ID", Field::Id),
                column(10, "Title", Field::Title),
                column(30, "Description", Field::Description),
                column(12, "Assignee", Field::Assignee),
                column(12, "Deadline", Field::Deadline),
                column(12, "Status", Field::Status),
            ],
        }
    }

    fn border(&self) -> String {
        let dashes: Vec<String> = self
            .columns
            .iter()
            .map(|c| "-".repeat(c.width + 2))
            .collect();
        format!("+{}+", dashes.join("+"))
    }

    fn row<F>(&self, cell: F) -> String
    where
        F: Fn(&Column) -> String,
    {
        let cells: Vec<String> = self
            .columns
            .iter()
            .map(|c| pad(&cell(c), c.width))
            .collect();
        format!("| {} |", cells.join(" | "))
    }

    /// Render the tasks as table lines. No tasks, no lines.
    pub fn render(&self, tasks: &[Task]) -> Vec<String> {
        if tasks.is_empty() {
            return Vec::new();
        }
        let border = self.border();
        let mut lines = vec![
            border.clone(),
            self.row(|c| c.label.to_string()),
            border.clone(),
        ];
        for task in tasks {
            lines.push(self.row(|c| cell(task, c.field)));
        }
        lines.push(border);
        lines
    }
}

fn cell(task: &Task, field: Field) -> String {
    match field {
        Field::Id => task.id.to_string(),
        Field::Title => task.title.clone(),
        Field::Description => task.description.clone(),
        Field::Assignee => task.assignee.clone(),
        Field::Deadline => task.deadline.format(DATE_FORMAT).to_string(),
        Field::Status => task.status.clone(),
    }
}

fn char_width(c: char) -> usize {
    if is_double_width(c) {
        2
    } else {
        1
    }
}

/// Number of terminal cells the text takes.
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Right pad with spaces up to `width` cells.
pub fn pad(text: &str, width: usize) -> String {
    let missing = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(missing))
}
