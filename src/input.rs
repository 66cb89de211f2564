use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use thiserror::Error;

use crate::model::DATE_FORMAT;

/// Line based conversation with the user.
pub trait Console {
    /// Show the prompt and read one line, without its terminator.
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    fn say(&mut self, message: &str) -> Result<()>;
    /// Report a problem in red on the error stream.
    fn error(&mut self, message: &str) -> Result<()>;
}

pub struct Terminal<R, W, E> {
    pub input: R,
    pub output: W,
    pub errors: E,
}

impl Terminal<io::StdinLock<'static>, io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        Terminal {
            input: io::stdin().lock(),
            output: io::stdout(),
            errors: io::stderr(),
        }
    }
}

impl<R: BufRead, W: Write, E: Write> Console for Terminal<R, W, E> {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read from standard input.")?;
        if read == 0 {
            bail!("Standard input was closed.");
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(line)
    }

    fn say(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{}", message)?;
        Ok(())
    }

    fn error(&mut self, message: &str) -> Result<()> {
        writeln!(self.errors, "{}", message.red())?;
        Ok(())
    }
}

/// What kind of value a prompt expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    Text,
    /// A calendar date written exactly as `YYYY-MM-DD`.
    Date,
}

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("This field is required.")]
    Missing,
    #[error("Invalid date format (YYYY-MM-DD).")]
    InvalidDate,
}

/// Check one raw line. Blank input is `Ok(None)`; whether that is
/// acceptable is up to the caller.
pub fn validate(raw: &str, format: Format) -> Result<Option<String>, InputError> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if format == Format::Date && !is_date(value) {
        return Err(InputError::InvalidDate);
    }
    Ok(Some(value.to_string()))
}

fn is_date(value: &str) -> bool {
    // chrono accepts single digit months and days, so check the shape first
    let shaped = value.len() == 10
        && value.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    shaped && NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()
}

/// Ask until a non blank, valid value is given.
pub fn ask_required<C: Console>(console: &mut C, prompt: &str, format: Format) -> Result<String> {
    loop {
        match validate(&console.read_line(prompt)?, format) {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => console.error(&InputError::Missing.to_string())?,
            Err(e) => console.error(&e.to_string())?,
        }
    }
}

/// Ask until a valid value or a blank line is given. Blank means keep
/// whatever the caller already has.
pub fn ask_optional<C: Console>(
    console: &mut C,
    prompt: &str,
    format: Format,
) -> Result<Option<String>> {
    loop {
        match validate(&console.read_line(prompt)?, format) {
            Ok(value) => return Ok(value),
            Err(e) => console.error(&e.to_string())?,
        }
    }
}
