use std::str::FromStr;
use structopt::StructOpt;

/// The operation to perform, one per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Prompt for a new task and save it.
    Add,
    /// Search active tasks by keyword and show them as a table.
    List,
    /// Change the fields of an active task.
    Update,
    /// Soft delete an active task after confirmation.
    Delete,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(Command::Add),
            "list" => Ok(Command::List),
            "update" => Ok(Command::Update),
            "delete" => Ok(Command::Delete),
            other => Err(format!("'{}' is not a valid command.", other)),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "taskman",
    about = "Task Management CLI Tool"
)]
pub struct CommandLineArgs {
    /// add, list, update, delete
    #[structopt()]
    pub command: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_commands() {
        assert_eq!("add".parse::<Command>(), Ok(Command::Add));
        assert_eq!("list".parse::<Command>(), Ok(Command::List));
        assert_eq!("update".parse::<Command>(), Ok(Command::Update));
        assert_eq!("delete".parse::<Command>(), Ok(Command::Delete));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            "remove".parse::<Command>(),
            Err("'remove' is not a valid command.".to_string())
        );
        assert!("ADD".parse::<Command>().is_err());
    }

    #[test]
    fn positional_argument_is_required() {
        assert!(CommandLineArgs::from_iter_safe(vec!["taskman"]).is_err());
        let args = CommandLineArgs::from_iter_safe(vec!["taskman", "frobnicate"]).unwrap();
        assert_eq!(args.command, "frobnicate");
    }
}
