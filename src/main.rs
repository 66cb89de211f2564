use colored::Colorize;
use structopt::StructOpt;

mod cli;
mod config;
mod east_asian_width;
mod input;
mod interface;
mod model;
mod table;

use cli::{Command, CommandLineArgs};
use config::Config;
use input::Terminal;

fn run(command: Command) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut console = Terminal::stdio();

    // Perform the action.
    match command {
        Command::Add => interface::add_task(&mut console, &config),
        Command::List => interface::list(&mut console, &config),
        Command::Update => interface::update_task(&mut console, &config),
        Command::Delete => interface::delete_task(&mut console, &config),
    }
}

fn main() {
    env_logger::init();
    // colour errors even when stdout is redirected; NO_COLOR turns it off
    colored::control::set_override(std::env::var_os("NO_COLOR").is_none());

    // Get the command-line arguments.
    let CommandLineArgs { command } = CommandLineArgs::from_args();

    let command = match command.parse::<Command>() {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message.red());
            return;
        }
    };

    if let Err(e) = run(command) {
        eprintln!("{}", format!("{:#}", e).red());
        std::process::exit(1);
    }
}
