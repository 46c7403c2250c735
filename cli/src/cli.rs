//! Command-line arguments and subcommands.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use todo_client::Importance;

/// Todo list client.
#[derive(Parser, Debug)]
#[command(name = "todo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account and log in.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Forget the stored session.
    Logout,

    /// Show the logged-in user.
    Whoami,

    /// List todos.
    List,

    /// Add a todo.
    Add {
        title: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<NaiveDate>,

        /// high, medium or low.
        #[arg(short, long, default_value = "medium")]
        importance: Importance,
    },

    /// Flip a todo between open and done.
    Toggle { id: String },

    /// Delete a todo.
    Rm { id: String },

    /// Edit a todo. Fields not given keep their current value.
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Due date as YYYY-MM-DD.
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,

        /// Remove the due date.
        #[arg(long)]
        clear_due: bool,

        #[arg(short, long)]
        importance: Option<Importance>,

        #[arg(long)]
        completed: Option<bool>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_options() {
        let cli = Cli::parse_from([
            "todo", "add", "Buy milk", "--importance", "high", "--due", "2024-05-01",
        ]);
        match cli.command {
            Commands::Add {
                title,
                importance,
                due,
                ..
            } => {
                assert_eq!(title, "Buy milk");
                assert_eq!(importance, Importance::High);
                assert_eq!(due, NaiveDate::from_ymd_opt(2024, 5, 1));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_importance() {
        assert!(Cli::try_parse_from(["todo", "add", "x", "--importance", "urgent"]).is_err());
    }

    #[test]
    fn due_and_clear_due_conflict() {
        assert!(
            Cli::try_parse_from(["todo", "edit", "a1", "--due", "2024-05-01", "--clear-due"])
                .is_err()
        );
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["todo", "list", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }
}
