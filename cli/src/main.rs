//! `todo`: command-line front-end for the todo service.
//!
//! Every invocation restores the stored session first, the same way the
//! interactive client starts, then performs exactly one operation.
//!
//!   todo register --name Ada --email ada@example.com --password ...
//!   todo add "Buy milk" --importance high --due 2024-05-01
//!   todo list
//!   todo toggle <id>
//!   todo edit <id> --title "Buy oat milk" --clear-due

mod cli;

use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::Parser;
use todo_client::{ApiError, ClientConfig, CreateTodo, TodoApp, TodoItem, View};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

/// Exit status when the command needs a logged-in session.
const EXIT_LOGIN_REQUIRED: u8 = 2;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = ClientConfig::from_env();
    tracing::debug!(api_url = %config.api_url, data_dir = %config.data_dir.display(), "configuration");

    let mut app = TodoApp::new(&config);
    let started = app.start();

    match cli.command {
        Commands::Login { email, password } => {
            if !app.login(&email, &password) {
                bail!("login failed for {email}");
            }
            println!("Logged in as {email}");
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            app.register(&name, &email, &password)
                .context("registration failed")?;
            println!("Registered and logged in as {email}");
        }
        Commands::Logout => {
            app.logout();
            println!("Logged out");
        }
        command => {
            if let Err(e) = started {
                if !e.is_unauthorized() {
                    return Err(e).context("could not load todos");
                }
            }
            if app.view() != View::Todos {
                return Ok(login_required());
            }
            let result = run_authenticated(&mut app, command);
            if app.view() == View::Login {
                return Ok(login_required());
            }
            result?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_authenticated(app: &mut TodoApp, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Whoami => {
            let user = app.session().user();
            let name = user.and_then(|u| u.name.as_deref()).unwrap_or("(unknown)");
            let email = user.and_then(|u| u.email.as_deref()).unwrap_or("(unknown)");
            println!("{name} <{email}>");
        }
        Commands::List => print_todos(app.todos().todos()),
        Commands::Add {
            title,
            description,
            due,
            importance,
        } => {
            if title.trim().is_empty() {
                bail!("title must not be empty");
            }
            let mut input = CreateTodo::new(title)
                .description(description)
                .importance(importance);
            if let Some(due) = due {
                input = input.due_on(due);
            }
            app.create(&input).context("could not add todo")?;
            print_todos(app.todos().todos());
        }
        Commands::Toggle { id } => {
            app.toggle_complete(&id).map_err(|e| not_found(e, &id))?;
            if let Some(item) = app.todos().find(&id) {
                print_todo(item);
            }
        }
        Commands::Rm { id } => {
            app.delete(&id).map_err(|e| not_found(e, &id))?;
            println!("Deleted {id}");
        }
        Commands::Edit {
            id,
            title,
            description,
            due,
            clear_due,
            importance,
            completed,
        } => {
            app.start_edit(&id).map_err(|e| not_found(e, &id))?;
            if let Some(draft) = app.draft_mut() {
                if let Some(title) = title {
                    draft.title = title;
                }
                if let Some(description) = description {
                    draft.description = Some(description);
                }
                if clear_due {
                    draft.due_date = None;
                } else if due.is_some() {
                    draft.due_date = due;
                }
                if let Some(importance) = importance {
                    draft.importance = importance;
                }
                if let Some(completed) = completed {
                    draft.completed = completed;
                }
                if draft.title.trim().is_empty() {
                    bail!("title must not be empty");
                }
            }
            let updated = app.submit_edit().context("could not update todo")?;
            print_todo(&updated);
        }
        Commands::Login { .. } | Commands::Register { .. } | Commands::Logout => {
            unreachable!("handled before authentication check")
        }
    }
    Ok(())
}

fn not_found(error: ApiError, id: &str) -> anyhow::Error {
    match error {
        ApiError::NotFound => anyhow::anyhow!("no todo with id {id}"),
        other => other.into(),
    }
}

fn login_required() -> ExitCode {
    eprintln!("Not logged in. Run `todo login` or `todo register` first.");
    ExitCode::from(EXIT_LOGIN_REQUIRED)
}

fn print_todos(todos: &[TodoItem]) {
    if todos.is_empty() {
        println!("No todos yet.");
        return;
    }
    for todo in todos {
        print_todo(todo);
    }
}

fn print_todo(todo: &TodoItem) {
    let mark = if todo.completed { "x" } else { " " };
    println!(
        "[{mark}] {}  {}  ({}, {})",
        todo.id,
        todo.title,
        todo.importance,
        todo.due_date_label()
    );
    if let Some(description) = todo.description.as_deref().filter(|d| !d.is_empty()) {
        println!("      {description}");
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
