//! Command-line front end.
//!
//! The command tree is plain clap derive data; every command runs against a
//! [`TaskService`] handed in by `main`, and interactive commands read from and
//! write to whatever reader and writer they are given.

use crate::config::Config;
use crate::task::{NewTask, Priority, Task, TaskService, TaskServiceError};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};

/// Layout used to read and print reminders, in local time.
pub const REMINDER_FORMAT: &str = "%d/%m/%Y %H:%M";

#[derive(Parser, Debug)]
#[command(name = "advisor", version, about = "Manage tasks with reminders")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Add a new task, prompting for each field
    Add,
    /// List every task
    List,
    /// Mark a task as done
    Complete {
        /// Task to complete; prompted for when omitted
        id: Option<String>,
    },
    /// Show tasks whose reminder has passed and are not done
    Due,
    /// Start the REST API server
    Api,
}

/// Errors raised while running a command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("Input ended before '{0}' was answered")]
    UnexpectedEof(String),
    #[error("Invalid reminder '{0}', expected DD/MM/YYYY HH:MM")]
    InvalidReminder(String),
    #[error(transparent)]
    Service(#[from] TaskServiceError),
}

/// Runs `command` against `service` using the process's stdin and stdout.
pub async fn run(command: Commands, service: TaskService, config: &Config) -> anyhow::Result<()> {
    let commands = TaskCommands::new(&service);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();

    match command {
        Commands::Add => commands.add(&mut input, &mut output).await?,
        Commands::List => commands.list(&mut output).await?,
        Commands::Complete { id } => commands.complete(id, &mut input, &mut output).await?,
        Commands::Due => commands.due(&mut output).await?,
        Commands::Api => crate::web::start_web_server(config, service.clone()).await?,
    }
    Ok(())
}

pub struct TaskCommands<'a> {
    service: &'a TaskService,
}

impl TaskCommands<'_> {
    pub fn new(service: &TaskService) -> TaskCommands<'_> {
        TaskCommands { service }
    }

    /// Prompts for every field of a new task and creates it.
    ///
    /// Title and priority are re-prompted while left empty. Description,
    /// reminder and parent may be left blank.
    pub async fn add(
        &self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<(), CliError> {
        let title = prompt_non_empty(input, output, "Task title (required): ")?;
        let description = prompt(input, output, "Description (optional): ")?;
        let priority: Priority =
            prompt_non_empty(input, output, "Priority (low, medium or high): ")?
                .parse()
                .map_err(TaskServiceError::from)?;

        writeln!(output, "\nEnter the reminder date/time as:")?;
        writeln!(output, "  DD/MM/YYYY HH:MM")?;
        let reminder_at = match prompt(input, output, "Remind at (optional): ")?.as_str() {
            "" => None,
            raw => Some(parse_reminder(raw)?),
        };
        let parent_id = prompt(input, output, "Parent task ID (optional): ")?;

        let new_task = NewTask::new(title, description, priority, reminder_at);
        let task = if parent_id.is_empty() {
            self.service.create(new_task).await?
        } else {
            self.service.create_with_parent(new_task, parent_id).await?
        };

        writeln!(output, "\nTask added successfully!")?;
        writeln!(output, "ID: {}", task.id())?;
        writeln!(output, "Title: {}", task.title())?;
        writeln!(output, "Remind at: {}", format_reminder(task.reminder_at()))?;
        Ok(())
    }

    pub async fn list(&self, output: &mut impl Write) -> Result<(), CliError> {
        let tasks = self.service.list().await?;
        if tasks.is_empty() {
            writeln!(output, "No tasks yet.")?;
            return Ok(());
        }

        writeln!(output, "\n-=== TASKS ===-\n")?;
        for task in &tasks {
            write_task(output, task)?;
        }
        Ok(())
    }

    /// Marks a task as done, asking which one when `id` is not given.
    pub async fn complete(
        &self,
        id: Option<String>,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<(), CliError> {
        let id = match id {
            Some(id) => id,
            None => {
                let tasks = self.service.list().await?;
                if tasks.is_empty() {
                    writeln!(output, "No tasks to complete.")?;
                    return Ok(());
                }
                for task in &tasks {
                    writeln!(output, "\n______________________________")?;
                    writeln!(output, "ID: {}\n| > Title: {}", task.id(), task.title())?;
                }
                writeln!(output)?;
                prompt_non_empty(input, output, "Task ID (required): ")?
            }
        };

        let task = self.service.complete(&id).await?;
        writeln!(output, "Task {} marked as done.", task.id())?;
        Ok(())
    }

    pub async fn due(&self, output: &mut impl Write) -> Result<(), CliError> {
        let tasks = self.service.get_due().await?;
        if tasks.is_empty() {
            writeln!(output, "No overdue tasks.")?;
            return Ok(());
        }

        for task in &tasks {
            writeln!(output, "\n[ OVERDUE TASK ]")?;
            writeln!(output, "Title: {}", task.title())?;
            writeln!(output, "| Priority: {}", task.priority())?;
            if !task.description().is_empty() {
                writeln!(output, "| Description: {}", task.description())?;
            }
            writeln!(output, "| Reminder: {}", format_reminder(task.reminder_at()))?;
        }
        Ok(())
    }
}

fn write_task(output: &mut impl Write, task: &Task) -> io::Result<()> {
    writeln!(output, "ID: {}", task.id())?;
    writeln!(output, "| > Title: {}", task.title())?;
    writeln!(output, "| > Description: {}", task.description())?;
    writeln!(output, "| > Priority: {}", task.priority())?;
    writeln!(output, "| > Reminder: {}", format_reminder(task.reminder_at()))?;
    writeln!(output, "| > Done: {}", if task.is_done() { "yes" } else { "no" })?;
    if let Some(parent_id) = task.parent_id() {
        writeln!(output, "| > Parent: {}", parent_id)?;
    }
    if !task.children().is_empty() {
        writeln!(output, "| > Subtasks: {}", task.children().len())?;
    }
    writeln!(output)
}

/// Prints `label` and reads one trimmed line.
fn prompt(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
) -> Result<String, CliError> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(CliError::UnexpectedEof(label.trim().to_string()));
    }
    Ok(line.trim().to_string())
}

/// Like [`prompt`], but asks again until the answer is not empty.
fn prompt_non_empty(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
) -> Result<String, CliError> {
    loop {
        let value = prompt(input, output, label)?;
        if !value.is_empty() {
            return Ok(value);
        }
        writeln!(output, "This field is required!")?;
    }
}

/// Parses a `DD/MM/YYYY HH:MM` local time into UTC.
pub fn parse_reminder(raw: &str) -> Result<DateTime<Utc>, CliError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), REMINDER_FORMAT)
        .map_err(|_| CliError::InvalidReminder(raw.to_string()))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| CliError::InvalidReminder(raw.to_string()))
}

fn format_reminder(reminder_at: Option<DateTime<Utc>>) -> String {
    match reminder_at {
        Some(reminder_at) => reminder_at
            .with_timezone(&Local)
            .format(REMINDER_FORMAT)
            .to_string(),
        None => "none".to_string(),
    }
}
