//! Command-line surface.

use std::path::PathBuf;

use agenda_core::{Category, EventInput, Tag, TaskInput};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "agenda")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Calendar events and tasks from the command line")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: $XDG_CONFIG_HOME/agenda/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend root including the /api prefix
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Session id printed by `agenda login`
    #[arg(long, env = "AGENDA_SESSION", global = true)]
    pub session: Option<String>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },

    /// Start a session and print its id
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Calendar events
    #[command(subcommand)]
    Events(EventCommand),

    /// Tasks
    #[command(subcommand)]
    Tasks(TaskCommand),

    /// Create an event from a plain-language description
    Chat {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum EventCommand {
    List,
    Add(EventFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: EventFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    List,
    Add(TaskFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: TaskFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct EventFields {
    #[arg(long)]
    pub title: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: NaiveDate,
    /// HH:MM
    #[arg(long)]
    pub start: String,
    /// HH:MM
    #[arg(long)]
    pub end: String,
    #[arg(long, value_enum, default_value_t = CategoryArg::Work)]
    pub category: CategoryArg,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub completed: bool,
}

#[derive(Debug, Args)]
pub struct TaskFields {
    #[arg(long)]
    pub title: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub due: NaiveDate,
    /// Free text such as 2h or 1h 30m
    #[arg(long)]
    pub duration: String,
    #[arg(long, value_enum, default_value_t = TagArg::Inbox)]
    pub tag: TagArg,
    #[arg(long)]
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CategoryArg {
    Work,
    Personal,
    Meeting,
    Other,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TagArg {
    DueSoon,
    Inbox,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Work => Category::Work,
            CategoryArg::Personal => Category::Personal,
            CategoryArg::Meeting => Category::Meeting,
            CategoryArg::Other => Category::Other,
        }
    }
}

impl From<TagArg> for Tag {
    fn from(arg: TagArg) -> Self {
        match arg {
            TagArg::DueSoon => Tag::DueSoon,
            TagArg::Inbox => Tag::Inbox,
        }
    }
}

impl From<EventFields> for EventInput {
    fn from(f: EventFields) -> Self {
        EventInput {
            title: f.title,
            date: f.date,
            start_time: f.start,
            end_time: f.end,
            category: f.category.into(),
            completed: f.completed,
            color: f.color,
        }
    }
}

impl From<TaskFields> for TaskInput {
    fn from(f: TaskFields) -> Self {
        TaskInput {
            title: f.title,
            due_date: f.due,
            duration: f.duration,
            tag: f.tag.into(),
            completed: f.completed,
        }
    }
}
