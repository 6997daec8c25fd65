use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tasknest_core::{Priority, RecordKind, SyncStatus};

#[derive(Parser)]
#[command(name = "tasknest")]
#[command(about = "Offline-first tasks and notes from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name for remote and session configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a task (or a note with --note)
    #[command(alias = "new")]
    Add {
        /// Title
        title: Vec<String>,
        /// Create a note instead of a task
        #[arg(long)]
        note: bool,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// Free-text body
        #[arg(short, long)]
        body: Option<String>,
        /// Priority
        #[arg(short, long, value_enum)]
        priority: Option<PriorityArg>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_name = "WHEN")]
        due: Option<String>,
    },
    /// List records
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only tasks or only notes
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,
        /// Only open tasks
        #[arg(long, conflicts_with = "done")]
        open: bool,
        /// Only completed tasks
        #[arg(long)]
        done: bool,
        /// Only this priority
        #[arg(short, long, value_enum)]
        priority: Option<PriorityArg>,
        /// Only records in this sync state
        #[arg(long, value_enum)]
        status: Option<SyncStatusArg>,
        /// Case-insensitive text match
        #[arg(short, long)]
        text: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one record
    Show {
        /// Record ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a record; opens $EDITOR on the body when no field is given
    Edit {
        /// Record ID or unique ID prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        body: Option<String>,
        #[arg(short, long, value_enum)]
        priority: Option<PriorityArg>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_name = "WHEN", conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Mark a task completed
    Done {
        /// Record ID or unique ID prefix
        id: String,
        /// Reopen instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete a record
    Delete {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Run one sync pass against the remote store
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Show sync state and record counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show pending sync queue entries
    Queue {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep syncing in the background until interrupted
    Run,
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Manage the signed-in owner
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum KindArg {
    Task,
    Note,
}

impl From<KindArg> for RecordKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Task => Self::Task,
            KindArg::Note => Self::Note,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SyncStatusArg {
    Synced,
    NeedsSync,
    Syncing,
    Failed,
}

impl From<SyncStatusArg> for SyncStatus {
    fn from(value: SyncStatusArg) -> Self {
        match value {
            SyncStatusArg::Synced => Self::Synced,
            SyncStatusArg::NeedsSync => Self::NeedsSync,
            SyncStatusArg::Syncing => Self::Syncing,
            SyncStatusArg::Failed => Self::Failed,
        }
    }
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Remote store base URL
        #[arg(long, value_name = "URL")]
        remote_url: Option<String>,
        /// Static API token for the remote store
        #[arg(long, value_name = "TOKEN")]
        remote_token: Option<String>,
        /// host:port probed for reachability
        #[arg(long, value_name = "HOST:PORT")]
        probe_addr: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in as an owner and store the session in the keychain
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Owner identifier all records are scoped to
        #[arg(long, value_name = "ID")]
        owner: String,
        /// Account email (informational)
        #[arg(long, value_name = "EMAIL")]
        email: Option<String>,
        /// Bearer token for the remote store
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
