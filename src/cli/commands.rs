use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sb", about = concat!("studyboard v", env!("CARGO_PKG_VERSION"), " - student project tasks"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of the default location
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    /// Project to work on (default: board.default_project from the config)
    #[arg(short = 'p', long = "project", global = true)]
    pub project: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the project's task tree
    Tree,
    /// Show one task with its ancestors and subtasks
    Show(ShowArgs),
    /// Add a task (top-level, or under --parent)
    Add(AddArgs),
    /// Mark a task done, or reopen it
    Toggle(ToggleArgs),
    /// Change a task's fields
    Edit(EditArgs),
    /// Delete a task and its subtasks
    Rm(RmArgs),
    /// Invite a student to the project by email
    Invite(InviteArgs),
    /// Check deadlines and completion across the whole tree
    Check,
    /// Manage project members
    #[command(subcommand)]
    Members(MembersCmd),

    // Account commands (no project needed)
    /// List the projects you own or belong to
    Projects,
    /// Join a project you were invited to
    Accept(AcceptArgs),
    /// Show the signed-in student
    Whoami,
    /// Store a session cookie after checking it with the service
    Login(LoginArgs),
}

impl Commands {
    /// Whether the command works on a loaded project board
    pub fn needs_project(&self) -> bool {
        !matches!(
            self,
            Commands::Projects | Commands::Accept(_) | Commands::Whoami | Commands::Login(_)
        )
    }
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// Task ID to show
    pub id: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Task title
    pub title: String,
    /// Student responsible for the task (owner or member)
    #[arg(long)]
    pub responsible: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub deadline: String,
    /// Create as a subtask of this task
    #[arg(long)]
    pub parent: Option<String>,
    /// Description / expected result
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct ToggleArgs {
    /// Task ID to toggle
    pub id: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID to edit
    pub id: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New description (empty string clears it)
    #[arg(long)]
    pub description: Option<String>,
    /// New responsible student
    #[arg(long)]
    pub responsible: Option<String>,
    /// New due date (YYYY-MM-DD)
    #[arg(long)]
    pub deadline: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task ID to delete
    pub id: String,
}

#[derive(Args)]
pub struct InviteArgs {
    /// Email address of the student to invite
    pub email: String,
}

#[derive(Subcommand)]
pub enum MembersCmd {
    /// Remove a member from the project
    Rm(MemberRmArgs),
}

#[derive(Args)]
pub struct MemberRmArgs {
    /// Student ID of the member to remove
    pub student: String,
}

// ---------------------------------------------------------------------------
// Account command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AcceptArgs {
    /// Project ID from the invitation
    pub project: String,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Session cookie copied from the browser (e.g. "session=...")
    #[arg(long)]
    pub session: String,
}
