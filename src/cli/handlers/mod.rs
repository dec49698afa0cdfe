use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::board::{ProjectBoard, SaveReport, TaskDraft};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::backend::Backend;
use crate::io::config_io;
use crate::io::http::HttpBackend;
use crate::model::config::{BackendConfig, ClientConfig};
use crate::model::project::Project;
use crate::model::record::parse_wire_date;
use crate::model::task::{StudentId, TaskId, TaskNode};
use crate::ops::completion::Toggle;
use crate::ops::deadline;
use crate::ops::editor::TaskEditor;
use crate::ops::tree_ops;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub async fn dispatch(cli: Cli) -> CmdResult {
    let config_file = cli.config.as_deref().map(Path::new);
    let config = config_io::load_config(config_file)?;
    if !cli.command.needs_project() {
        let path = config_io::resolve_path(config_file);
        return run_account(&config, &path, cli.command, cli.json).await;
    }

    let project_id = cli
        .project
        .clone()
        .or_else(|| config.board.default_project.clone())
        .ok_or("no project selected (pass -p <id> or set board.default_project)")?;

    let backend = HttpBackend::new(&config.backend)?;
    let mut board = ProjectBoard::load(backend, &project_id, config.board.consistency).await?;
    run(&mut board, cli.command, cli.json).await
}

/// Execute one command against a loaded board.
pub async fn run<B: Backend>(board: &mut ProjectBoard<B>, command: Commands, json: bool) -> CmdResult {
    match command {
        // Read commands
        Commands::Tree => cmd_tree(board, json),
        Commands::Show(args) => cmd_show(board, args, json),
        Commands::Check => cmd_check(board, json),

        // Write commands
        Commands::Add(args) => cmd_add(board, args, json).await,
        Commands::Toggle(args) => cmd_toggle(board, args, json).await,
        Commands::Edit(args) => cmd_edit(board, args, json).await,
        Commands::Rm(args) => cmd_rm(board, args, json).await,
        Commands::Invite(args) => cmd_invite(board, args, json).await,
        Commands::Members(MembersCmd::Rm(args)) => cmd_member_rm(board, args, json).await,

        Commands::Projects | Commands::Accept(_) | Commands::Whoami | Commands::Login(_) => {
            Err("command does not take a project".into())
        }
    }
}

/// Execute a command that only needs the signed-in student.
async fn run_account(
    config: &ClientConfig,
    config_path: &Path,
    command: Commands,
    json: bool,
) -> CmdResult {
    let backend = || HttpBackend::new(&config.backend);
    match command {
        Commands::Login(args) => cmd_login(config, config_path, args).await,
        Commands::Projects => cmd_projects(&backend()?, json).await,
        Commands::Accept(args) => cmd_accept(&backend()?, args, json).await,
        Commands::Whoami => cmd_whoami(&backend()?, json).await,
        _ => Err("command needs a project".into()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    parse_wire_date(s).ok_or_else(|| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

fn find_task<B: Backend>(board: &ProjectBoard<B>, id: &str) -> Result<TaskNode, String> {
    board
        .find(&TaskId::new(id))
        .cloned()
        .ok_or_else(|| format!("task not found: {}", id))
}

fn print_json<T: Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_tree<B: Backend>(board: &ProjectBoard<B>, json: bool) -> CmdResult {
    let project = board.project();
    let dir = board.directory();
    if json {
        return print_json(&TreeJson {
            project_id: project.id.clone(),
            project: project.name.clone(),
            deadline: project.deadline,
            tasks: board.tasks().iter().map(|t| task_to_json(t, dir)).collect(),
        });
    }
    for line in format_tree(&project.name, project.deadline, board.tasks(), dir) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_show<B: Backend>(board: &ProjectBoard<B>, args: ShowArgs, json: bool) -> CmdResult {
    let task = find_task(board, &args.id)?;
    let tree = board.tasks();
    let ancestors: Vec<&TaskNode> = tree_ops::ancestors(tree, &task.id)
        .unwrap_or_default()
        .iter()
        .filter_map(|aid| tree_ops::find(tree, aid))
        .collect();
    let parent = ancestors.last().map(|p| p.id.clone());
    let (max_deadline, _) = deadline::bound_for(tree, board.project(), parent.as_ref())?;
    let dir = board.directory();

    if json {
        return print_json(&ShowJson {
            ancestors: ancestors
                .iter()
                .map(|a| task_summary_json(a, dir))
                .collect(),
            task: task_to_json(&task, dir),
            max_deadline,
        });
    }
    for line in format_task_detail(&task, &ancestors, max_deadline, dir) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_check<B: Backend>(board: &ProjectBoard<B>, json: bool) -> CmdResult {
    let result = board.check();
    if json {
        print_json(&result)?;
    } else {
        for line in format_check(&result) {
            println!("{}", line);
        }
    }
    if result.valid {
        Ok(())
    } else {
        Err(format!("{} consistency error(s)", result.errors.len()).into())
    }
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct IdJson<'a> {
    id: &'a str,
}

async fn cmd_add<B: Backend>(board: &mut ProjectBoard<B>, args: AddArgs, json: bool) -> CmdResult {
    let draft = TaskDraft {
        title: args.title,
        description: args.description,
        responsible_id: StudentId::new(args.responsible),
        deadline: parse_date(&args.deadline)?,
        parent: args.parent.map(TaskId::new),
    };
    let id = board.create_task(draft).await?;
    if json {
        return print_json(&IdJson { id: id.as_str() });
    }
    println!("{}", id);
    Ok(())
}

#[derive(Serialize)]
struct ToggleJson<'a> {
    id: &'a str,
    #[serde(flatten)]
    toggle: &'a Toggle,
}

async fn cmd_toggle<B: Backend>(
    board: &mut ProjectBoard<B>,
    args: ToggleArgs,
    json: bool,
) -> CmdResult {
    let id = TaskId::new(args.id);
    let toggle = board.toggle(&id).await?;
    if json {
        return print_json(&ToggleJson {
            id: id.as_str(),
            toggle: &toggle,
        });
    }
    match toggle {
        Toggle::Completed => println!("✓ {} done", id),
        Toggle::Reopened => println!("{} reopened", id),
        Toggle::Blocked { .. } => {}
    }
    Ok(())
}

async fn cmd_edit<B: Backend>(board: &mut ProjectBoard<B>, args: EditArgs, json: bool) -> CmdResult {
    let task = find_task(board, &args.id)?;
    let mut editor = TaskEditor::open(task, board.tasks(), board.project());
    if let Some(title) = &args.title {
        editor.set_title(title)?;
    }
    if let Some(description) = &args.description {
        editor.set_description(description);
    }
    if let Some(responsible) = args.responsible {
        editor.set_responsible(StudentId::new(responsible))?;
    }
    if let Some(date) = &args.deadline {
        editor.set_deadline(parse_date(date)?)?;
    }
    let report = board.save_task(editor.finish()).await?;
    if json {
        return print_json(&SaveJson::from(&report));
    }
    println!("{} saved", args.id);
    Ok(())
}

#[derive(Serialize)]
struct SaveJson {
    created: Vec<(String, String)>,
    failed: Vec<String>,
}

impl From<&SaveReport> for SaveJson {
    fn from(report: &SaveReport) -> Self {
        SaveJson {
            created: report
                .created
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            failed: report
                .failed
                .iter()
                .chain(&report.failed_deletes)
                .map(|id| id.to_string())
                .collect(),
        }
    }
}

async fn cmd_rm<B: Backend>(board: &mut ProjectBoard<B>, args: RmArgs, json: bool) -> CmdResult {
    let id = TaskId::new(args.id);
    board.delete_task(&id).await?;
    if json {
        return print_json(&IdJson { id: id.as_str() });
    }
    println!("deleted {}", id);
    Ok(())
}

async fn cmd_invite<B: Backend>(
    board: &mut ProjectBoard<B>,
    args: InviteArgs,
    json: bool,
) -> CmdResult {
    let student = board.invite(&args.email).await?;
    if json {
        return print_json(&IdJson {
            id: student.as_str(),
        });
    }
    println!(
        "invited {} ({})",
        board.directory().display_name(&student),
        args.email.trim()
    );
    Ok(())
}

async fn cmd_member_rm<B: Backend>(
    board: &mut ProjectBoard<B>,
    args: MemberRmArgs,
    json: bool,
) -> CmdResult {
    let student = StudentId::new(args.student);
    let name = board.directory().display_name(&student);
    board.remove_member(&student).await?;
    if json {
        return print_json(&IdJson {
            id: student.as_str(),
        });
    }
    println!("removed {} from {}", name, board.project().name);
    Ok(())
}

// ---------------------------------------------------------------------------
// Account command handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StudentJson<'a> {
    id: &'a str,
    name: String,
    email: &'a str,
}

async fn cmd_whoami<B: Backend>(backend: &B, json: bool) -> CmdResult {
    let me = backend.get_current_student().await?;
    if json {
        return print_json(&StudentJson {
            id: me.id.as_str(),
            name: me.display_name(),
            email: &me.email,
        });
    }
    println!("{} {} <{}>", me.id, me.display_name(), me.email);
    Ok(())
}

/// Projects the signed-in student owns or is a member of
async fn cmd_projects<B: Backend>(backend: &B, json: bool) -> CmdResult {
    let me = backend.get_current_student().await?;
    let projects: Vec<(Project, &'static str)> = backend
        .list_projects()
        .await?
        .into_iter()
        .map(Project::from_record)
        .filter_map(|p| project_role(&p, &me.id).map(|role| (p, role)))
        .collect();

    if json {
        let list: Vec<ProjectJson> = projects
            .iter()
            .map(|(p, role)| project_to_json(p, role))
            .collect();
        return print_json(&list);
    }
    if projects.is_empty() {
        println!("(no projects)");
    }
    for (project, role) in &projects {
        println!("{}", format_project_line(project, role));
    }
    Ok(())
}

async fn cmd_accept<B: Backend>(backend: &B, args: AcceptArgs, json: bool) -> CmdResult {
    let me = backend.get_current_student().await?;
    backend.accept_invite(&me.id, &args.project).await?;
    if json {
        return print_json(&IdJson { id: &args.project });
    }
    println!("joined {}", args.project);
    Ok(())
}

/// Check the session with the service, then store it in the config file.
/// Values from environment overrides are not written back.
async fn cmd_login(config: &ClientConfig, config_path: &Path, args: LoginArgs) -> CmdResult {
    let session = args.session.trim().to_string();
    if session.is_empty() {
        return Err("session cookie is empty".into());
    }
    let backend = HttpBackend::new(&BackendConfig {
        session_cookie: Some(session.clone()),
        bearer_token: None,
        ..config.backend.clone()
    })?;
    let me = backend.get_current_student().await?;

    let mut stored = config_io::read_config_from(config_path)?;
    stored.backend.session_cookie = Some(session);
    config_io::write_config_to(config_path, &stored)?;
    println!("signed in as {} ({})", me.display_name(), config_path.display());
    Ok(())
}
