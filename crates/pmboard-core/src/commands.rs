use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::agent_log::{LogExpansion, LogFilter};
use crate::cli::{
    AddProjectArgs, AddTaskArgs, AgentArgs, Command, CommandLine, GenerateArgs, UpdateTaskArgs,
};
use crate::datetime::parse_filter_date;
use crate::error::{BoardError, GenerateError};
use crate::export::export_board;
use crate::generator::{GeneratedTask, GeneratedTaskEdit, Generation, GenerationDraft, Priority};
use crate::project::ProjectDraft;
use crate::render::Renderer;
use crate::route::Route;
use crate::session::{Session, View};
use crate::task::{TaskDraft, TaskState, TaskUpdate};

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct Step {
    args: Vec<String>,
}

#[instrument(skip(session, renderer, out))]
pub fn dispatch<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    out: &mut W,
    command: Command,
) -> anyhow::Result<()> {
    let result = match command {
        Command::Board { search, enable_ai } => {
            cmd_board_enable(session, renderer, out, &search, enable_ai.as_deref())
        }
        Command::Open { route } => cmd_open(session, renderer, out, &route),
        Command::Project { id, search, state } => {
            cmd_project(session, renderer, out, &id, &search, state.into())
        }
        Command::Logs {
            origin,
            task,
            date,
            expand,
        } => cmd_logs(session, renderer, out, &origin, task, date.as_deref(), &expand),
        Command::Agent(args) => cmd_agent(session, renderer, out, args),
        Command::AddProject(args) => cmd_add_project(session, renderer, out, args),
        Command::AddTask(args) => cmd_add_task(session, renderer, out, args),
        Command::UpdateTask(args) => cmd_update_task(session, out, args),
        Command::RemoveTask {
            project_id,
            task_id,
        } => cmd_remove_task(session, out, &project_id, &task_id),
        Command::Generate(args) => cmd_generate(session, renderer, out, args),
        Command::Export { pretty } => cmd_export(session, out, pretty),
        Command::Replay { scenario } => cmd_replay(session, renderer, out, &scenario),
    };

    let notes = session.notifier_mut().drain();
    renderer.print_notifications(out, &notes)?;
    result
}

fn cmd_board<W: Write>(
    session: &Session,
    renderer: &Renderer,
    out: &mut W,
    search: &str,
) -> anyhow::Result<()> {
    info!("command board");
    let projects = session.projects().filter_by_name(search);
    renderer.print_project_table(out, &projects)
}

fn cmd_board_enable<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    out: &mut W,
    search: &str,
    enable_ai: Option<&str>,
) -> anyhow::Result<()> {
    if let Some(id) = enable_ai {
        info!(id, "enabling AI agent from the board");
        session.enable_ai_from_board(id)?;
    }
    cmd_board(session, renderer, out, search)
}

fn cmd_open<W: Write>(
    session: &Session,
    renderer: &Renderer,
    out: &mut W,
    raw: &str,
) -> anyhow::Result<()> {
    let Ok(route) = raw.parse::<Route>();
    debug!(?route, "resolved route");

    match session.resolve(&route) {
        View::Board => cmd_board(session, renderer, out, ""),
        View::Project(project) => {
            cmd_project(session, renderer, out, &project.id, "", TaskState::Open)
        }
        View::ProjectNotFound(id) => {
            writeln!(out, "Project not found: {id}")?;
            writeln!(out, "Back to Project Board: {}", Route::Board.path())?;
            Ok(())
        }
        View::Unknown(path) => {
            warn!(path = %path, "unknown route");
            writeln!(out, "404: no page at {path}")?;
            Ok(())
        }
    }
}

fn cmd_project<W: Write>(
    session: &Session,
    renderer: &Renderer,
    out: &mut W,
    id: &str,
    search: &str,
    state: TaskState,
) -> anyhow::Result<()> {
    info!(id, "command project");
    let project = session
        .project(id)
        .ok_or_else(|| BoardError::not_found("project", id))?;
    let workspace = session
        .workspace(id)
        .ok_or_else(|| BoardError::not_found("project", id))?;

    renderer.print_project_header(out, project, workspace.agent.state())?;
    writeln!(out)?;
    renderer.print_summary(out, workspace.tasks.summarize())?;
    renderer.print_task_table(out, &workspace.tasks.visible(search, state))?;
    Ok(())
}

fn cmd_logs<W: Write>(
    session: &Session,
    renderer: &Renderer,
    out: &mut W,
    origin: &str,
    task_id: String,
    date: Option<&str>,
    expand: &[String],
) -> anyhow::Result<()> {
    info!("command logs");
    let timezone = session.timezone();
    let today = Utc::now().with_timezone(&timezone).date_naive();
    let filter = LogFilter {
        origin: origin.parse()?,
        task_id,
        date: date.map(|d| parse_filter_date(d, today)).transpose()?,
        timezone,
    };

    let mut expansion = LogExpansion::default();
    for id in expand {
        if session.logs().get(id).is_none() {
            warn!(id = %id, "cannot expand unknown log entry");
            continue;
        }
        expansion.toggle(id);
    }

    let logs = session.filter_logs(&filter);
    renderer.print_logs(out, &logs, &expansion, timezone)
}

fn cmd_agent<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    out: &mut W,
    args: AgentArgs,
) -> anyhow::Result<()> {
    let id = args.project_id.as_str();
    info!(id, "command agent");
    if session.agent(id).is_none() {
        return Err(BoardError::not_found("project", id).into());
    }

    if args.enable {
        session.enable_ai(id)?;
    }

    if args.disable {
        let token = session.request_disable(id)?;
        if args.yes {
            session.confirm_disable(id, token)?;
        } else {
            session.cancel_disable(id, token)?;
            writeln!(out, "Disable not confirmed (pass --yes); the agent stays enabled.")?;
        }
    }

    for cap_id in &args.toggle {
        let applied = session
            .agent_mut(id)
            .is_some_and(|agent| agent.toggle_capability(cap_id));
        if !applied {
            writeln!(out, "Ignored toggle of {cap_id}: agent disabled or unknown capability.")?;
        }
    }

    for raw in &args.toggle_sub {
        let (cap_id, sub_id) = raw
            .split_once('/')
            .ok_or_else(|| anyhow!("expected CAPABILITY/SUB_FEATURE, got: {raw}"))?;
        let applied = session
            .agent_mut(id)
            .is_some_and(|agent| agent.toggle_sub_feature(cap_id, sub_id));
        if !applied {
            writeln!(out, "Ignored toggle of {raw}: agent disabled or unknown sub-feature.")?;
        }
    }

    let agent = session
        .agent(id)
        .ok_or_else(|| BoardError::not_found("project", id))?;
    writeln!(out, "AI agent: {:?}", agent.state())?;
    renderer.print_capabilities(out, agent)
}

fn cmd_add_project<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    out: &mut W,
    args: AddProjectArgs,
) -> anyhow::Result<()> {
    info!("command add-project");
    let project = session.add_project(ProjectDraft {
        name: args.name,
        members: args.members,
        start_date: args.start,
        due_date: args.due,
        details: args.details,
        outcome: args.outcome,
        ai_agent_enabled: args.ai,
    });
    renderer.print_project_table(out, &[&project])
}

fn cmd_add_task<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    out: &mut W,
    args: AddTaskArgs,
) -> anyhow::Result<()> {
    info!(project = %args.project_id, "command add-task");
    let task = session.add_task(
        &args.project_id,
        TaskDraft {
            title: args.title,
            description: args.description,
            assignee: args.assignee,
            start_date: args.start,
            due_date: args.due,
            category: args.category,
            severity: args.severity,
            publishable: !args.unpublished,
        },
    )?;
    renderer.print_task_table(out, &[&task])
}

fn cmd_update_task<W: Write>(
    session: &mut Session,
    out: &mut W,
    args: UpdateTaskArgs,
) -> anyhow::Result<()> {
    info!(project = %args.project_id, task = %args.task_id, "command update-task");
    let updates: Vec<TaskUpdate> = [
        args.title.map(TaskUpdate::Title),
        args.category.map(TaskUpdate::Category),
        args.assignee.map(TaskUpdate::Assignee),
        args.status.map(TaskUpdate::Status),
        args.due.map(TaskUpdate::DueDate),
    ]
    .into_iter()
    .flatten()
    .collect();

    if updates.is_empty() {
        bail!("nothing to update; pass at least one field");
    }

    let mut changed = 0;
    for update in updates {
        if session.update_task(&args.project_id, &args.task_id, update) {
            changed += 1;
        }
    }
    if changed > 0 {
        session.update_task(
            &args.project_id,
            &args.task_id,
            TaskUpdate::LastUpdated(crate::task::JUST_NOW.to_string()),
        );
    }
    writeln!(out, "Updated {changed} field(s) on {}.", args.task_id)?;
    Ok(())
}

fn cmd_remove_task<W: Write>(
    session: &mut Session,
    out: &mut W,
    project_id: &str,
    task_id: &str,
) -> anyhow::Result<()> {
    info!(project = %project_id, task = %task_id, "command remove-task");
    match session.remove_task(project_id, task_id) {
        Some(task) => writeln!(out, "Removed {} \"{}\".", task.id, task.title)?,
        None => writeln!(out, "No task {task_id} in project {project_id}.")?,
    }
    Ok(())
}

fn cmd_generate<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    out: &mut W,
    args: GenerateArgs,
) -> anyhow::Result<()> {
    let id = args.project_id.as_str();
    info!(id, "command generate");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start async runtime")?;
    let generation = session.start_generation(id)?;
    let cancel_after = args.cancel_after_ms.map(Duration::from_millis);
    let candidates = runtime
        .block_on(run_generation(generation, cancel_after))
        .map_err(BoardError::from)?;
    session.load_candidates(id, candidates)?;

    let draft = session
        .draft_mut(id)
        .ok_or_else(|| BoardError::not_found("project", id))?;
    if let Err(err) = review_candidates(draft, &args) {
        session.discard_candidates(id);
        return Err(err);
    }

    let draft = session
        .draft(id)
        .ok_or_else(|| BoardError::not_found("project", id))?;
    renderer.print_candidates(out, draft.tasks(), session.team())?;

    if draft.selected_count() == 0 {
        writeln!(out, "No candidates selected; nothing was added.")?;
        session.discard_candidates(id);
        return Ok(());
    }

    let committed = session.commit_generated(id)?;
    writeln!(out)?;
    renderer.print_task_table(out, &committed.iter().collect::<Vec<_>>())
}

fn review_candidates(draft: &mut GenerationDraft, args: &GenerateArgs) -> anyhow::Result<()> {
    for edit in &args.priorities {
        let priority: Priority = edit.1.parse()?;
        if !draft.edit(&edit.0, GeneratedTaskEdit::Priority(priority)) {
            bail!("no generated task with id {}", edit.0);
        }
    }
    for edit in &args.assignees {
        if !draft.edit(&edit.0, GeneratedTaskEdit::Assignee(edit.1.clone())) {
            bail!("no generated task with id {}", edit.0);
        }
    }

    let wanted: Vec<String> = if args.all {
        draft.tasks().iter().map(|t| t.id.clone()).collect()
    } else {
        args.select.clone()
    };
    for candidate in &wanted {
        if !draft.toggle_selected(candidate) {
            bail!("no generated task with id {candidate}");
        }
    }
    Ok(())
}

async fn run_generation(
    generation: Generation,
    cancel_after: Option<Duration>,
) -> Result<Vec<GeneratedTask>, GenerateError> {
    let Some(after) = cancel_after else {
        return generation.finish().await;
    };

    let handle = generation.cancel_handle();
    let mut finish = std::pin::pin!(generation.finish());
    tokio::select! {
        res = &mut finish => res,
        () = tokio::time::sleep(after) => {
            debug!(after_ms = after.as_millis(), "cancelling generation");
            handle.cancel();
            finish.await
        }
    }
}

fn cmd_export<W: Write>(session: &Session, out: &mut W, pretty: bool) -> anyhow::Result<()> {
    info!("command export");
    let export = export_board(session);
    let text = if pretty {
        serde_json::to_string_pretty(&export)?
    } else {
        serde_json::to_string(&export)?
    };
    writeln!(out, "{text}")?;
    Ok(())
}

#[instrument(skip(session, renderer, out))]
fn cmd_replay<W: Write>(
    session: &mut Session,
    renderer: &Renderer,
    out: &mut W,
    path: &Path,
) -> anyhow::Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed reading scenario {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&text)
        .with_context(|| format!("failed parsing scenario {}", path.display()))?;
    info!(scenario = %scenario.name, steps = scenario.steps.len(), "replaying scenario");

    for (idx, step) in scenario.steps.into_iter().enumerate() {
        writeln!(out, "$ pmboard {}", step.args.join(" "))?;
        let command = CommandLine::parse_words(&step.args)
            .with_context(|| format!("step {} of {}", idx + 1, scenario.name))?;
        if matches!(command, Command::Replay { .. }) {
            bail!("step {} of {}: nested replay is not supported", idx + 1, scenario.name);
        }
        dispatch(session, renderer, out, command)
            .with_context(|| format!("step {} of {} failed", idx + 1, scenario.name))?;
    }

    Ok(())
}
