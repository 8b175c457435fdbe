use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use pmboard_core::agent_log::{LogFilter, LogOrigin};
use pmboard_core::cli::{Command, CommandLine};
use pmboard_core::commands::dispatch;
use pmboard_core::config::Config;
use pmboard_core::error::{BoardError, GenerateError};
use pmboard_core::generator::{AI_CATEGORY, GeneratorSettings};
use pmboard_core::notify::NotificationSink;
use pmboard_core::project::ProjectDraft;
use pmboard_core::render::Renderer;
use pmboard_core::route::Route;
use pmboard_core::seed::Seed;
use pmboard_core::session::{Session, SessionSettings, View};
use pmboard_core::task::{TaskDraft, TaskUpdate};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn fast_settings() -> SessionSettings {
    SessionSettings {
        generator: GeneratorSettings {
            latency: Duration::from_millis(5),
            timeout: Duration::from_millis(1000),
        },
        ..SessionSettings::default()
    }
}

fn session() -> Session {
    Session::new(Seed::builtin().expect("builtin seed"), fast_settings())
}

#[derive(Debug, Default)]
struct Recorder(Vec<(String, String)>);

impl NotificationSink for Recorder {
    fn notify(&mut self, title: &str, description: &str) {
        self.0.push((title.to_string(), description.to_string()));
    }
}

#[test]
fn project_add_find_enable_is_idempotent() {
    let mut session = Session::with_notifier(
        Seed::builtin().expect("builtin seed"),
        fast_settings(),
        Recorder::default(),
    );

    let created = session.add_project(ProjectDraft {
        name: "Apollo".to_string(),
        ..ProjectDraft::default()
    });
    let found = session.project(&created.id).expect("project is findable");
    assert_eq!(found.name, "Apollo");
    assert!(!found.ai_agent_enabled);

    session.enable_ai(&created.id).expect("first enable");
    session.enable_ai(&created.id).expect("second enable");
    assert!(session.project(&created.id).expect("project").ai_agent_enabled);

    let titles: Vec<&str> = session.notifier().0.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Project created successfully",
            "AI Agent enabled for this project",
            "AI Agent enabled for this project",
        ]
    );
}

#[test]
fn every_added_task_is_listed_and_counted() {
    let mut session = session();
    for (idx, title) in ["Plan", "Build", "Ship"].into_iter().enumerate() {
        session
            .add_task(
                "3",
                TaskDraft {
                    title: title.to_string(),
                    start_date: "2026-02-01".to_string(),
                    due_date: format!("2026-02-1{idx}"),
                    ..TaskDraft::default()
                },
            )
            .expect("valid task");
    }

    let tasks = session.tasks("3").expect("project 3");
    let listed = tasks.filter_by_title("");
    assert_eq!(listed.len(), tasks.len());
    let mut ids: Vec<&str> = listed.iter().map(|t| t.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    assert!(session.update_task("3", "TASK-6", TaskUpdate::Status(60)));
    assert!(session.remove_task("3", "TZK-493").is_some());
    let summary = session.summarize("3").expect("summary");
    assert_eq!(summary.total(), session.tasks("3").map_or(0, |t| t.len()));
    assert_eq!(summary.in_progress, 1);
}

#[test]
fn generate_select_two_and_commit() {
    let mut session = session();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");

    let before = session.tasks("2").expect("project 2").len();
    let generation = session.start_generation("2").expect("agent is on for project 2");
    let candidates = runtime.block_on(generation.finish()).expect("generation");
    assert_eq!(candidates.len(), 5);
    assert_eq!(candidates[0].title, "Define project scope for Ninth User");

    session.load_candidates("2", candidates).expect("load");
    let draft = session.draft_mut("2").expect("draft");
    draft.toggle_selected("2");
    draft.toggle_selected("5");
    let committed = session.commit_generated("2").expect("commit");

    let tasks = session.tasks("2").expect("project 2");
    assert_eq!(tasks.len(), before + 2);
    let added: Vec<(&str, &str, bool)> = tasks
        .iter()
        .skip(before)
        .map(|t| (t.title.as_str(), t.category.as_str(), t.generated_by_ai))
        .collect();
    assert_eq!(
        added,
        vec![
            ("Set up project infrastructure", AI_CATEGORY, true),
            ("Risk assessment", AI_CATEGORY, true),
        ]
    );
    assert_eq!(committed.len(), 2);
    assert!(!session.generator().is_busy());
}

#[test]
fn generate_cancelled_from_the_command_line_frees_the_generator() {
    let mut session = Session::new(
        Seed::builtin().expect("builtin seed"),
        SessionSettings {
            generator: GeneratorSettings {
                latency: Duration::from_secs(5),
                timeout: Duration::from_secs(10),
            },
            ..SessionSettings::default()
        },
    );
    let renderer = Renderer::new(&Config::default()).expect("renderer");
    let before = session.tasks("2").expect("project 2").len();

    let mut out = Vec::new();
    let command = CommandLine::parse_words(["generate", "2", "--all", "--cancel-after-ms", "20"])
        .expect("parse");
    let err = dispatch(&mut session, &renderer, &mut out, command).expect_err("cancelled");

    assert_eq!(
        err.downcast_ref::<BoardError>(),
        Some(&BoardError::Generate(GenerateError::Cancelled))
    );
    assert!(!session.generator().is_busy());
    assert!(session.draft("2").is_some_and(|d| d.is_empty()));
    assert_eq!(session.tasks("2").expect("project 2").len(), before);
}

#[test]
fn unknown_selection_drops_the_review_set() {
    let mut session = session();
    let renderer = Renderer::new(&Config::default()).expect("renderer");
    let before = session.tasks("2").expect("project 2").len();

    let mut out = Vec::new();
    let command = CommandLine::parse_words(["generate", "2", "--select", "1,9"]).expect("parse");
    let err = dispatch(&mut session, &renderer, &mut out, command).expect_err("bad id");

    assert!(err.to_string().contains("no generated task with id 9"));
    assert!(session.draft("2").is_some_and(|d| d.is_empty()));
    assert_eq!(session.tasks("2").expect("project 2").len(), before);
    assert!(!session.generator().is_busy());
}

#[test]
fn board_row_enable_uses_the_board_toast() {
    let mut session = session();
    let renderer = Renderer::new(&Config::default()).expect("renderer");

    let mut out = Vec::new();
    let command = CommandLine::parse_words(["board", "--enable-ai", "1"]).expect("parse");
    dispatch(&mut session, &renderer, &mut out, command).expect("enable from board");
    let text = String::from_utf8(out).expect("utf8");

    assert!(session.project("1").is_some_and(|p| p.ai_agent_enabled));
    assert!(text.contains("AI Agent enabled successfully"));
    assert!(!text.contains("AI Agent enabled for this project"));
}

#[test]
fn origin_filter_over_seeded_logs() {
    let session = session();
    let filter = LogFilter {
        origin: LogOrigin::Autonomous,
        ..LogFilter::default()
    };
    let ids: Vec<&str> = session
        .filter_logs(&filter)
        .iter()
        .map(|log| log.id.as_str())
        .collect();
    assert_eq!(ids, vec!["log-1", "log-3"]);
}

#[test]
fn routes_resolve_to_views() {
    let session = session();
    let parse = |raw: &str| -> Route {
        let Ok(route) = raw.parse::<Route>();
        route
    };

    assert_eq!(session.resolve(&parse("/")), View::Board);
    assert!(matches!(
        session.resolve(&parse("/project/4")),
        View::Project(p) if p.name == "test"
    ));
    assert_eq!(
        session.resolve(&parse("/project/abc")),
        View::ProjectNotFound("abc".to_string())
    );
    assert_eq!(
        session.resolve(&parse("/reports")),
        View::Unknown("/reports".to_string())
    );
}

#[test]
fn seed_file_replaces_projects() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("seed.toml");
    fs::write(
        &path,
        r#"
[[projects]]
id = "10"
name = "Seeded"
due_time = "2 days ago"
status = "In progress"
ai_agent_enabled = true
"#,
    )
    .expect("write seed");

    let seed = Seed::load(&path).expect("load seed");
    let mut session = Session::new(seed, SessionSettings::default());
    assert_eq!(session.projects().len(), 1);
    // Built-in tasks point at projects that no longer exist.
    assert!(session.tasks("10").is_some_and(|t| t.is_empty()));
    assert!(session.agent("10").is_some_and(|a| a.is_enabled()));

    let created = session.add_project(ProjectDraft::default());
    assert_eq!(created.id, "11");
    assert_eq!(created.name, "Untitled Project");
}

#[test]
fn replay_runs_the_sample_scenario() {
    let mut session = session();
    let renderer = Renderer::new(&Config::default()).expect("renderer");
    let scenario = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios/basic_flow.json");

    let mut out = Vec::new();
    dispatch(&mut session, &renderer, &mut out, Command::Replay { scenario })
        .expect("scenario replays");
    let text = String::from_utf8(out).expect("utf8");

    let tasks = session.tasks("5").expect("Apollo exists");
    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["TASK-6", "AI-7-0", "AI-7-1"]);
    assert_eq!(tasks.get("TASK-6").map(|t| t.status), Some(100));
    assert_eq!(tasks.get("TASK-6").map(|t| t.assignee.as_str()), Some("John Doe"));
    assert_eq!(session.summarize("5").map(|s| s.completed), Some(1));

    assert!(text.contains("Project created successfully"));
    assert!(text.contains("2 AI-generated tasks added to this project"));
    assert!(text.contains("Disable not confirmed"));
    assert!(text.contains("thought trace"));
    assert!(session.agent("5").is_some_and(|a| a.is_enabled()));
}

#[test]
fn replay_reports_the_failing_step() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{"name": "bad", "steps": [{"args": ["board"]}, {"args": ["project", "404"]}]}"#,
    )
    .expect("write scenario");

    let mut session = session();
    let renderer = Renderer::new(&Config::default()).expect("renderer");
    let mut out = Vec::new();
    let err = dispatch(
        &mut session,
        &renderer,
        &mut out,
        CommandLine::parse_words(["replay", path.to_str().expect("utf8 path")]).expect("parse"),
    )
    .expect_err("second step fails");

    assert!(format!("{err:#}").contains("step 2 of bad failed"));
    assert!(format!("{err:#}").contains("project not found: 404"));
}
