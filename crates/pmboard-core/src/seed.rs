use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, info};

use crate::agent_log::{AgentLog, HumanInLoop, RawAgentLog};
use crate::error::BoardError;
use crate::project::{Project, ProjectStatus};
use crate::task::{Task, TeamMember};

/// A task bound to the project whose detail view lists it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SeedTask {
    pub project_id: String,
    #[serde(flatten)]
    pub task: Task,
}

/// Starting state for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seed {
    pub projects: Vec<Project>,
    pub team: Vec<TeamMember>,
    pub tasks: Vec<SeedTask>,
    pub logs: Vec<AgentLog>,
}

/// On-disk seed. Every section is optional; a missing one keeps the
/// built-in data.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedFile {
    #[serde(default)]
    projects: Option<Vec<Project>>,
    #[serde(default)]
    team: Option<Vec<TeamMember>>,
    #[serde(default)]
    tasks: Option<Vec<SeedTask>>,
    #[serde(default)]
    logs: Option<Vec<RawAgentLog>>,
}

impl Seed {
    /// The dashboard's mock data.
    pub fn builtin() -> Result<Self, BoardError> {
        let projects = builtin_projects();
        let tasks = projects
            .iter()
            .map(|project| SeedTask {
                project_id: project.id.clone(),
                task: builtin_task(),
            })
            .collect();

        let logs = builtin_logs()
            .into_iter()
            .map(AgentLog::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            projects,
            team: builtin_team(),
            tasks,
            logs,
        })
    }

    /// Loads a TOML seed file layered over the built-in data.
    #[tracing::instrument]
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        let seed = Self::from_toml(&text)
            .with_context(|| format!("failed to parse seed file {}", path.display()))?;
        info!(
            projects = seed.projects.len(),
            tasks = seed.tasks.len(),
            logs = seed.logs.len(),
            "loaded seed file"
        );
        Ok(seed)
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let file: SeedFile = toml::from_str(text)?;
        let mut seed = Self::builtin()?;

        if let Some(projects) = file.projects {
            debug!(count = projects.len(), "seed replaces projects");
            seed.projects = projects;
        }
        if let Some(team) = file.team {
            debug!(count = team.len(), "seed replaces team");
            seed.team = team;
        }
        if let Some(tasks) = file.tasks {
            debug!(count = tasks.len(), "seed replaces tasks");
            seed.tasks = tasks;
        }
        if let Some(logs) = file.logs {
            debug!(count = logs.len(), "seed replaces agent logs");
            seed.logs = logs
                .into_iter()
                .map(AgentLog::try_from)
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(seed)
    }
}

fn builtin_projects() -> Vec<Project> {
    struct Row {
        id: &'static str,
        name: &'static str,
        due_time: &'static str,
        ai: bool,
        detail: Option<(&'static str, &'static str, &'static str, usize, &'static str, &'static str)>,
    }

    let rows = [
        Row {
            id: "1",
            name: "New project 123",
            due_time: "1 year ago",
            ai: false,
            detail: Some((
                "Jan 13",
                "Jan 23",
                "Sixth",
                4,
                "This is a sample project for demonstration purposes.",
                "Successfully complete all deliverables on time.",
            )),
        },
        Row {
            id: "2",
            name: "Ninth User",
            due_time: "1 year ago",
            ai: true,
            detail: Some((
                "Feb 1",
                "Feb 15",
                "Alpha",
                6,
                "Marketing campaign project.",
                "Increase brand awareness by 25%.",
            )),
        },
        Row {
            id: "3",
            name: "project - K",
            due_time: "11 months ago",
            ai: false,
            detail: Some((
                "Jan 13",
                "Jan 23",
                "Sixth",
                4,
                "Sample project details for testing.",
                "Complete all milestones successfully.",
            )),
        },
        Row {
            id: "4",
            name: "test",
            due_time: "8 months ago",
            ai: false,
            detail: None,
        },
    ];

    rows.into_iter()
        .map(|row| {
            let (start_date, due_date, team_name, team_size, details, outcome) =
                row.detail.unwrap_or_default();
            Project {
                id: row.id.to_string(),
                name: row.name.to_string(),
                due_time: row.due_time.to_string(),
                status: ProjectStatus::NotStarted,
                ai_agent_enabled: row.ai,
                start_date: start_date.to_string(),
                due_date: due_date.to_string(),
                team_name: team_name.to_string(),
                team_size,
                details: details.to_string(),
                outcome: outcome.to_string(),
            }
        })
        .collect()
}

fn builtin_task() -> Task {
    Task {
        id: "TZK-493".to_string(),
        title: "ljkhjghfgf".to_string(),
        category: "S-Micro-Ecosystem &...".to_string(),
        assignee: "User".to_string(),
        status: 0,
        due_date: "Jan 13, 2026".to_string(),
        last_updated: "Yesterday".to_string(),
        generated_by_ai: false,
    }
}

fn builtin_team() -> Vec<TeamMember> {
    [
        ("1", "John Doe"),
        ("2", "Jane Smith"),
        ("3", "Mike Johnson"),
        ("4", "Sarah Williams"),
    ]
    .into_iter()
    .map(|(id, name)| TeamMember {
        id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

fn builtin_logs() -> Vec<RawAgentLog> {
    vec![
        RawAgentLog {
            id: "log-1".to_string(),
            timestamp: "2026-01-13T10:30:00Z".to_string(),
            action: "Task Created: Setup Development Environment".to_string(),
            task_id: Some("TASK-001".to_string()),
            decision_context: "Project kickoff phase requires immediate infrastructure setup \
                               to unblock development team."
                .to_string(),
            goal_alignment: "Milestone 1: Project Foundation - Complete infrastructure setup \
                             within first week."
                .to_string(),
            thought_trace: "Analyzed project timeline → Identified critical path dependency on \
                            dev environment → Prioritized based on team availability → Selected \
                            John Doe as assignee due to DevOps expertise → Set high priority to \
                            prevent downstream delays."
                .to_string(),
            dependency_impact: "Blocks 5 downstream tasks including API development and \
                                frontend setup. Early completion could accelerate sprint by 2 \
                                days."
                .to_string(),
            human_in_loop: HumanInLoop::Autonomous,
            approver_name: None,
            approver_timestamp: None,
        },
        RawAgentLog {
            id: "log-2".to_string(),
            timestamp: "2026-01-12T14:15:00Z".to_string(),
            action: "Task Reassigned: Database Schema Design".to_string(),
            task_id: Some("TASK-002".to_string()),
            decision_context: "Original assignee on leave, task approaching deadline with no \
                               progress."
                .to_string(),
            goal_alignment: "Milestone 1: Project Foundation - Database schema required for API \
                             development."
                .to_string(),
            thought_trace: "Detected task stagnation (3 days idle) → Checked assignee \
                            availability → Found original assignee on unplanned leave → \
                            Evaluated team member skills → Selected Sarah Williams (SQL \
                            expertise) → Notified stakeholders."
                .to_string(),
            dependency_impact: "Reassignment prevents 4-day delay in API development. Connected \
                                tasks: User Authentication, Data Models."
                .to_string(),
            human_in_loop: HumanInLoop::HumanApproved,
            approver_name: Some("Mike Johnson".to_string()),
            approver_timestamp: Some("2026-01-12T14:20:00Z".to_string()),
        },
        RawAgentLog {
            id: "log-3".to_string(),
            timestamp: "2026-01-11T09:00:00Z".to_string(),
            action: "Weekly Report Generated".to_string(),
            task_id: None,
            decision_context: "Scheduled weekly reporting cycle - Monday 9:00 AM.".to_string(),
            goal_alignment: "Stakeholder Communication: Keep all parties informed of project \
                             progress."
                .to_string(),
            thought_trace: "Aggregated task completion metrics → Identified risks (2 overdue \
                            tasks) → Generated summary with recommendations → Prepared email \
                            for stakeholders list."
                .to_string(),
            dependency_impact: "No task dependencies. Improves stakeholder visibility and early \
                                risk detection."
                .to_string(),
            human_in_loop: HumanInLoop::Autonomous,
            approver_name: None,
            approver_timestamp: None,
        },
    ]
}
