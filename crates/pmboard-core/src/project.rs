use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::task::JUST_NOW;

pub const UNTITLED_PROJECT: &str = "Untitled Project";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ProjectStatus {
    #[default]
    #[serde(rename = "Not started")]
    NotStarted,
    #[serde(rename = "In progress")]
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub due_time: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub ai_agent_enabled: bool,

    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub team_name: String,
    #[serde(default)]
    pub team_size: usize,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub outcome: String,
}

/// Fields collected by the "New Project" form. Nothing is required; a blank
/// name falls back to [`UNTITLED_PROJECT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    pub name: String,
    pub members: String,
    pub start_date: String,
    pub due_date: String,
    pub details: String,
    pub outcome: String,
    pub ai_agent_enabled: bool,
}

impl Default for ProjectDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            members: "all-members".to_string(),
            start_date: String::new(),
            due_date: String::new(),
            details: String::new(),
            outcome: String::new(),
            ai_agent_enabled: false,
        }
    }
}

/// Projects in board order, newest first.
#[derive(Debug, Clone, Default)]
pub struct ProjectCollection {
    projects: Vec<Project>,
}

impl ProjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the board in the given order. Later duplicates of an id are
    /// dropped.
    pub fn from_projects(projects: Vec<Project>) -> Self {
        let mut out = Self::new();
        for project in projects {
            if out.find_by_id(&project.id).is_none() {
                out.projects.push(project);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    /// Creates a project from a draft and puts it at the top of the board.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn add(&mut self, draft: ProjectDraft, id: String) -> &Project {
        let name = if draft.name.trim().is_empty() {
            UNTITLED_PROJECT.to_string()
        } else {
            draft.name.trim().to_string()
        };

        let project = Project {
            id,
            name,
            due_time: JUST_NOW.to_string(),
            status: ProjectStatus::NotStarted,
            ai_agent_enabled: draft.ai_agent_enabled,
            start_date: draft.start_date,
            due_date: draft.due_date,
            team_name: draft.members,
            team_size: 0,
            details: draft.details,
            outcome: draft.outcome,
        };
        info!(id = %project.id, ai = project.ai_agent_enabled, "project created");
        self.projects.insert(0, project);
        &self.projects[0]
    }

    /// Turns the AI agent on for a project. There is no project-level
    /// disable; returns `false` for unknown ids.
    #[tracing::instrument(skip(self))]
    pub fn enable_ai(&mut self, id: &str) -> bool {
        match self.projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                if project.ai_agent_enabled {
                    debug!("ai agent already enabled");
                }
                project.ai_agent_enabled = true;
                true
            }
            None => {
                debug!("enable_ai target not found; ignoring");
                false
            }
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn filter_by_name(&self, query: &str) -> Vec<&Project> {
        let q = query.to_lowercase();
        self.projects
            .iter()
            .filter(|p| q.is_empty() || p.name.to_lowercase().contains(&q))
            .collect()
    }
}
