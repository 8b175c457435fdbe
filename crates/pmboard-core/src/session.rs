use std::collections::HashMap;

use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::agent_log::{AgentLog, AgentLogStore, LogFilter};
use crate::capability::{AgentCapabilityConfig, DisableToken};
use crate::error::BoardError;
use crate::generator::{
    GeneratedTask, Generation, GenerationDraft, GeneratorSettings, ProjectContext, TaskGenerator,
};
use crate::notify::{NotificationSink, ToastQueue};
use crate::project::{Project, ProjectCollection, ProjectDraft};
use crate::route::Route;
use crate::seed::Seed;
use crate::task::{Task, TaskCollection, TaskDraft, TaskSummary, TaskUpdate, TeamMember};

pub const TASK_GENERATION: &str = "task-generation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub generator: GeneratorSettings,
    pub timezone: Tz,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            generator: GeneratorSettings::default(),
            timezone: Tz::UTC,
        }
    }
}

/// Detail-view state owned per project.
#[derive(Debug, Clone)]
pub struct ProjectWorkspace {
    pub tasks: TaskCollection,
    pub agent: AgentCapabilityConfig,
    pub draft: GenerationDraft,
}

impl ProjectWorkspace {
    fn new(ai_enabled: bool) -> Self {
        Self {
            tasks: TaskCollection::new(),
            agent: AgentCapabilityConfig::with_defaults(ai_enabled),
            draft: GenerationDraft::default(),
        }
    }
}

/// What a route resolves to against the current board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View<'a> {
    Board,
    Project(&'a Project),
    ProjectNotFound(String),
    Unknown(String),
}

/// Everything one dashboard run owns. Nothing outlives the process.
#[derive(Debug)]
pub struct Session<N: NotificationSink = ToastQueue> {
    projects: ProjectCollection,
    workspaces: HashMap<String, ProjectWorkspace>,
    logs: AgentLogStore,
    team: Vec<TeamMember>,
    generator: TaskGenerator,
    timezone: Tz,
    next_id: u64,
    notifier: N,
}

impl Session<ToastQueue> {
    pub fn new(seed: Seed, settings: SessionSettings) -> Self {
        Self::with_notifier(seed, settings, ToastQueue::default())
    }
}

impl<N: NotificationSink> Session<N> {
    #[tracing::instrument(skip_all)]
    pub fn with_notifier(seed: Seed, settings: SessionSettings, notifier: N) -> Self {
        let projects = ProjectCollection::from_projects(seed.projects);
        let mut workspaces: HashMap<String, ProjectWorkspace> = projects
            .iter()
            .map(|p| (p.id.clone(), ProjectWorkspace::new(p.ai_agent_enabled)))
            .collect();

        for entry in seed.tasks {
            match workspaces.get_mut(&entry.project_id) {
                Some(ws) => {
                    ws.tasks.add_batch([entry.task]);
                }
                None => {
                    warn!(project = %entry.project_id, task = %entry.task.id, "seed task for unknown project; skipping");
                }
            }
        }

        // Ids handed out later must not collide with numeric seed ids or
        // with seeded task ids drawn from the same counter.
        let seeded_task_numbers = workspaces
            .values()
            .flat_map(|ws| ws.tasks.iter())
            .filter_map(|task| allocated_number(&task.id));
        let next_id = projects
            .iter()
            .filter_map(|p| p.id.parse::<u64>().ok())
            .chain(seeded_task_numbers)
            .max()
            .map_or(1, |max| max.saturating_add(1));

        debug!(
            projects = projects.len(),
            logs = seed.logs.len(),
            next_id,
            "session initialised"
        );

        Self {
            projects,
            workspaces,
            logs: AgentLogStore::new(seed.logs),
            team: seed.team,
            generator: TaskGenerator::new(settings.generator),
            timezone: settings.timezone,
            next_id,
            notifier,
        }
    }

    pub fn projects(&self) -> &ProjectCollection {
        &self.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.find_by_id(id)
    }

    pub fn team(&self) -> &[TeamMember] {
        &self.team
    }

    pub fn logs(&self) -> &AgentLogStore {
        &self.logs
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn generator(&self) -> &TaskGenerator {
        &self.generator
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn workspace(&self, project_id: &str) -> Option<&ProjectWorkspace> {
        self.workspaces.get(project_id)
    }

    pub fn tasks(&self, project_id: &str) -> Option<&TaskCollection> {
        self.workspace(project_id).map(|ws| &ws.tasks)
    }

    pub fn agent(&self, project_id: &str) -> Option<&AgentCapabilityConfig> {
        self.workspace(project_id).map(|ws| &ws.agent)
    }

    pub fn agent_mut(&mut self, project_id: &str) -> Option<&mut AgentCapabilityConfig> {
        self.workspaces.get_mut(project_id).map(|ws| &mut ws.agent)
    }

    pub fn draft(&self, project_id: &str) -> Option<&GenerationDraft> {
        self.workspace(project_id).map(|ws| &ws.draft)
    }

    pub fn draft_mut(&mut self, project_id: &str) -> Option<&mut GenerationDraft> {
        self.workspaces.get_mut(project_id).map(|ws| &mut ws.draft)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn workspace_mut(&mut self, project_id: &str) -> Result<&mut ProjectWorkspace, BoardError> {
        self.workspaces
            .get_mut(project_id)
            .ok_or_else(|| BoardError::not_found("project", project_id))
    }

    #[tracing::instrument(skip(self, draft))]
    pub fn add_project(&mut self, draft: ProjectDraft) -> Project {
        let id = self.allocate_id().to_string();
        let project = self.projects.add(draft, id).clone();
        self.workspaces.insert(
            project.id.clone(),
            ProjectWorkspace::new(project.ai_agent_enabled),
        );

        let description = if project.ai_agent_enabled {
            "AI Agent is enabled for this project."
        } else {
            "Project has been added to your board."
        };
        self.notifier
            .notify("Project created successfully", description);
        project
    }

    /// Turns the agent on from the project's detail view: the one-way board
    /// flag and the reversible master switch both end up true.
    #[tracing::instrument(skip(self))]
    pub fn enable_ai(&mut self, project_id: &str) -> Result<(), BoardError> {
        self.switch_agent_on(project_id)?;
        self.notifier.notify(
            "AI Agent enabled for this project",
            "You can now generate tasks using AI.",
        );
        Ok(())
    }

    /// Same state change as [`Session::enable_ai`], confirmed from a board row.
    #[tracing::instrument(skip(self))]
    pub fn enable_ai_from_board(&mut self, project_id: &str) -> Result<(), BoardError> {
        self.switch_agent_on(project_id)?;
        self.notifier.notify(
            "AI Agent enabled successfully",
            "AI can now generate and manage tasks for this project.",
        );
        Ok(())
    }

    fn switch_agent_on(&mut self, project_id: &str) -> Result<(), BoardError> {
        if !self.projects.enable_ai(project_id) {
            return Err(BoardError::not_found("project", project_id));
        }
        self.workspace_mut(project_id)?.agent.enable();
        Ok(())
    }

    pub fn request_disable(&mut self, project_id: &str) -> Result<DisableToken, BoardError> {
        Ok(self.workspace_mut(project_id)?.agent.request_disable()?)
    }

    #[tracing::instrument(skip(self, token))]
    pub fn confirm_disable(
        &mut self,
        project_id: &str,
        token: DisableToken,
    ) -> Result<(), BoardError> {
        self.workspace_mut(project_id)?
            .agent
            .confirm_disable(token)?;
        self.notifier.notify(
            "AI Agent disabled for this project",
            "Agent actions are paused until re-enabled.",
        );
        Ok(())
    }

    pub fn cancel_disable(
        &mut self,
        project_id: &str,
        token: DisableToken,
    ) -> Result<(), BoardError> {
        Ok(self.workspace_mut(project_id)?.agent.cancel_disable(token)?)
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    pub fn add_task(&mut self, project_id: &str, draft: TaskDraft) -> Result<Task, BoardError> {
        draft.validate()?;
        let id = format!("TASK-{}", self.allocate_id());
        let team = self.team.clone();
        let task = self
            .workspace_mut(project_id)?
            .tasks
            .add(draft, id, &team)?
            .clone();

        self.notifier.notify(
            "Task added successfully",
            &format!("\"{}\" has been added to your task list.", task.title),
        );
        Ok(task)
    }

    pub fn update_task(&mut self, project_id: &str, task_id: &str, update: TaskUpdate) -> bool {
        self.workspaces
            .get_mut(project_id)
            .is_some_and(|ws| ws.tasks.update(task_id, update))
    }

    pub fn remove_task(&mut self, project_id: &str, task_id: &str) -> Option<Task> {
        self.workspaces
            .get_mut(project_id)
            .and_then(|ws| ws.tasks.remove(task_id))
    }

    pub fn summarize(&self, project_id: &str) -> Option<TaskSummary> {
        self.tasks(project_id).map(TaskCollection::summarize)
    }

    pub fn project_context(&self, project_id: &str) -> Option<ProjectContext> {
        self.project(project_id).map(|p| ProjectContext {
            project_id: p.id.clone(),
            name: p.name.clone(),
            details: p.details.clone(),
            outcome: p.outcome.clone(),
        })
    }

    /// Claims the generator for a project whose agent and task-generation
    /// capability are both on.
    #[tracing::instrument(skip(self))]
    pub fn start_generation(&self, project_id: &str) -> Result<Generation, BoardError> {
        let context = self
            .project_context(project_id)
            .ok_or_else(|| BoardError::not_found("project", project_id))?;
        let agent = &self
            .workspace(project_id)
            .ok_or_else(|| BoardError::not_found("project", project_id))?
            .agent;

        if !agent.is_enabled() {
            return Err(BoardError::AgentUnavailable {
                project: project_id.to_string(),
                capability: "AI agent",
            });
        }
        if !agent.capability(TASK_GENERATION).is_some_and(|c| c.enabled) {
            return Err(BoardError::AgentUnavailable {
                project: project_id.to_string(),
                capability: "task generation",
            });
        }

        Ok(self.generator.start(context)?)
    }

    /// Replaces the project's review set with a fresh batch.
    pub fn load_candidates(
        &mut self,
        project_id: &str,
        tasks: Vec<GeneratedTask>,
    ) -> Result<(), BoardError> {
        let ws = self.workspace_mut(project_id)?;
        debug!(count = tasks.len(), "loading generated candidates");
        ws.draft = GenerationDraft::new(tasks);
        Ok(())
    }

    pub fn discard_candidates(&mut self, project_id: &str) {
        if let Some(ws) = self.workspaces.get_mut(project_id) {
            ws.draft.clear();
        }
    }

    /// Moves the selected candidates into the project's task list and
    /// returns the tasks that were appended. Nothing happens when no
    /// candidate is selected.
    #[tracing::instrument(skip(self))]
    pub fn commit_generated(&mut self, project_id: &str) -> Result<Vec<Task>, BoardError> {
        let batch_id = self.next_id;
        let team = self.team.clone();
        let ws = self.workspace_mut(project_id)?;
        if ws.draft.selected_count() == 0 {
            return Err(BoardError::Validation {
                field: "selected tasks",
            });
        }

        let (fresh, clashing): (Vec<Task>, Vec<Task>) = ws
            .draft
            .commit()
            .into_iter()
            .enumerate()
            .map(|(idx, candidate)| candidate.into_task(format!("AI-{batch_id}-{idx}"), &team))
            .partition(|task| !ws.tasks.contains(&task.id));
        for task in &clashing {
            warn!(id = %task.id, "generated task id already taken; dropping candidate");
        }

        let ids: Vec<String> = fresh.iter().map(|task| task.id.clone()).collect();
        let appended = ws.tasks.add_batch(fresh);
        let committed: Vec<Task> = ids
            .iter()
            .filter_map(|id| ws.tasks.get(id).cloned())
            .collect();
        self.allocate_id();

        info!(appended, "committed generated tasks");
        self.notifier.notify(
            &format!("{appended} AI-generated tasks added to this project"),
            "Tasks have been added to your task list.",
        );
        Ok(committed)
    }

    pub fn filter_logs(&self, filter: &LogFilter) -> Vec<&AgentLog> {
        self.logs.filter(filter)
    }

    pub fn resolve(&self, route: &Route) -> View<'_> {
        match route {
            Route::Board => View::Board,
            Route::Project(id) => match self.project(id) {
                Some(project) => View::Project(project),
                None => {
                    debug!(id = %id, "route points at a missing project");
                    View::ProjectNotFound(id.clone())
                }
            },
            Route::Unknown(raw) => View::Unknown(raw.clone()),
        }
    }
}

/// Counter value behind a `TASK-<n>` or `AI-<n>-<i>` id.
fn allocated_number(task_id: &str) -> Option<u64> {
    let rest = task_id
        .strip_prefix("TASK-")
        .or_else(|| task_id.strip_prefix("AI-"))?;
    rest.split('-').next()?.parse().ok()
}
