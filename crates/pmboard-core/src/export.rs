use chrono::SecondsFormat;
use pmboard_shared::{
  AgentLogDto,
  BoardExport,
  CapabilityDto,
  HumanInLoopDto,
  ProjectDetailDto,
  ProjectDto,
  ProjectStatusDto,
  SubFeatureDto,
  TaskDto,
  TaskSummaryDto
};

use crate::agent_log::{
  AgentLog,
  HumanInLoop
};
use crate::capability::AgentCapability;
use crate::notify::NotificationSink;
use crate::project::{
  Project,
  ProjectStatus
};
use crate::session::Session;
use crate::task::{
  Task,
  TaskSummary
};

impl From<ProjectStatus>
  for ProjectStatusDto
{
  fn from(value: ProjectStatus) -> Self {
    match value {
      | ProjectStatus::NotStarted => {
        Self::NotStarted
      }
      | ProjectStatus::InProgress => {
        Self::InProgress
      }
      | ProjectStatus::Completed => {
        Self::Completed
      }
    }
  }
}

impl From<HumanInLoop>
  for HumanInLoopDto
{
  fn from(value: HumanInLoop) -> Self {
    match value {
      | HumanInLoop::Autonomous => {
        Self::Autonomous
      }
      | HumanInLoop::HumanApproved => {
        Self::HumanApproved
      }
    }
  }
}

impl From<&Task> for TaskDto {
  fn from(task: &Task) -> Self {
    Self {
      id:              task.id.clone(),
      title:           task.title.clone(),
      category:        task
        .category
        .clone(),
      assignee:        task
        .assignee
        .clone(),
      status:          task.status,
      due_date:        task
        .due_date
        .clone(),
      last_updated:    task
        .last_updated
        .clone(),
      generated_by_ai: task
        .generated_by_ai
    }
  }
}

impl From<TaskSummary>
  for TaskSummaryDto
{
  fn from(value: TaskSummary) -> Self {
    Self {
      not_started: value.not_started,
      in_progress: value.in_progress,
      completed:   value.completed
    }
  }
}

impl From<&AgentCapability>
  for CapabilityDto
{
  fn from(cap: &AgentCapability) -> Self {
    Self {
      id:           cap.id.clone(),
      name:         cap.name.clone(),
      description:  cap
        .description
        .clone(),
      enabled:      cap.enabled,
      sub_features: cap
        .sub_features
        .iter()
        .map(|sub| {
          SubFeatureDto {
            id:      sub.id.clone(),
            name:    sub.name.clone(),
            enabled: sub.enabled
          }
        })
        .collect()
    }
  }
}

impl From<&AgentLog> for AgentLogDto {
  fn from(log: &AgentLog) -> Self {
    let stamp = |ts: chrono::DateTime<chrono::Utc>| {
      ts.to_rfc3339_opts(
        SecondsFormat::Secs,
        true
      )
    };
    Self {
      id:                 log.id.clone(),
      timestamp:          stamp(
        log.timestamp
      ),
      action:             log
        .action
        .clone(),
      task_id:            log
        .task_id
        .clone(),
      decision_context:   log
        .decision_context
        .clone(),
      goal_alignment:     log
        .goal_alignment
        .clone(),
      thought_trace:      log
        .thought_trace
        .clone(),
      dependency_impact:  log
        .dependency_impact
        .clone(),
      human_in_loop:      log
        .human_in_loop
        .into(),
      approver_name:      log
        .approver_name
        .clone(),
      approver_timestamp: log
        .approver_timestamp
        .map(stamp)
    }
  }
}

fn project_dto(
  project: &Project,
  agent_active: bool
) -> ProjectDto {
  ProjectDto {
    id: project.id.clone(),
    name: project.name.clone(),
    due_time: project.due_time.clone(),
    status: project.status.into(),
    ai_agent_enabled: project
      .ai_agent_enabled,
    agent_active
  }
}

/// Snapshot of the whole session in board order.
#[tracing::instrument(skip_all)]
pub fn export_board<N: NotificationSink>(
  session: &Session<N>
) -> BoardExport {
  let projects = session
    .projects()
    .iter()
    .map(|project| {
      let ws =
        session.workspace(&project.id);
      ProjectDetailDto {
        project:      project_dto(
          project,
          ws.is_some_and(|ws| {
            ws.agent.is_enabled()
          })
        ),
        tasks:        ws
          .map(|ws| {
            ws.tasks
              .iter()
              .map(TaskDto::from)
              .collect()
          })
          .unwrap_or_default(),
        summary:      ws
          .map(|ws| {
            ws.tasks.summarize().into()
          })
          .unwrap_or_default(),
        capabilities: ws
          .map(|ws| {
            ws.agent
              .capabilities()
              .iter()
              .map(CapabilityDto::from)
              .collect()
          })
          .unwrap_or_default()
      }
    })
    .collect();

  let logs = session
    .logs()
    .iter()
    .map(AgentLogDto::from)
    .collect();

  tracing::debug!("built board export");
  BoardExport { projects, logs }
}
