use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatusDto {
  NotStarted,
  InProgress,
  Completed
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "kebab-case")]
pub enum HumanInLoopDto {
  Autonomous,
  HumanApproved
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct ProjectDto {
  pub id:               String,
  pub name:             String,
  pub due_time:         String,
  pub status:           ProjectStatusDto,
  pub ai_agent_enabled: bool,
  #[serde(default)]
  pub agent_active:     bool
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct TaskDto {
  pub id:              String,
  pub title:           String,
  pub category:        String,
  pub assignee:        String,
  pub status:          u8,
  pub due_date:        String,
  pub last_updated:    String,
  pub generated_by_ai: bool
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Default,
)]
pub struct TaskSummaryDto {
  pub not_started: usize,
  pub in_progress: usize,
  pub completed:   usize
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct SubFeatureDto {
  pub id:      String,
  pub name:    String,
  pub enabled: bool
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct CapabilityDto {
  pub id:           String,
  pub name:         String,
  pub description:  String,
  pub enabled:      bool,
  #[serde(default)]
  pub sub_features: Vec<SubFeatureDto>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct AgentLogDto {
  pub id:                 String,
  pub timestamp:          String,
  pub action:             String,
  pub task_id:            Option<String>,
  pub decision_context:   String,
  pub goal_alignment:     String,
  pub thought_trace:      String,
  pub dependency_impact:  String,
  pub human_in_loop:      HumanInLoopDto,
  pub approver_name:      Option<String>,
  pub approver_timestamp: Option<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct ProjectDetailDto {
  pub project:      ProjectDto,
  pub tasks:        Vec<TaskDto>,
  pub summary:      TaskSummaryDto,
  pub capabilities: Vec<CapabilityDto>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
pub struct BoardExport {
  pub projects: Vec<ProjectDetailDto>,
  pub logs:     Vec<AgentLogDto>
}
