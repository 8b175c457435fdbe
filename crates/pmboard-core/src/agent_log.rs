use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::datetime::{local_date, parse_timestamp};
use crate::error::BoardError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HumanInLoop {
    Autonomous,
    #[serde(rename = "Human Approved")]
    HumanApproved,
}

impl HumanInLoop {
    pub fn label(self) -> &'static str {
        match self {
            Self::Autonomous => "Autonomous",
            Self::HumanApproved => "Human Approved",
        }
    }
}

/// One audit-trail record of an agent action. Never mutated once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub decision_context: String,
    pub goal_alignment: String,
    pub thought_trace: String,
    pub dependency_impact: String,
    pub human_in_loop: HumanInLoop,
    #[serde(default)]
    pub approver_name: Option<String>,
    #[serde(default)]
    pub approver_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogOrigin {
    #[default]
    All,
    Autonomous,
    HumanApproved,
}

impl LogOrigin {
    fn matches(self, value: HumanInLoop) -> bool {
        match self {
            Self::All => true,
            Self::Autonomous => value == HumanInLoop::Autonomous,
            Self::HumanApproved => value == HumanInLoop::HumanApproved,
        }
    }
}

impl FromStr for LogOrigin {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "autonomous" => Ok(Self::Autonomous),
            "human-approved" | "human_approved" | "approved" => Ok(Self::HumanApproved),
            other => Err(BoardError::InvalidValue {
                field: "origin",
                value: other.to_string(),
            }),
        }
    }
}

/// Audit-trail filter. All set predicates must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub origin: LogOrigin,
    pub task_id: String,
    pub date: Option<NaiveDate>,
    pub timezone: Tz,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            origin: LogOrigin::All,
            task_id: String::new(),
            date: None,
            timezone: Tz::UTC,
        }
    }
}

impl LogFilter {
    pub fn matches(&self, log: &AgentLog) -> bool {
        if !self.origin.matches(log.human_in_loop) {
            return false;
        }

        let needle = self.task_id.trim().to_lowercase();
        if !needle.is_empty() {
            let hit = log
                .task_id
                .as_deref()
                .is_some_and(|id| id.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if let Some(date) = self.date
            && local_date(log.timestamp, self.timezone) != date
        {
            return false;
        }

        trace!(id = %log.id, "log entry passed filter");
        true
    }
}

/// Append-only audit trail in arrival order.
#[derive(Debug, Clone, Default)]
pub struct AgentLogStore {
    logs: Vec<AgentLog>,
}

impl AgentLogStore {
    pub fn new(logs: Vec<AgentLog>) -> Self {
        Self { logs }
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentLog> {
        self.logs.iter()
    }

    pub fn get(&self, id: &str) -> Option<&AgentLog> {
        self.logs.iter().find(|log| log.id == id)
    }

    #[tracing::instrument(skip(self, log), fields(id = %log.id))]
    pub fn append(&mut self, log: AgentLog) {
        debug!("appending agent log entry");
        self.logs.push(log);
    }

    #[tracing::instrument(skip(self))]
    pub fn filter(&self, filter: &LogFilter) -> Vec<&AgentLog> {
        let out: Vec<&AgentLog> = self.logs.iter().filter(|log| filter.matches(log)).collect();
        debug!(matched = out.len(), total = self.logs.len(), "filtered agent logs");
        out
    }
}

/// Which log entries are shown expanded. Presentation only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogExpansion {
    expanded: BTreeSet<String>,
}

impl LogExpansion {
    /// Flips the entry's state and returns whether it is now expanded.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.to_string());
            true
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

/// Raw log record as it appears in seed files, with string timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAgentLog {
    pub id: String,
    pub timestamp: String,
    pub action: String,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub decision_context: String,
    #[serde(default)]
    pub goal_alignment: String,
    #[serde(default)]
    pub thought_trace: String,
    #[serde(default)]
    pub dependency_impact: String,
    pub human_in_loop: HumanInLoop,
    #[serde(default)]
    pub approver_name: Option<String>,
    #[serde(default)]
    pub approver_timestamp: Option<String>,
}

impl TryFrom<RawAgentLog> for AgentLog {
    type Error = BoardError;

    fn try_from(raw: RawAgentLog) -> Result<Self, Self::Error> {
        let approver_timestamp = raw
            .approver_timestamp
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;
        Ok(Self {
            id: raw.id,
            timestamp: parse_timestamp(&raw.timestamp)?,
            action: raw.action,
            task_id: raw.task_id.filter(|id| !id.trim().is_empty()),
            decision_context: raw.decision_context,
            goal_alignment: raw.goal_alignment,
            thought_trace: raw.thought_trace,
            dependency_impact: raw.dependency_impact,
            human_in_loop: raw.human_in_loop,
            approver_name: raw.approver_name,
            approver_timestamp,
        })
    }
}
