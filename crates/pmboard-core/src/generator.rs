use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{BoardError, GenerateError};
use crate::task::{DUE_TBD, JUST_NOW, Task, TeamMember, UNASSIGNED};

pub const AI_CATEGORY: &str = "AI Generated";
pub const DEFAULT_LATENCY_MS: u64 = 1500;
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(BoardError::InvalidValue {
                field: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// What the generator knows about the project it is planning for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectContext {
    pub project_id: String,
    pub name: String,
    pub details: String,
    pub outcome: String,
}

/// A candidate task awaiting review. Never stored on a project directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedTask {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub due_date: String,
    pub priority: Priority,
    pub category: String,
    /// Team-member id, blank when unassigned.
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_true")]
    pub generated_by_ai: bool,
}

fn default_true() -> bool {
    true
}

impl GeneratedTask {
    /// Builds the committed task. The review category is replaced by
    /// [`AI_CATEGORY`]; unknown assignee ids fall back to unassigned.
    pub fn into_task(self, id: String, team: &[TeamMember]) -> Task {
        let assignee = team
            .iter()
            .find(|member| !self.assignee.is_empty() && member.id == self.assignee)
            .map(|member| member.name.clone())
            .unwrap_or_else(|| UNASSIGNED.to_string());
        let due_date = if self.due_date.trim().is_empty() {
            DUE_TBD.to_string()
        } else {
            self.due_date
        };

        Task {
            id,
            title: self.title,
            category: AI_CATEGORY.to_string(),
            assignee,
            status: 0,
            due_date,
            last_updated: JUST_NOW.to_string(),
            generated_by_ai: true,
        }
    }
}

/// Single-field edit on a candidate during review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedTaskEdit {
    Title(String),
    Description(String),
    DueDate(String),
    Priority(Priority),
    Category(String),
    Assignee(String),
}

/// Working set shown in the review dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationDraft {
    tasks: Vec<GeneratedTask>,
}

impl GenerationDraft {
    pub fn new(tasks: Vec<GeneratedTask>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[GeneratedTask] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.selected).count()
    }

    pub fn toggle_selected(&mut self, id: &str) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.selected = !task.selected;
                true
            }
            None => false,
        }
    }

    pub fn edit(&mut self, id: &str, edit: GeneratedTaskEdit) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        match edit {
            GeneratedTaskEdit::Title(v) => task.title = v,
            GeneratedTaskEdit::Description(v) => task.description = v,
            GeneratedTaskEdit::DueDate(v) => task.due_date = v,
            GeneratedTaskEdit::Priority(v) => task.priority = v,
            GeneratedTaskEdit::Category(v) => task.category = v,
            GeneratedTaskEdit::Assignee(v) => task.assignee = v,
        }
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        before != self.tasks.len()
    }

    /// Hands over the selected candidates in review order and clears the set.
    pub fn commit(&mut self) -> Vec<GeneratedTask> {
        let all = std::mem::take(&mut self.tasks);
        let selected: Vec<GeneratedTask> = all.into_iter().filter(|t| t.selected).collect();
        debug!(selected = selected.len(), "committing generated tasks");
        selected
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub latency: Duration,
    pub timeout: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(DEFAULT_LATENCY_MS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

/// Mock task generator. At most one run is in flight at a time.
#[derive(Debug, Clone, Default)]
pub struct TaskGenerator {
    settings: GeneratorSettings,
    busy: Arc<AtomicBool>,
}

impl TaskGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            settings,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn settings(&self) -> GeneratorSettings {
        self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claims the generator for one run. Fails with [`GenerateError::Busy`]
    /// while another run has not finished or been dropped.
    #[tracing::instrument(skip(self, context), fields(project = %context.project_id))]
    pub fn start(&self, context: ProjectContext) -> Result<Generation, GenerateError> {
        let guard = BusyGuard::acquire(&self.busy)?;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        info!("task generation started");
        Ok(Generation {
            context,
            settings: self.settings,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
            guard,
        })
    }

    /// Starts and awaits a run in one step.
    pub async fn generate(
        &self,
        context: ProjectContext,
    ) -> Result<Vec<GeneratedTask>, GenerateError> {
        self.start(context)?.finish().await
    }
}

#[derive(Debug)]
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, GenerateError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                warn!("generation requested while another is in flight");
                GenerateError::Busy
            })?;
        Ok(Self(Arc::clone(flag)))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cancels the run it was taken from. Cancelling twice, or after the run
/// finished, does nothing.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// One in-flight generation run. Holds the generator's busy flag until it
/// is finished or dropped.
#[derive(Debug)]
pub struct Generation {
    context: ProjectContext,
    settings: GeneratorSettings,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
    guard: BusyGuard,
}

impl Generation {
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancel_tx))
    }

    #[tracing::instrument(skip(self), fields(project = %self.context.project_id))]
    pub async fn finish(self) -> Result<Vec<GeneratedTask>, GenerateError> {
        let Generation {
            context,
            settings,
            cancel_tx,
            mut cancel_rx,
            guard,
        } = self;

        let outcome = tokio::time::timeout(settings.timeout, async {
            tokio::select! {
                () = tokio::time::sleep(settings.latency) => Ok(()),
                () = cancelled(&mut cancel_rx) => Err(GenerateError::Cancelled),
            }
        })
        .await;

        drop(cancel_tx);
        drop(guard);

        match outcome {
            Ok(Ok(())) => {
                let batch = mock_batch(&context);
                info!(count = batch.len(), "task generation finished");
                Ok(batch)
            }
            Ok(Err(err)) => {
                info!("task generation cancelled");
                Err(err)
            }
            Err(_) => {
                let ms = u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(timeout_ms = ms, "task generation timed out");
                Err(GenerateError::TimedOut(ms))
            }
        }
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// The canned batch standing in for a real planning service.
pub fn mock_batch(context: &ProjectContext) -> Vec<GeneratedTask> {
    let rows: [(&str, String, &str, Priority, &str); 5] = [
        (
            "1",
            format!("Define project scope for {}", context.name),
            "Create detailed project scope document outlining deliverables, timeline, and resources",
            Priority::High,
            "Planning",
        ),
        (
            "2",
            "Set up project infrastructure".to_string(),
            "Configure development environment, repositories, and CI/CD pipelines",
            Priority::High,
            "Development",
        ),
        (
            "3",
            "Create initial project plan".to_string(),
            "Develop comprehensive project plan with milestones and task breakdown",
            Priority::Medium,
            "Planning",
        ),
        (
            "4",
            "Stakeholder alignment meeting".to_string(),
            "Schedule and conduct kickoff meeting with all stakeholders",
            Priority::Medium,
            "Review",
        ),
        (
            "5",
            "Risk assessment".to_string(),
            "Identify potential risks and create mitigation strategies",
            Priority::Low,
            "Planning",
        ),
    ];

    rows.into_iter()
        .map(|(id, title, description, priority, category)| GeneratedTask {
            id: id.to_string(),
            title,
            description: description.to_string(),
            due_date: String::new(),
            priority,
            category: category.to_string(),
            assignee: String::new(),
            selected: false,
            generated_by_ai: true,
        })
        .collect()
}
