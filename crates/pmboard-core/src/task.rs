use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::datetime::format_display_date;
use crate::error::BoardError;

pub const UNASSIGNED: &str = "Unassigned";
pub const DUE_TBD: &str = "TBD";
pub const JUST_NOW: &str = "Just now";
pub const DEFAULT_CATEGORY: &str = "Development";
pub const STATUS_COMPLETE: u8 = 100;

pub const CATEGORIES: [&str; 6] = [
    "S-Micro-Ecosystem",
    "Development",
    "Design",
    "Planning",
    "Review",
    "Testing",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
}

/// Maps a team-member id to its display name. Unknown values are kept as
/// typed and blank values become [`UNASSIGNED`].
pub fn resolve_assignee(team: &[TeamMember], raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNASSIGNED.to_string();
    }
    team.iter()
        .find(|member| member.id == raw)
        .map(|member| member.name.clone())
        .unwrap_or_else(|| raw.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub category: String,
    pub assignee: String,

    /// Completion percent, always within `0..=100`.
    pub status: u8,

    pub due_date: String,
    pub last_updated: String,

    #[serde(default)]
    pub generated_by_ai: bool,
}

impl Task {
    pub fn is_closed(&self) -> bool {
        self.status >= STATUS_COMPLETE
    }
}

/// Fields collected by the manual "New Task" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub start_date: String,
    pub due_date: String,
    pub category: String,
    pub severity: u8,
    pub publishable: bool,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            assignee: String::new(),
            start_date: String::new(),
            due_date: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            severity: 3,
            publishable: true,
        }
    }
}

impl TaskDraft {
    pub fn validate(&self) -> Result<(), BoardError> {
        if self.title.trim().is_empty() {
            return Err(BoardError::Validation { field: "title" });
        }
        if self.start_date.trim().is_empty() {
            return Err(BoardError::Validation {
                field: "start date",
            });
        }
        if self.due_date.trim().is_empty() {
            return Err(BoardError::Validation { field: "due date" });
        }
        Ok(())
    }

    /// Whether the submit control would be enabled.
    pub fn is_submittable(&self) -> bool {
        self.validate().is_ok()
    }

    fn into_task(self, id: String, team: &[TeamMember]) -> Result<Task, BoardError> {
        self.validate()?;
        let due_date = format_display_date(self.due_date.trim())?;
        Ok(Task {
            id,
            title: self.title.trim().to_string(),
            category: self.category,
            assignee: resolve_assignee(team, &self.assignee),
            status: 0,
            due_date,
            last_updated: JUST_NOW.to_string(),
            generated_by_ai: false,
        })
    }
}

/// Single-field replacement on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskUpdate {
    Title(String),
    Category(String),
    Assignee(String),
    Status(u8),
    DueDate(String),
    LastUpdated(String),
}

impl TaskUpdate {
    fn apply(self, task: &mut Task) {
        match self {
            Self::Title(title) => task.title = title,
            Self::Category(category) => task.category = category,
            Self::Assignee(assignee) => {
                task.assignee = if assignee.trim().is_empty() {
                    UNASSIGNED.to_string()
                } else {
                    assignee
                }
            }
            Self::Status(status) => task.status = status.min(STATUS_COMPLETE),
            Self::DueDate(due) => task.due_date = due,
            Self::LastUpdated(stamp) => task.last_updated = stamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    All,
    #[default]
    Open,
    Closed,
}

impl TaskState {
    fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Open => !task.is_closed(),
            Self::Closed => task.is_closed(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskSummary {
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl TaskSummary {
    pub fn total(&self) -> usize {
        self.not_started + self.in_progress + self.completed
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskCollection {
    tasks: Vec<Task>,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut out = Self::new();
        out.add_batch(tasks);
        out
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Validates a manual draft and appends the resulting task.
    #[tracing::instrument(skip(self, draft, team), fields(title = %draft.title))]
    pub fn add(
        &mut self,
        draft: TaskDraft,
        id: String,
        team: &[TeamMember],
    ) -> Result<&Task, BoardError> {
        if self.contains(&id) {
            return Err(BoardError::InvalidValue {
                field: "task id",
                value: id,
            });
        }
        let task = draft.into_task(id, team)?;
        debug!(id = %task.id, "appending manual task");
        self.tasks.push(task);
        let idx = self.tasks.len() - 1;
        Ok(&self.tasks[idx])
    }

    /// Appends already-built tasks in input order. Tasks whose id is already
    /// present are skipped. Returns how many were appended.
    #[tracing::instrument(skip(self, tasks))]
    pub fn add_batch<I>(&mut self, tasks: I) -> usize
    where
        I: IntoIterator<Item = Task>,
    {
        let mut appended = 0;
        for mut task in tasks {
            if self.contains(&task.id) {
                warn!(id = %task.id, "skipping task with duplicate id");
                continue;
            }
            task.status = task.status.min(STATUS_COMPLETE);
            self.tasks.push(task);
            appended += 1;
        }
        debug!(appended, total = self.tasks.len(), "appended task batch");
        appended
    }

    /// Replaces one field on the matching task. Returns `false` when the id
    /// is unknown.
    #[tracing::instrument(skip(self))]
    pub fn update(&mut self, id: &str, update: TaskUpdate) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("update target not found; ignoring");
            return false;
        };
        update.apply(task);
        trace!(task = ?task, "task updated");
        true
    }

    /// Removes the first task with a matching id.
    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|task| task.id == id)?;
        Some(self.tasks.remove(idx))
    }

    pub fn filter_by_title(&self, query: &str) -> Vec<&Task> {
        let q = query.to_lowercase();
        self.tasks
            .iter()
            .filter(|task| q.is_empty() || task.title.to_lowercase().contains(&q))
            .collect()
    }

    pub fn filter_by_state(&self, state: TaskState) -> Vec<&Task> {
        self.tasks.iter().filter(|task| state.matches(task)).collect()
    }

    /// Title query and open/closed toggle together, as the task tab shows them.
    pub fn visible(&self, query: &str, state: TaskState) -> Vec<&Task> {
        self.filter_by_title(query)
            .into_iter()
            .filter(|task| state.matches(task))
            .collect()
    }

    pub fn summarize(&self) -> TaskSummary {
        self.tasks
            .iter()
            .fold(TaskSummary::default(), |mut acc, task| {
                match task.status {
                    0 => acc.not_started += 1,
                    STATUS_COMPLETE.. => acc.completed += 1,
                    _ => acc.in_progress += 1,
                }
                acc
            })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn team() -> Vec<TeamMember> {
        vec![TeamMember {
            id: "1".to_string(),
            name: "John Doe".to_string(),
        }]
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            start_date: "2026-01-10".to_string(),
            due_date: "2026-01-13".to_string(),
            ..TaskDraft::default()
        }
    }

    fn ai_task(id: &str, status: u8) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            category: "AI Generated".to_string(),
            assignee: UNASSIGNED.to_string(),
            status,
            due_date: DUE_TBD.to_string(),
            last_updated: JUST_NOW.to_string(),
            generated_by_ai: true,
        }
    }

    #[test]
    fn manual_add_requires_title_and_dates() {
        let mut tasks = TaskCollection::new();

        let mut missing_due = draft("Write docs");
        missing_due.due_date = "  ".to_string();
        assert_eq!(
            tasks.add(missing_due, "TASK-1".to_string(), &team()),
            Err(BoardError::Validation { field: "due date" })
        );

        let mut missing_start = draft("Write docs");
        missing_start.start_date.clear();
        assert!(!missing_start.is_submittable());

        assert_eq!(
            tasks.add(draft(""), "TASK-1".to_string(), &team()),
            Err(BoardError::Validation { field: "title" })
        );
        assert!(tasks.is_empty());
    }

    #[test]
    fn manual_add_resolves_assignee_and_formats_due_date() {
        let mut tasks = TaskCollection::new();
        let mut d = draft("Kickoff");
        d.assignee = "1".to_string();

        let task = tasks
            .add(d, "TASK-1".to_string(), &team())
            .expect("valid draft")
            .clone();

        assert_eq!(task.assignee, "John Doe");
        assert_eq!(task.due_date, "Jan 13, 2026");
        assert_eq!(task.status, 0);
        assert_eq!(task.last_updated, JUST_NOW);
        assert!(!task.generated_by_ai);

        let unassigned = tasks
            .add(draft("Follow up"), "TASK-2".to_string(), &team())
            .expect("valid draft");
        assert_eq!(unassigned.assignee, UNASSIGNED);
    }

    #[test]
    fn duplicate_ids_never_enter_the_collection() {
        let mut tasks = TaskCollection::new();
        tasks
            .add(draft("a"), "TASK-1".to_string(), &team())
            .expect("first add");
        assert!(tasks.add(draft("b"), "TASK-1".to_string(), &team()).is_err());

        let appended = tasks.add_batch(vec![ai_task("TASK-1", 0), ai_task("AI-1-0", 0)]);
        assert_eq!(appended, 1);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn update_replaces_one_field_and_keeps_order() {
        let mut tasks =
            TaskCollection::from_tasks(vec![ai_task("a", 0), ai_task("b", 0), ai_task("c", 0)]);

        assert!(tasks.update("b", TaskUpdate::Title("renamed".to_string())));
        assert!(tasks.update("b", TaskUpdate::Status(250)));
        assert!(!tasks.update("zzz", TaskUpdate::Status(50)));

        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let b = tasks.get("b").expect("b exists");
        assert_eq!(b.title, "renamed");
        assert_eq!(b.status, 100);
        assert_eq!(b.category, "AI Generated");
    }

    #[test]
    fn completing_a_task_moves_exactly_one_count() {
        let mut tasks =
            TaskCollection::from_tasks(vec![ai_task("a", 0), ai_task("b", 40), ai_task("c", 0)]);
        let before = tasks.summarize();

        tasks.update("a", TaskUpdate::Status(100));
        let after = tasks.summarize();

        assert_eq!(after.completed, before.completed + 1);
        assert!(after.not_started <= before.not_started);
        assert!(after.in_progress <= before.in_progress);
        assert_eq!(after.total(), tasks.len());
    }

    #[test]
    fn summary_tracks_length_across_mutations() {
        let mut tasks = TaskCollection::new();
        tasks.add_batch((0..6).map(|i| ai_task(&format!("t{i}"), (i * 20) as u8)));
        assert_eq!(tasks.summarize().total(), tasks.len());

        tasks.remove("t2");
        tasks.update("t0", TaskUpdate::Status(55));
        assert!(tasks.remove("missing").is_none());
        assert_eq!(tasks.summarize().total(), tasks.len());
        assert_eq!(
            tasks.summarize(),
            TaskSummary {
                not_started: 0,
                in_progress: 4,
                completed: 1,
            }
        );
    }

    #[test]
    fn title_filter_is_case_insensitive_and_ordered() {
        let mut tasks = TaskCollection::new();
        for (id, title) in [("1", "Design Review"), ("2", "deploy"), ("3", "Review notes")] {
            let mut t = ai_task(id, 0);
            t.title = title.to_string();
            tasks.add_batch([t]);
        }

        let hits: Vec<&str> = tasks
            .filter_by_title("REVIEW")
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(hits, vec!["1", "3"]);
        assert_eq!(tasks.filter_by_title("").len(), 3);
    }

    #[test]
    fn state_filter_splits_open_and_closed() {
        let tasks =
            TaskCollection::from_tasks(vec![ai_task("a", 0), ai_task("b", 100), ai_task("c", 99)]);
        assert_eq!(tasks.filter_by_state(TaskState::Open).len(), 2);
        assert_eq!(tasks.filter_by_state(TaskState::Closed).len(), 1);
        assert_eq!(tasks.visible("task b", TaskState::Open).len(), 0);
        assert_eq!(tasks.visible("task", TaskState::All).len(), 3);
    }
}
