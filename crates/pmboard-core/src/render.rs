use std::io::{self, IsTerminal, Write};

use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::agent_log::{AgentLog, LogExpansion};
use crate::capability::{AgentCapabilityConfig, AgentState};
use crate::config::Config;
use crate::datetime::format_timestamp;
use crate::generator::GeneratedTask;
use crate::notify::Notification;
use crate::project::Project;
use crate::task::{Task, TaskSummary, TeamMember, UNASSIGNED};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color = cfg.get_bool("color")?.unwrap_or(true);
        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, out, projects))]
    pub fn print_project_table<W: Write>(
        &self,
        out: &mut W,
        projects: &[&Project],
    ) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Due".to_string(),
            "Status".to_string(),
            "AI".to_string(),
        ];

        let rows = projects
            .iter()
            .map(|project| {
                let ai = if project.ai_agent_enabled {
                    self.paint("enabled", "32")
                } else {
                    "-".to_string()
                };
                vec![
                    self.paint(&project.id, "33"),
                    project.name.clone(),
                    project.due_time.clone(),
                    project.status.label().to_string(),
                    ai,
                ]
            })
            .collect();

        write_table(&mut *out, headers, rows)?;
        writeln!(out, "{} project(s)", projects.len())?;
        Ok(())
    }

    pub fn print_project_header<W: Write>(
        &self,
        out: &mut W,
        project: &Project,
        agent: AgentState,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&project.name, "1"))?;
        writeln!(out, "status    {}", project.status.label())?;
        if !project.start_date.is_empty() || !project.due_date.is_empty() {
            writeln!(out, "dates     {} - {}", project.start_date, project.due_date)?;
        }
        if !project.team_name.is_empty() {
            writeln!(
                out,
                "team      {} ({} members)",
                project.team_name, project.team_size
            )?;
        }
        if !project.details.is_empty() {
            writeln!(out, "details   {}", project.details)?;
        }
        if !project.outcome.is_empty() {
            writeln!(out, "outcome   {}", project.outcome)?;
        }
        let agent_label = match agent {
            AgentState::Enabled => self.paint("enabled", "32"),
            AgentState::PendingDisable => self.paint("disable pending", "33"),
            AgentState::Disabled => "disabled".to_string(),
        };
        writeln!(out, "ai agent  {agent_label}")?;
        Ok(())
    }

    #[tracing::instrument(skip(self, out, tasks))]
    pub fn print_task_table<W: Write>(&self, out: &mut W, tasks: &[&Task]) -> anyhow::Result<()> {
        let headers = vec![
            "ID".to_string(),
            "Title".to_string(),
            "Category".to_string(),
            "Assignee".to_string(),
            "Status".to_string(),
            "Due".to_string(),
            "Updated".to_string(),
            "AI".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let status = format!("{}%", task.status);
                let status = if task.is_closed() {
                    self.paint(&status, "32")
                } else {
                    status
                };
                vec![
                    self.paint(&task.id, "33"),
                    task.title.clone(),
                    task.category.clone(),
                    task.assignee.clone(),
                    status,
                    task.due_date.clone(),
                    task.last_updated.clone(),
                    if task.generated_by_ai {
                        self.paint("ai", "35")
                    } else {
                        String::new()
                    },
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn print_summary<W: Write>(&self, out: &mut W, summary: TaskSummary) -> anyhow::Result<()> {
        writeln!(
            out,
            "not started {}  in progress {}  completed {}",
            summary.not_started, summary.in_progress, summary.completed
        )?;
        Ok(())
    }

    pub fn print_capabilities<W: Write>(
        &self,
        out: &mut W,
        agent: &AgentCapabilityConfig,
    ) -> anyhow::Result<()> {
        for cap in agent.capabilities() {
            writeln!(
                out,
                "[{}] {} ({})",
                self.check(cap.enabled && agent.is_enabled()),
                cap.name,
                cap.id
            )?;
            writeln!(out, "    {}", cap.description)?;
            for sub in agent.visible_sub_features(&cap.id) {
                writeln!(out, "    [{}] {} ({})", self.check(sub.enabled), sub.name, sub.id)?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, out, logs, expanded))]
    pub fn print_logs<W: Write>(
        &self,
        out: &mut W,
        logs: &[&AgentLog],
        expanded: &LogExpansion,
        tz: Tz,
    ) -> anyhow::Result<()> {
        if logs.is_empty() {
            writeln!(out, "No logs match the current filters.")?;
            return Ok(());
        }

        for log in logs {
            let marker = if expanded.is_expanded(&log.id) { "v" } else { ">" };
            writeln!(
                out,
                "{marker} {}  {}  [{}]{}",
                self.paint(&format_timestamp(log.timestamp, tz), "2"),
                log.action,
                log.human_in_loop.label(),
                log.task_id
                    .as_deref()
                    .map(|id| format!("  {}", self.paint(id, "33")))
                    .unwrap_or_default()
            )?;

            if !expanded.is_expanded(&log.id) {
                continue;
            }
            writeln!(out, "    decision context   {}", log.decision_context)?;
            writeln!(out, "    goal alignment     {}", log.goal_alignment)?;
            writeln!(out, "    thought trace      {}", log.thought_trace)?;
            writeln!(out, "    dependency impact  {}", log.dependency_impact)?;
            if let Some(name) = &log.approver_name {
                let when = log
                    .approver_timestamp
                    .map(|ts| format!(" on {}", format_timestamp(ts, tz)))
                    .unwrap_or_default();
                writeln!(out, "    approved by        {name}{when}")?;
            }
        }
        Ok(())
    }

    pub fn print_candidates<W: Write>(
        &self,
        out: &mut W,
        candidates: &[GeneratedTask],
        team: &[TeamMember],
    ) -> anyhow::Result<()> {
        let headers = vec![
            "".to_string(),
            "ID".to_string(),
            "Title".to_string(),
            "Priority".to_string(),
            "Category".to_string(),
            "Assignee".to_string(),
        ];

        let rows = candidates
            .iter()
            .map(|task| {
                let assignee = team
                    .iter()
                    .find(|m| m.id == task.assignee)
                    .map_or(UNASSIGNED, |m| m.name.as_str());
                vec![
                    self.check(task.selected).to_string(),
                    self.paint(&task.id, "33"),
                    task.title.clone(),
                    task.priority.label().to_string(),
                    task.category.clone(),
                    assignee.to_string(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn print_notifications<W: Write>(
        &self,
        out: &mut W,
        notes: &[Notification],
    ) -> anyhow::Result<()> {
        for note in notes {
            writeln!(out, "{} {}", self.paint("*", "36"), self.paint(&note.title, "1"))?;
            writeln!(out, "  {}", note.description)?;
        }
        Ok(())
    }

    fn check(&self, on: bool) -> &'static str {
        if on { "x" } else { " " }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ", width = *width)?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectStatus;

    fn render_to_string(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn table_columns_use_display_width() {
        let text = render_to_string(|out| {
            write_table(
                out,
                vec!["A".to_string(), "B".to_string()],
                vec![vec!["日本".to_string(), "x".to_string()]],
            )
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A    B ");
        assert_eq!(lines[1], "---- - ");
        assert_eq!(lines[2], "日本 x ");
    }

    #[test]
    fn strip_ansi_removes_color_codes() {
        assert_eq!(strip_ansi("\x1b[33mTASK-1\x1b[0m"), "TASK-1");
    }

    #[test]
    fn rejects_unknown_color_setting() {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "sometimes".to_string())]);
        let err = Renderer::new(&cfg).expect_err("bad color");
        assert!(err.to_string().contains("invalid color"));
    }

    #[test]
    fn project_table_lists_names_and_count() {
        let renderer = Renderer::new(&Config::default()).expect("renderer");
        let project = Project {
            id: "2".to_string(),
            name: "Ninth User".to_string(),
            due_time: "1 year ago".to_string(),
            status: ProjectStatus::NotStarted,
            ai_agent_enabled: true,
            start_date: String::new(),
            due_date: String::new(),
            team_name: String::new(),
            team_size: 0,
            details: String::new(),
            outcome: String::new(),
        };
        let text = render_to_string(|out| renderer.print_project_table(out, &[&project]));
        assert!(text.contains("Ninth User"));
        assert!(text.contains("Not started"));
        assert!(text.ends_with("1 project(s)\n"));
    }
}
