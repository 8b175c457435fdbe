use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::TaskState;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pmboard",
    version,
    about = "Project board with a simulated AI project-manager agent",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file")]
    pub rc_file: Option<PathBuf>,

    /// TOML seed file replacing the built-in mock data.
    #[arg(long = "seed")]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// A bare command line without global flags, as used by `default.command`
/// and replay scenarios.
#[derive(Parser, Debug, Clone)]
#[command(name = "pmboard", no_binary_name = true, disable_help_subcommand = true)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

impl CommandLine {
    pub fn parse_words<I, S>(words: I) -> anyhow::Result<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let parsed = Self::try_parse_from(words).map_err(|e| anyhow!("{e}"))?;
        Ok(parsed.command)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List projects on the board.
    Board {
        #[arg(long, default_value = "")]
        search: String,

        /// Enable the AI agent on this board row before listing.
        #[arg(long, value_name = "ID")]
        enable_ai: Option<String>,
    },

    /// Resolve a dashboard path such as `/project/2`.
    Open { route: String },

    /// Show one project's detail view.
    Project {
        id: String,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_enum, default_value_t = StateArg::Open)]
        state: StateArg,
    },

    /// Show the agent audit trail.
    Logs {
        #[arg(long, default_value = "all")]
        origin: String,
        #[arg(long, default_value = "")]
        task: String,
        /// `YYYY-MM-DD`, `today`, `yesterday`, or an offset like `-2d`.
        #[arg(long)]
        date: Option<String>,
        #[arg(long, action = ArgAction::Append)]
        expand: Vec<String>,
    },

    /// Inspect or change a project's agent configuration.
    Agent(AgentArgs),

    AddProject(AddProjectArgs),

    AddTask(AddTaskArgs),

    UpdateTask(UpdateTaskArgs),

    RemoveTask {
        project_id: String,
        task_id: String,
    },

    /// Run the mock generator and commit the chosen candidates.
    Generate(GenerateArgs),

    /// Print the whole session as JSON.
    Export {
        #[arg(long)]
        pretty: bool,
    },

    /// Run a JSON scenario of commands against one session.
    Replay { scenario: PathBuf },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AgentArgs {
    pub project_id: String,

    #[arg(long, conflicts_with = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,

    /// Confirm a disable. Without it the request is cancelled.
    #[arg(long, requires = "disable")]
    pub yes: bool,

    #[arg(long = "toggle", action = ArgAction::Append)]
    pub toggle: Vec<String>,

    /// `CAPABILITY/SUB_FEATURE`
    #[arg(long = "toggle-sub", action = ArgAction::Append)]
    pub toggle_sub: Vec<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AddProjectArgs {
    #[arg(long, default_value = "")]
    pub name: String,
    #[arg(long, default_value = "all-members")]
    pub members: String,
    #[arg(long, default_value = "")]
    pub start: String,
    #[arg(long, default_value = "")]
    pub due: String,
    #[arg(long, default_value = "")]
    pub details: String,
    #[arg(long, default_value = "")]
    pub outcome: String,
    #[arg(long)]
    pub ai: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AddTaskArgs {
    pub project_id: String,
    #[arg(long, default_value = "")]
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Team-member id or a free-form name.
    #[arg(long, default_value = "")]
    pub assignee: String,
    #[arg(long, default_value = "")]
    pub start: String,
    #[arg(long, default_value = "")]
    pub due: String,
    #[arg(
        long,
        default_value = crate::task::DEFAULT_CATEGORY,
        value_parser = clap::builder::PossibleValuesParser::new(crate::task::CATEGORIES)
    )]
    pub category: String,
    #[arg(long, default_value_t = 3)]
    pub severity: u8,
    #[arg(long)]
    pub unpublished: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct UpdateTaskArgs {
    pub project_id: String,
    pub task_id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub assignee: Option<String>,
    #[arg(long)]
    pub status: Option<u8>,
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    pub project_id: String,

    /// Candidate ids to commit.
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    #[arg(long, conflicts_with = "select")]
    pub all: bool,

    /// `ID=PRIORITY` edits applied before committing.
    #[arg(long = "priority", action = ArgAction::Append)]
    pub priorities: Vec<KeyValArg>,

    /// `ID=MEMBER_ID` edits applied before committing.
    #[arg(long = "assign", action = ArgAction::Append)]
    pub assignees: Vec<KeyValArg>,

    #[arg(long)]
    pub cancel_after_ms: Option<u64>,
}

/// `KEY=VALUE` argument that can live inside a derived `PartialEq` type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValArg(pub String, pub String);

impl std::str::FromStr for KeyValArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kv = s.parse::<KeyVal>()?;
        Ok(Self(kv.key, kv.value))
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateArg {
    All,
    Open,
    Closed,
}

impl From<StateArg> for TaskState {
    fn from(value: StateArg) -> Self {
        match value {
            StateArg::All => Self::All,
            StateArg::Open => Self::Open,
            StateArg::Closed => Self::Closed,
        }
    }
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.KEY=VALUE` (or `rc.KEY:VALUE`) overrides out of the
/// argument list before clap sees it.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> PreprocessedArgs {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_rc_overrides_are_stripped() {
        let pre = preprocess_args(&os(&[
            "pmboard",
            "rc.color=off",
            "board",
            "rc.display.timezone:UTC",
        ]));
        assert_eq!(pre.cleaned_args, os(&["pmboard", "board"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.display.timezone".to_string(), "UTC".to_string()),
            ]
        );
    }

    #[test]
    fn global_flags_and_subcommand_parse_together() {
        let cli = GlobalCli::try_parse_from([
            "pmboard",
            "-vv",
            "--rc",
            "color=off",
            "generate",
            "2",
            "--select",
            "1,3",
            "--priority",
            "3=high",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "color");

        let Some(Command::Generate(args)) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.select, vec!["1".to_string(), "3".to_string()]);
        assert_eq!(args.priorities, vec![KeyValArg("3".to_string(), "high".to_string())]);
    }

    #[test]
    fn bare_command_lines_parse_without_binary_name() {
        let cmd = CommandLine::parse_words(["project", "1", "--state", "closed"]).expect("parse");
        assert_eq!(
            cmd,
            Command::Project {
                id: "1".to_string(),
                search: String::new(),
                state: StateArg::Closed,
            }
        );
        assert!(CommandLine::parse_words(["launch"]).is_err());
    }

    #[test]
    fn task_category_must_be_a_known_option() {
        assert!(CommandLine::parse_words(["add-task", "1", "--category", "Design"]).is_ok());
        assert!(CommandLine::parse_words(["add-task", "1", "--category", "Misc"]).is_err());
    }

    #[test]
    fn confirm_flag_needs_disable() {
        assert!(CommandLine::parse_words(["agent", "1", "--yes"]).is_err());
        assert!(CommandLine::parse_words(["agent", "1", "--disable", "--yes"]).is_ok());
    }
}
