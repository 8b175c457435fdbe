use thiserror::Error;

/// Errors surfaced by board operations that a caller may want to branch on.
///
/// Mutations against unknown ids are not errors; they report `false` or
/// `None` instead so event handlers stay simple.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    /// A required form field was left blank.
    #[error("missing required field: {field}")]
    Validation { field: &'static str },

    /// Lookup by id found nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A field held a value that could not be interpreted.
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    /// The project's agent, or the capability needed, is switched off.
    #[error("{capability} is not available for project {project}")]
    AgentUnavailable {
        project: String,
        capability: &'static str,
    },

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl BoardError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Errors from the agent's two-phase disable flow.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("confirmation token does not match the pending disable request")]
    StaleToken,

    #[error("agent is already disabled")]
    AlreadyDisabled,
}

/// Errors from a task generation run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateError {
    #[error("a generation is already in progress")]
    Busy,

    #[error("generation was cancelled")]
    Cancelled,

    #[error("generation timed out after {0} ms")]
    TimedOut(u64),
}
