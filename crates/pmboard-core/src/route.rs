use std::convert::Infallible;
use std::str::FromStr;

/// Dashboard locations: `/` for the board, `/project/:id` for a detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Board,
    Project(String),
    Unknown(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Board => "/".to_string(),
            Self::Project(id) => format!("/project/{id}"),
            Self::Unknown(raw) => raw.clone(),
        }
    }
}

impl FromStr for Route {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let path = trimmed.trim_end_matches('/');
        if path.is_empty() {
            return Ok(Self::Board);
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["project", id] if !id.is_empty() => Ok(Self::Project((*id).to_string())),
            _ => Ok(Self::Unknown(trimmed.to_string())),
        }
    }
}
