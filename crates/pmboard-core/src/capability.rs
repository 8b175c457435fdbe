use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AgentError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubFeature {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentCapability {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    #[serde(default)]
    pub sub_features: Vec<SubFeature>,
}

/// Proof that a disable was requested. Only the most recent token is honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisableToken(Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Disabled,
    Enabled,
    PendingDisable,
}

/// Per-project agent switchboard: a master flag gating a tree of
/// capability and sub-feature toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCapabilityConfig {
    enabled: bool,
    pending_disable: Option<DisableToken>,
    capabilities: Vec<AgentCapability>,
}

impl AgentCapabilityConfig {
    pub fn new(enabled: bool, capabilities: Vec<AgentCapability>) -> Self {
        Self {
            enabled,
            pending_disable: None,
            capabilities,
        }
    }

    pub fn with_defaults(enabled: bool) -> Self {
        Self::new(enabled, default_capabilities())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> AgentState {
        match (self.enabled, self.pending_disable) {
            (false, _) => AgentState::Disabled,
            (true, Some(_)) => AgentState::PendingDisable,
            (true, None) => AgentState::Enabled,
        }
    }

    pub fn capabilities(&self) -> &[AgentCapability] {
        &self.capabilities
    }

    pub fn capability(&self, id: &str) -> Option<&AgentCapability> {
        self.capabilities.iter().find(|cap| cap.id == id)
    }

    /// Sub-features are only shown while both the agent and their parent are on.
    pub fn visible_sub_features(&self, capability_id: &str) -> &[SubFeature] {
        match self.capability(capability_id) {
            Some(cap) if self.enabled && cap.enabled => cap.sub_features.as_slice(),
            _ => &[],
        }
    }

    /// Turns the agent on immediately. Any half-finished disable request is
    /// dropped.
    #[tracing::instrument(skip(self))]
    pub fn enable(&mut self) {
        self.pending_disable = None;
        if !self.enabled {
            info!("agent enabled");
        }
        self.enabled = true;
    }

    /// First half of turning the agent off. The flag stays on until the
    /// returned token is confirmed.
    #[tracing::instrument(skip(self))]
    pub fn request_disable(&mut self) -> Result<DisableToken, AgentError> {
        if !self.enabled {
            return Err(AgentError::AlreadyDisabled);
        }
        let token = DisableToken(Uuid::new_v4());
        self.pending_disable = Some(token);
        debug!(token = %token.0, "disable requested; awaiting confirmation");
        Ok(token)
    }

    #[tracing::instrument(skip(self, token))]
    pub fn confirm_disable(&mut self, token: DisableToken) -> Result<(), AgentError> {
        self.take_pending(token)?;
        self.enabled = false;
        info!("agent disabled");
        Ok(())
    }

    #[tracing::instrument(skip(self, token))]
    pub fn cancel_disable(&mut self, token: DisableToken) -> Result<(), AgentError> {
        self.take_pending(token)?;
        debug!("disable cancelled");
        Ok(())
    }

    fn take_pending(&mut self, token: DisableToken) -> Result<(), AgentError> {
        if self.pending_disable != Some(token) {
            warn!("rejecting stale disable token");
            return Err(AgentError::StaleToken);
        }
        self.pending_disable = None;
        Ok(())
    }

    /// Flips a capability. Sub-feature flags are left untouched. Returns
    /// `false` when the agent is off or the id is unknown.
    #[tracing::instrument(skip(self))]
    pub fn toggle_capability(&mut self, capability_id: &str) -> bool {
        if !self.enabled {
            debug!("agent disabled; capability toggle ignored");
            return false;
        }
        let Some(cap) = self.capabilities.iter_mut().find(|c| c.id == capability_id) else {
            return false;
        };
        cap.enabled = !cap.enabled;
        debug!(enabled = cap.enabled, "capability toggled");
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_sub_feature(&mut self, capability_id: &str, sub_id: &str) -> bool {
        if !self.enabled {
            debug!("agent disabled; sub-feature toggle ignored");
            return false;
        }
        let Some(sub) = self
            .capabilities
            .iter_mut()
            .find(|c| c.id == capability_id)
            .and_then(|c| c.sub_features.iter_mut().find(|s| s.id == sub_id))
        else {
            return false;
        };
        sub.enabled = !sub.enabled;
        debug!(enabled = sub.enabled, "sub-feature toggled");
        true
    }
}

pub fn default_capabilities() -> Vec<AgentCapability> {
    fn sub(id: &str, name: &str, enabled: bool) -> SubFeature {
        SubFeature {
            id: id.to_string(),
            name: name.to_string(),
            enabled,
        }
    }

    vec![
        AgentCapability {
            id: "task-generation".to_string(),
            name: "Task Generation & Allocation".to_string(),
            description: "Automatically create and assign tasks based on project context"
                .to_string(),
            enabled: true,
            sub_features: vec![
                sub("auto-create", "Auto-create tasks based on project context", true),
                sub(
                    "intelligent-assign",
                    "Assign tasks to team members intelligently",
                    true,
                ),
            ],
        },
        AgentCapability {
            id: "weekly-reporting".to_string(),
            name: "Weekly Project Reporting".to_string(),
            description: "Generate and distribute automated project summaries".to_string(),
            enabled: true,
            sub_features: vec![
                sub("generate-summaries", "Generate weekly summaries", true),
                sub(
                    "email-reports",
                    "Email reports to stakeholders automatically",
                    false,
                ),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn toggles_are_inert_while_disabled() {
        let mut cfg = AgentCapabilityConfig::with_defaults(false);
        let before = cfg.clone();

        assert!(!cfg.toggle_capability("task-generation"));
        assert!(!cfg.toggle_sub_feature("weekly-reporting", "email-reports"));
        assert!(!cfg.toggle_capability("task-generation"));

        assert_eq!(cfg, before);
        assert!(cfg.visible_sub_features("task-generation").is_empty());
    }

    #[test]
    fn enable_is_immediate() {
        let mut cfg = AgentCapabilityConfig::with_defaults(false);
        cfg.enable();
        assert_eq!(cfg.state(), AgentState::Enabled);
        assert!(cfg.toggle_capability("weekly-reporting"));
    }

    #[test]
    fn cancel_keeps_agent_enabled() {
        let mut cfg = AgentCapabilityConfig::with_defaults(true);
        let token = cfg.request_disable().expect("request disable");
        assert_eq!(cfg.state(), AgentState::PendingDisable);
        assert!(cfg.is_enabled());

        cfg.cancel_disable(token).expect("cancel");
        assert!(cfg.is_enabled());
        assert_eq!(cfg.state(), AgentState::Enabled);
        assert_eq!(cfg.confirm_disable(token), Err(AgentError::StaleToken));
        assert!(cfg.is_enabled());
    }

    #[test]
    fn confirm_disables_agent() {
        let mut cfg = AgentCapabilityConfig::with_defaults(true);
        let token = cfg.request_disable().expect("request disable");
        cfg.confirm_disable(token).expect("confirm");
        assert!(!cfg.is_enabled());
        assert_eq!(cfg.request_disable(), Err(AgentError::AlreadyDisabled));
    }

    #[test]
    fn only_latest_token_is_honored() {
        let mut cfg = AgentCapabilityConfig::with_defaults(true);
        let old = cfg.request_disable().expect("first request");
        let new = cfg.request_disable().expect("second request");

        assert_eq!(cfg.confirm_disable(old), Err(AgentError::StaleToken));
        assert!(cfg.is_enabled());
        cfg.confirm_disable(new).expect("confirm latest");
        assert!(!cfg.is_enabled());
    }

    #[test]
    fn capability_toggle_does_not_cascade() {
        let mut cfg = AgentCapabilityConfig::with_defaults(true);
        let subs_before = cfg
            .capability("weekly-reporting")
            .expect("reporting")
            .sub_features
            .clone();

        assert!(cfg.toggle_capability("weekly-reporting"));
        assert!(cfg.visible_sub_features("weekly-reporting").is_empty());
        assert!(cfg.toggle_capability("weekly-reporting"));

        assert_eq!(cfg.visible_sub_features("weekly-reporting"), subs_before.as_slice());
    }

    #[test]
    fn sub_feature_toggle_flips_only_target() {
        let mut cfg = AgentCapabilityConfig::with_defaults(true);
        assert!(cfg.toggle_sub_feature("weekly-reporting", "email-reports"));
        assert!(!cfg.toggle_sub_feature("weekly-reporting", "missing"));

        let reporting = cfg.capability("weekly-reporting").expect("reporting");
        let flags: Vec<bool> = reporting.sub_features.iter().map(|s| s.enabled).collect();
        assert_eq!(flags, vec![true, true]);
    }
}
