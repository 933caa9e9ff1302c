//! Allowed-user check.

use crate::domain::error::ShipscopeError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessPolicy {
    allowed_ids: Vec<String>,
}

impl AccessPolicy {
    pub fn new(allowed_ids: Vec<String>) -> Self {
        Self { allowed_ids }
    }

    /// Reads `[access] allowed_ids`; a missing or empty list means open access.
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        Self::new(config.get_list("access", "allowed_ids"))
    }

    pub fn is_open(&self) -> bool {
        self.allowed_ids.is_empty()
    }

    pub fn authorize(&self, user: Option<&str>) -> Result<(), ShipscopeError> {
        if self.is_open() {
            return Ok(());
        }
        let user = user.map(str::trim).unwrap_or_default();
        if self.allowed_ids.iter().any(|id| id == user) {
            log::info!("user '{}' authorized", user);
            Ok(())
        } else {
            log::warn!("rejected user '{}'", user);
            Err(ShipscopeError::AccessDenied {
                user: user.to_string(),
            })
        }
    }
}
