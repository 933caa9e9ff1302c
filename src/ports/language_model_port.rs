//! Hosted text-generation service port.

use crate::domain::error::ShipscopeError;

pub trait LanguageModelPort {
    /// Send one system + user message pair and return the reply text verbatim.
    fn complete(&self, system: &str, prompt: &str) -> Result<String, ShipscopeError>;
}
