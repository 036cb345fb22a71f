//! Display context attached to a browser session.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label used until a session picks a context.
pub const DEFAULT_CONTEXT: &str = "GENERAL";

/// Free-text label that scopes a session's conversation.
///
/// Queries sent to an agent and replies shown to the user are both prefixed
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayContext(String);

impl DisplayContext {
    /// Create a context from a label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The raw label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.0
    }

    /// Text sent to the agent: `"<label> <text>"`.
    #[must_use]
    pub fn query(&self, text: &str) -> String {
        format!("{} {text}", self.0)
    }

    /// Text shown to the user: `"<label>\n<text>"`.
    #[must_use]
    pub fn reply(&self, text: &str) -> String {
        format!("{}\n{text}", self.0)
    }

    /// Greeting sent once when a session joins this context.
    #[must_use]
    pub fn welcome(&self) -> String {
        self.reply(&format!(
            "Welcome to the {} service. How can I help you today?",
            self.0
        ))
    }
}

impl Default for DisplayContext {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT)
    }
}

impl fmt::Display for DisplayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DisplayContext {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_general() {
        assert_eq!(DisplayContext::default().label(), "GENERAL");
    }

    #[test]
    fn test_prefixes() {
        let ctx = DisplayContext::new("Amazon");
        assert_eq!(ctx.query("find shoes"), "Amazon find shoes");
        assert_eq!(ctx.reply("done"), "Amazon\ndone");
        assert!(ctx.welcome().starts_with("Amazon\nWelcome to the Amazon service"));
    }
}
