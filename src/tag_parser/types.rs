use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A finalized or in-progress unit of parsed assistant output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain narration text
    Text(TextBlock),
    /// A tool invocation with named parameters
    ToolUse(ToolInvocation),
}

impl ContentBlock {
    /// Whether the block's closing delimiter has not yet been observed.
    pub fn is_partial(&self) -> bool {
        match self {
            ContentBlock::Text(t) => t.partial,
            ContentBlock::ToolUse(t) => t.partial,
        }
    }
}

/// Free text between tool invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub content: String,
    pub partial: bool,
}

/// A structured tool call with a registered name and captured parameters.
///
/// The parameter map only grows; once a parameter value is closed it is
/// never reopened. `partial` stays true if the stream ended before the
/// invocation's closing tag was seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub params: HashMap<String, String>,
    pub partial: bool,
}

impl ToolInvocation {
    pub(crate) fn open(name: String) -> Self {
        Self {
            name,
            params: HashMap::new(),
            partial: true,
        }
    }
}
