//! Parser configuration.
//!
//! The registered name sets are configuration, not code: they are
//! deserialized (or built programmatically), validated once, and turned into
//! an immutable `TagRegistry`. The default configuration carries the coding
//! agent's registered tool and parameter names.

use serde::{Deserialize, Serialize};

use crate::tag_parser::{RegistryError, TagRegistry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParserConfig {
    /// Registered tool names; order is the suffix-match tie-break.
    pub tools: Vec<String>,
    /// Registered parameter names; order is the tie-break.
    pub params: Vec<String>,
    /// Parameter whose value gets literal bulk-content recovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_param: Option<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let names = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            tools: names(&[
                "execute_command",
                "read_file",
                "write_to_file",
                "search_files",
                "list_files",
                "ask_followup_question",
                "attempt_completion",
            ]),
            params: names(&[
                "command",
                "path",
                "content",
                "regex",
                "file_pattern",
                "question",
                "result",
            ]),
            bulk_param: Some("content".to_string()),
        }
    }
}

impl ParserConfig {
    /// Validate the name sets and build the registry.
    pub fn into_registry(self) -> Result<TagRegistry, RegistryError> {
        let mut builder = TagRegistry::builder();
        for tool in self.tools {
            builder = builder.tool(tool);
        }
        for param in self.params {
            builder = builder.param(param);
        }
        if let Some(bulk) = self.bulk_param {
            builder = builder.bulk_param(bulk);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_registry() {
        let registry = ParserConfig::default().into_registry().unwrap();
        assert!(registry.tool_names().any(|t| t == "write_to_file"));
        assert_eq!(registry.bulk_param_name(), Some("content"));
    }

    #[test]
    fn deserializes_from_json() {
        let config: ParserConfig = serde_json::from_str(
            r#"{"tools": ["search"], "params": ["query"]}"#,
        )
        .unwrap();
        let registry = config.into_registry().unwrap();
        assert_eq!(registry.tool_names().collect::<Vec<_>>(), vec!["search"]);
        assert_eq!(registry.bulk_param_name(), None);
    }

    #[test]
    fn invalid_names_are_rejected_at_configuration_time() {
        let config = ParserConfig {
            tools: vec!["bad tool".to_string()],
            params: vec![],
            bulk_param: None,
        };
        assert!(config.into_registry().is_err());
    }
}
