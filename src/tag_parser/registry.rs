//! Closed name sets for tag matching.
//!
//! Tool and parameter names are validated once at registration; matching
//! during parsing is a lookup against the precomputed tag strings, never
//! free-form string inspection. When more than one registered name would
//! match a buffer suffix simultaneously (one name being a suffix of
//! another), declaration order decides: the earliest-declared name wins.

use tracing::warn;

/// A registered name with its precomputed opening and closing tags.
#[derive(Debug, Clone)]
pub(crate) struct TagName {
    pub name: String,
    pub open_tag: String,
    pub close_tag: String,
}

impl TagName {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            open_tag: format!("<{}>", name),
            close_tag: format!("</{}>", name),
        }
    }
}

/// Registry configuration errors, rejected at construction time.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("empty tag name")]
    EmptyName,

    #[error("invalid tag name {name:?}: only ASCII alphanumerics and '_' are allowed")]
    InvalidName { name: String },

    #[error("duplicate tag name: {name}")]
    DuplicateName { name: String },

    #[error("bulk parameter {name:?} is not a registered parameter")]
    UnknownBulkParam { name: String },

    #[error("registry has no registered tools")]
    NoTools,
}

/// Immutable registry of tool and parameter names.
///
/// Both sets are closed: an unregistered `<name>` in the input is ordinary
/// text, never a tag. One parameter may be designated as the bulk-content
/// parameter, whose value is recovered between the first occurrence of its
/// opening tag and the last occurrence of its closing tag so payloads that
/// contain tag-like substrings survive intact.
#[derive(Debug)]
pub struct TagRegistry {
    pub(crate) tools: Vec<TagName>,
    pub(crate) params: Vec<TagName>,
    pub(crate) bulk_param: Option<usize>,
}

impl TagRegistry {
    pub fn builder() -> TagRegistryBuilder {
        TagRegistryBuilder::default()
    }

    /// Registered tool names, in declaration order.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_str())
    }

    /// Registered parameter names, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    pub fn bulk_param_name(&self) -> Option<&str> {
        self.bulk_param.map(|i| self.params[i].name.as_str())
    }
}

#[derive(Debug, Default)]
pub struct TagRegistryBuilder {
    tools: Vec<String>,
    params: Vec<String>,
    bulk_param: Option<String>,
}

impl TagRegistryBuilder {
    /// Register a tool name. Declaration order is the suffix-match tie-break.
    pub fn tool(mut self, name: impl Into<String>) -> Self {
        self.tools.push(name.into());
        self
    }

    /// Register a parameter name. Declaration order is the tie-break.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    /// Designate the literal bulk-content parameter. Must also be registered
    /// with `param`.
    pub fn bulk_param(mut self, name: impl Into<String>) -> Self {
        self.bulk_param = Some(name.into());
        self
    }

    pub fn build(self) -> Result<TagRegistry, RegistryError> {
        if self.tools.is_empty() {
            return Err(RegistryError::NoTools);
        }

        let tools = validate_names(&self.tools)?;
        let params = validate_names(&self.params)?;

        let bulk_param = match self.bulk_param {
            Some(name) => Some(
                params
                    .iter()
                    .position(|p| p.name == name)
                    .ok_or(RegistryError::UnknownBulkParam { name })?,
            ),
            None => None,
        };

        warn_on_suffix_overlap(&tools);
        warn_on_suffix_overlap(&params);

        Ok(TagRegistry {
            tools,
            params,
            bulk_param,
        })
    }
}

fn validate_names(names: &[String]) -> Result<Vec<TagName>, RegistryError> {
    let mut out: Vec<TagName> = Vec::with_capacity(names.len());
    for name in names {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(RegistryError::InvalidName { name: name.clone() });
        }
        if out.iter().any(|t| t.name == *name) {
            return Err(RegistryError::DuplicateName { name: name.clone() });
        }
        out.push(TagName::new(name));
    }
    Ok(out)
}

/// Declaration order decides suffix collisions; surface them at registration
/// so the ordering dependence is visible where the names are configured.
fn warn_on_suffix_overlap(names: &[TagName]) {
    for (i, a) in names.iter().enumerate() {
        for b in names.iter().skip(i + 1) {
            if a.name.ends_with(&b.name) || b.name.ends_with(&a.name) {
                warn!(
                    first = %a.name,
                    second = %b.name,
                    "registered names overlap as suffixes; declaration order decides matches"
                );
            }
        }
    }
}
