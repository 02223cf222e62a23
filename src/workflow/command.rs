// ! Operator commands
// !
// ! Commands are validated before anything is scheduled; a rejected command
// ! never reaches the network.

use crate::core::error::{SoakError, SoakResult};
use std::collections::HashSet;
use std::fmt;

/// Shortest accepted search query, in characters
pub const MIN_QUERY_LENGTH: usize = 3;

/// A request from the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Install the latest version of each plugin, with dependencies
    Install { plugin_ids: Vec<String> },

    /// Reinstall every installed plugin at its latest version
    Update,

    /// Remove plugins (accepted, but removal is not implemented)
    Remove { plugin_ids: Vec<String> },

    /// Search the repository catalog
    Search { query: String },
}

impl Command {
    /// Validated install command
    pub fn install<I, S>(plugin_ids: I) -> SoakResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Command::Install {
            plugin_ids: normalize_ids(plugin_ids)?,
        })
    }

    /// Validated remove command
    pub fn remove<I, S>(plugin_ids: I) -> SoakResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Command::Remove {
            plugin_ids: normalize_ids(plugin_ids)?,
        })
    }

    /// Validated search command
    pub fn search(query: impl Into<String>) -> SoakResult<Self> {
        let command = Command::Search {
            query: query.into().trim().to_string(),
        };
        command.validate()?;
        Ok(command)
    }

    /// Check the command's preconditions
    pub fn validate(&self) -> SoakResult<()> {
        match self {
            Command::Install { plugin_ids } | Command::Remove { plugin_ids } => {
                if plugin_ids.is_empty() {
                    return Err(SoakError::validation("No plugin IDs provided"));
                }
                if plugin_ids.iter().any(|id| id.trim().is_empty()) {
                    return Err(SoakError::validation("Plugin IDs must not be blank"));
                }
                Ok(())
            }
            Command::Update => Ok(()),
            Command::Search { query } => {
                if query.trim().chars().count() < MIN_QUERY_LENGTH {
                    return Err(SoakError::validation(format!(
                        "Query must be at least {MIN_QUERY_LENGTH} characters"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Install { .. } => "install",
            Command::Update => "update",
            Command::Remove { .. } => "remove",
            Command::Search { .. } => "search",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Install { plugin_ids } => write!(f, "install {}", plugin_ids.join(" ")),
            Command::Update => f.write_str("update"),
            Command::Remove { plugin_ids } => write!(f, "remove {}", plugin_ids.join(" ")),
            Command::Search { query } => write!(f, "search {query}"),
        }
    }
}

/// Trim ids, reject blanks and drop duplicates keeping first-seen order
fn normalize_ids<I, S>(plugin_ids: I) -> SoakResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for id in plugin_ids {
        let id = id.as_ref().trim();
        if id.is_empty() {
            return Err(SoakError::validation("Plugin IDs must not be blank"));
        }
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }
    if ids.is_empty() {
        return Err(SoakError::validation("No plugin IDs provided"));
    }
    Ok(ids)
}
