//! Dispatcher configuration
//!
//! Configuration can be built in code or parsed from YAML, either as a bare
//! mapping or nested under an `events` key so it can live in a larger
//! ricecoder config file:
//!
//! ```yaml
//! events:
//!   include_core_events: false
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EventsError, Result};

/// Options for constructing an [`EventDispatcher`](crate::EventDispatcher)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Pre-register the lifecycle events on construction
    pub include_core_events: bool,
}

impl DispatcherConfig {
    /// Configuration without the lifecycle events
    pub fn without_core_events() -> Self {
        Self {
            include_core_events: false,
        }
    }

    /// Parse configuration from YAML
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed, is not a mapping, or
    /// contains unknown keys.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: serde_yaml::Value = serde_yaml::from_str(content)?;

        let section = match document {
            serde_yaml::Value::Null => return Ok(Self::default()),
            serde_yaml::Value::Mapping(mut mapping) => {
                match mapping.remove(serde_yaml::Value::from("events")) {
                    Some(section) => section,
                    None => serde_yaml::Value::Mapping(mapping),
                }
            }
            other => {
                return Err(EventsError::InvalidConfiguration(format!(
                    "expected a mapping, found {:?}",
                    other
                )))
            }
        };

        if section.is_null() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_value(section)?)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            include_core_events: true,
        }
    }
}
