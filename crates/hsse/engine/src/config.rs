//! Engine configuration

use crate::notifier::Channel;
use hsse_types::ApprovalLevel;
use serde::{Deserialize, Serialize};

/// Main engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Extension approval configuration
    #[serde(default)]
    pub extension: ExtensionConfig,

    /// Reference code configuration
    #[serde(default)]
    pub references: ReferenceConfig,

    /// Notification configuration
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Length of the approval chain for due-date extensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalChainPolicy {
    /// HSSE manager only
    #[default]
    SingleLevel,
    /// Line manager, then HSSE manager
    TwoLevel,
}

impl ApprovalChainPolicy {
    pub fn levels(&self) -> Vec<ApprovalLevel> {
        match self {
            ApprovalChainPolicy::SingleLevel => vec![ApprovalLevel::HsseManager],
            ApprovalChainPolicy::TwoLevel => {
                vec![ApprovalLevel::LineManager, ApprovalLevel::HsseManager]
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtensionConfig {
    #[serde(default)]
    pub approval_chain: ApprovalChainPolicy,
}

/// Reference code prefixes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceConfig {
    #[serde(default = "default_observation_prefix")]
    pub observation_prefix: String,

    #[serde(default = "default_incident_prefix")]
    pub incident_prefix: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            observation_prefix: default_observation_prefix(),
            incident_prefix: default_incident_prefix(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Hand intents to the Notifier after each commit
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Buffer size of the emitted-event broadcast channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Channel hints attached to every intent
    #[serde(default = "default_channels")]
    pub default_channels: Vec<Channel>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: default_channel_capacity(),
            default_channels: default_channels(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_observation_prefix() -> String {
    "OBS".to_string()
}

fn default_incident_prefix() -> String {
    "INC".to_string()
}

fn default_channel_capacity() -> usize {
    256
}

fn default_channels() -> Vec<Channel> {
    vec![Channel::InApp]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration from defaults, an optional file and `HSSE__*`
    /// environment variables, in increasing precedence
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Nested keys use a double underscore: HSSE__EXTENSION__APPROVAL_CHAIN
        builder = builder.add_source(
            config::Environment::with_prefix("HSSE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Two-level extension approvals, everything else default
    pub fn two_level_extensions() -> Self {
        Self {
            extension: ExtensionConfig {
                approval_chain: ApprovalChainPolicy::TwoLevel,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.extension.approval_chain, ApprovalChainPolicy::SingleLevel);
        assert_eq!(config.references.observation_prefix, "OBS");
        assert_eq!(config.references.incident_prefix, "INC");
        assert!(config.notifications.enabled);
        assert_eq!(config.notifications.channel_capacity, 256);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_chain_levels() {
        assert_eq!(
            ApprovalChainPolicy::SingleLevel.levels(),
            vec![ApprovalLevel::HsseManager]
        );
        assert_eq!(
            ApprovalChainPolicy::TwoLevel.levels(),
            vec![ApprovalLevel::LineManager, ApprovalLevel::HsseManager]
        );
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.references.incident_prefix, "INC");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"extension":{"approval_chain":"two_level"}}"#).unwrap();
        assert_eq!(config.extension.approval_chain, ApprovalChainPolicy::TwoLevel);
        assert_eq!(config.notifications.channel_capacity, 256);
    }
}
