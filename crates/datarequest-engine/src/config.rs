//! Configuration for the data-request workflow

use serde::{Deserialize, Serialize};

/// Main workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Collection under which every request lives as `<root>/<id>`
    #[serde(default = "default_request_root")]
    pub request_root: String,

    /// Administrative principal, excluded from rosters and notifications
    #[serde(default = "default_admin_principal")]
    pub admin_principal: String,

    /// Purpose string that marks a request as data-assessment-only (DAO)
    #[serde(default = "default_dao_purpose")]
    pub dao_purpose: String,

    /// Group names
    #[serde(default)]
    pub groups: GroupConfig,

    /// Form schema selection
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Review-period expiration sweep
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            request_root: default_request_root(),
            admin_principal: default_admin_principal(),
            dao_purpose: default_dao_purpose(),
            groups: GroupConfig::default(),
            schema: SchemaConfig::default(),
            sweeper: SweeperConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Directory groups that confer workflow roles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Project managers (PM)
    pub project_managers: String,

    /// Data managers (DM)
    pub data_managers: String,

    /// Data access committee (DAC)
    pub data_access_committee: String,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            project_managers: "datarequests-research-project-managers".to_string(),
            data_managers: "datarequests-research-datamanagers".to_string(),
            data_access_committee: "datarequests-research-data-access-committee".to_string(),
        }
    }
}

/// Schema versioning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Version used for new submissions
    #[serde(default = "default_schema_version")]
    pub version: String,

    /// Prefix of the `describedby` link stored with each request
    #[serde(default = "default_schema_uri_prefix")]
    pub uri_prefix: String,

    /// Version reported for requests stored without links
    #[serde(default = "default_legacy_schema_version")]
    pub legacy_version: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            version: default_schema_version(),
            uri_prefix: default_schema_uri_prefix(),
            legacy_version: default_legacy_schema_version(),
        }
    }
}

impl SchemaConfig {
    /// Link to the datarequest schema of `version`.
    pub fn datarequest_schema_href(&self, version: &str) -> String {
        format!("{}{}/datarequest/schema.json", self.uri_prefix, version)
    }

    /// Inverse of [`Self::datarequest_schema_href`].
    pub fn version_from_href<'a>(&self, href: &'a str) -> Option<&'a str> {
        href.strip_prefix(self.uri_prefix.as_str())?
            .strip_suffix("/datarequest/schema.json")
    }
}

/// Sweeper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    /// Sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub interval_secs: u64,

    /// Run the periodic sweep at all
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval(),
            enabled: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
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

fn default_request_root() -> String {
    "/tempZone/home/datarequests-research".to_string()
}

fn default_admin_principal() -> String {
    "rods".to_string()
}

fn default_dao_purpose() -> String {
    "Analyses for data assessment only (results will not be published)".to_string()
}

fn default_schema_version() -> String {
    "youth-1".to_string()
}

fn default_schema_uri_prefix() -> String {
    "https://yoda.uu.nl/datarequest/schemas/".to_string()
}

fn default_legacy_schema_version() -> String {
    "youth-0".to_string()
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl WorkflowConfig {
    /// Load configuration from an optional file, overridden by
    /// `DATAREQUEST_*` environment variables (`__` separates nested keys).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&WorkflowConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DATAREQUEST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkflowConfig::default();
        assert_eq!(config.admin_principal, "rods");
        assert_eq!(config.groups.data_managers, "datarequests-research-datamanagers");
        assert_eq!(config.sweeper.interval_secs, 3600);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_schema_href_round_trip() {
        let schema = SchemaConfig::default();
        let href = schema.datarequest_schema_href("youth-1");
        assert_eq!(href, "https://yoda.uu.nl/datarequest/schemas/youth-1/datarequest/schema.json");
        assert_eq!(schema.version_from_href(&href), Some("youth-1"));
        assert_eq!(schema.version_from_href("https://example.org/other.json"), None);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = WorkflowConfig::load(None).unwrap();
        assert_eq!(config.schema.version, "youth-1");
        assert!(config.sweeper.enabled);
    }
}
