use serde::Deserialize;
use validator::Validate;

use crate::ad_config::AdConfiguration;
use crate::targeting::Targeting;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("toml parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Runtime settings consulted while a request is assembled.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SdkConfiguration {
    pub use_external_click_browser: bool,
}

impl SdkConfiguration {
    /// OpenRTB `imp.clickbrowser`: 1 opens clicks externally, 0 in-app.
    pub fn click_browser(&self) -> i64 {
        if self.use_external_click_browser {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    pub level: log::LevelFilter,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: log::LevelFilter::Info,
        }
    }
}

/// Process-wide settings: log level and SDK runtime behaviour.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sdk: SdkConfiguration,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

/// Everything needed to assemble one request, as read from a TOML file.
///
/// ```toml
/// sdk_version = "2.1.0"
///
/// [logging]
/// level = "debug"
///
/// [sdk]
/// use_external_click_browser = true
///
/// [placement]
/// ad_unit_kind = "banner"
/// ad_formats = ["video"]
/// size = { w = 300, h = 250 }
/// video_parameters = { placement = "InFeed" }
///
/// [targeting]
/// coppa = 1
/// params = { foo = "bar" }
/// ```
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlacementFile {
    #[validate(length(min = 1))]
    pub sdk_version: String,
    #[serde(flatten)]
    pub app: AppConfig,
    #[serde(default)]
    #[validate(nested)]
    pub placement: AdConfiguration,
    #[serde(default)]
    pub targeting: Targeting,
}

impl PlacementFile {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: PlacementFile = toml::from_str(s)?;
        file.validate()?;
        Ok(file)
    }
}
