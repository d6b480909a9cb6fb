use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, Result};

/// Top-level call automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Service name used in logs
    pub service_name: String,

    /// Name of the menu presented when a call starts
    pub main_menu_name: String,

    /// Event dispatch settings
    pub dispatcher: DispatcherConfig,

    /// IVR menu settings
    pub ivr: IvrConfig,
}

/// Event dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Callbacks allowed to run at once; events beyond this are dropped
    pub max_in_flight_callbacks: usize,

    /// Grace period for in-flight callbacks on shutdown (milliseconds)
    pub shutdown_grace_ms: u64,
}

/// IVR menu configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IvrConfig {
    /// Attempts the top-level menu makes before giving up
    pub num_retries: u32,

    /// Prompt played while waiting for a choice
    pub prompt_uri: Option<String>,

    /// Prompt played when a tone has no choice bound
    pub invalid_entry_uri: Option<String>,

    /// Prompt played when the caller pressed nothing
    pub no_option_selected_uri: Option<String>,

    /// Music looped while a participant is being added
    pub hold_music_uri: Option<String>,

    /// Caller id presented on outbound invites (E.164)
    pub phone_number: String,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            service_name: "callflow".to_string(),
            main_menu_name: "MainMenu".to_string(),
            dispatcher: DispatcherConfig::default(),
            ivr: IvrConfig::new(),
        }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight_callbacks: 1000,
            shutdown_grace_ms: 5000,
        }
    }
}

impl DispatcherConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for IvrConfig {
    fn default() -> Self {
        Self {
            num_retries: 3,
            prompt_uri: None,
            invalid_entry_uri: None,
            no_option_selected_uri: None,
            hold_music_uri: None,
            phone_number: String::new(),
        }
    }
}

impl IvrConfig {
    /// Configuration with the default retry count and no prompts
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_invalid_entry_uri(mut self, uri: impl Into<String>) -> Self {
        self.invalid_entry_uri = Some(uri.into());
        self
    }

    pub fn with_prompt_uri(mut self, uri: impl Into<String>) -> Self {
        self.prompt_uri = Some(uri.into());
        self
    }

    pub fn with_no_option_selected_uri(mut self, uri: impl Into<String>) -> Self {
        self.no_option_selected_uri = Some(uri.into());
        self
    }

    pub fn with_num_retries(mut self, num_retries: u32) -> Self {
        self.num_retries = num_retries;
        self
    }
}

impl AutomationConfig {
    /// Load configuration from a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") => toml::from_str(&contents)
                .map_err(|e| AutomationError::config(format!("{}: {}", path.display(), e)))?,
            _ => {
                return Err(AutomationError::config(format!(
                    "unsupported configuration format: {}",
                    path.display()
                )));
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Overlay `CALLFLOW_*` environment variables onto this configuration
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(name) = std::env::var("CALLFLOW_MAIN_MENU") {
            self.main_menu_name = name;
        }
        if let Ok(retries) = std::env::var("CALLFLOW_NUM_RETRIES") {
            self.ivr.num_retries = retries
                .parse()
                .map_err(|_| AutomationError::config(format!("invalid CALLFLOW_NUM_RETRIES: {}", retries)))?;
        }
        if let Ok(uri) = std::env::var("CALLFLOW_INVALID_ENTRY_URI") {
            self.ivr.invalid_entry_uri = Some(uri);
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings no deployment can run with
    pub fn validate(&self) -> Result<()> {
        if self.ivr.num_retries == 0 {
            return Err(AutomationError::config("ivr.num_retries must be at least 1"));
        }
        if self.dispatcher.max_in_flight_callbacks == 0 {
            return Err(AutomationError::config(
                "dispatcher.max_in_flight_callbacks must be at least 1",
            ));
        }
        if self.main_menu_name.trim().is_empty() {
            return Err(AutomationError::config("main_menu_name must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AutomationConfig::default();
        assert_eq!(config.main_menu_name, "MainMenu");
        assert_eq!(config.ivr.num_retries, 3);
        assert_eq!(config.dispatcher.shutdown_grace(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
main_menu_name = "Support"

[dispatcher]
max_in_flight_callbacks = 16

[ivr]
num_retries = 2
invalid_entry_uri = "https://x/invalid.wav"
phone_number = "+18005550100"
"#
        )
        .unwrap();

        let config = AutomationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.main_menu_name, "Support");
        assert_eq!(config.dispatcher.max_in_flight_callbacks, 16);
        assert_eq!(config.dispatcher.shutdown_grace_ms, 5000);
        assert_eq!(config.ivr.num_retries, 2);
        assert_eq!(config.ivr.invalid_entry_uri.as_deref(), Some("https://x/invalid.wav"));
        assert_eq!(config.ivr.prompt_uri, None);
    }

    #[test]
    fn test_load_json_and_reject_zero_retries() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"ivr": {{"num_retries": 0}}}}"#).unwrap();

        let result = AutomationConfig::from_file(file.path());
        assert!(matches!(result, Err(AutomationError::Config(_))));
    }

    #[test]
    fn test_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            AutomationConfig::from_file(file.path()),
            Err(AutomationError::Config(_))
        ));
    }
}
