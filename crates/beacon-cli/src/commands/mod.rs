pub mod inspect;
pub mod serve;

pub use inspect::InspectCommand;
pub use serve::ServeCommand;

use std::path::PathBuf;

use anyhow::Context;
use beacon_core::AnalyticsSettings;
use clap::Args;
use tracing::debug;

/// Settings flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// YAML or JSON settings file
    #[arg(long, env = "BEACON_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base analytics account id, overriding the settings file
    #[arg(long, env = "BEACON_ANALYTICS_ID")]
    pub account_id: Option<String>,
}

impl SettingsArgs {
    pub fn load(&self) -> anyhow::Result<AnalyticsSettings> {
        let mut settings = match &self.config {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                AnalyticsSettings::from_file(path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?
            }
            None => AnalyticsSettings::default(),
        };

        if let Some(account_id) = &self.account_id {
            settings.google_analytics_id = Some(account_id.clone());
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.yaml");
        std::fs::write(
            &path,
            "google_analytics_id: UA-1-1\nignore_paths: [/admin]\n",
        )
        .unwrap();

        let args = SettingsArgs {
            config: Some(path),
            account_id: Some("UA-2-2".to_string()),
        };
        let settings = args.load().unwrap();
        assert_eq!(settings.google_analytics_id.as_deref(), Some("UA-2-2"));
        assert_eq!(settings.ignore_paths, vec!["/admin".to_string()]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let args = SettingsArgs {
            config: Some(PathBuf::from("/nonexistent/beacon.yaml")),
            account_id: None,
        };
        let err = args.load().unwrap_err();
        assert!(err.to_string().contains("/nonexistent/beacon.yaml"));
    }
}
