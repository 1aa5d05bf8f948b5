//! Runtime settings read from the environment.

use std::env;

use log::info;

use crate::advisory::{AdvisoryModels, DEFAULT_ANALYSIS_MODEL, DEFAULT_BUILD_PATH_MODEL};

pub const DEFAULT_STORE_NAME: &str = "tunerspecs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Store name; the LMDB directory is `<store_name>.lmdb`.
    pub store_name: String,
    pub analysis_model: String,
    pub build_path_model: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_name: DEFAULT_STORE_NAME.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            build_path_model: DEFAULT_BUILD_PATH_MODEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `TUNERSPECS_STORE`, `TUNERSPECS_ANALYSIS_MODEL` and
    /// `TUNERSPECS_BUILD_PATH_MODEL`. Unset or blank variables keep their
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let config = Self {
            store_name: var("TUNERSPECS_STORE").unwrap_or(defaults.store_name),
            analysis_model: var("TUNERSPECS_ANALYSIS_MODEL").unwrap_or(defaults.analysis_model),
            build_path_model: var("TUNERSPECS_BUILD_PATH_MODEL")
                .unwrap_or(defaults.build_path_model),
        };

        info!(
            "Config: store={}, analysis model={}, build path model={}",
            config.store_name, config.analysis_model, config.build_path_model
        );
        config
    }

    /// Models the advisor gateway sends requests with.
    pub fn models(&self) -> AdvisoryModels {
        AdvisoryModels {
            analysis: self.analysis_model.clone(),
            build_path: self.build_path_model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let vars: HashMap<&str, &str> =
            [("TUNERSPECS_ANALYSIS_MODEL", "  "), ("TUNERSPECS_STORE", "garage")]
                .into_iter()
                .collect();
        let config = AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.store_name, "garage");
        assert_eq!(config.analysis_model, DEFAULT_ANALYSIS_MODEL);
        assert_eq!(config.models().build_path, DEFAULT_BUILD_PATH_MODEL);
    }

    #[test]
    fn test_model_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TUNERSPECS_ANALYSIS_MODEL", "gemini-2.5-pro"),
            ("TUNERSPECS_BUILD_PATH_MODEL", " gemini-2.5-flash-lite "),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.store_name, DEFAULT_STORE_NAME);
        assert_eq!(
            config.models(),
            AdvisoryModels {
                analysis: "gemini-2.5-pro".to_string(),
                build_path: "gemini-2.5-flash-lite".to_string(),
            }
        );
    }
}
