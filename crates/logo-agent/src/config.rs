use config::{Config, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::providers::mcp::McpServerConfig;

pub const LOGO_TOOLS_SERVER_NAME: &str = "LogoImageValidationTools";
pub const WEB_SEARCH_SERVER_NAME: &str = "WebSearch";

/// Variables that must be present and non-empty, in the order they are checked.
pub const REQUIRED_ENV_VARS: [&str; 3] = [
    "AZURE_AI_CONNECTION_STRING",
    "AZURE_AI_CHAT_MODEL_ID",
    "BRAVE_API_KEY",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Please set the {env_var} environment variable.")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Every setting the workflow needs, read once at startup.
///
/// Field names are the lowercased environment variable names.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub azure_ai_connection_string: String,
    pub azure_ai_chat_model_id: String,
    pub brave_api_key: String,
    #[serde(default = "default_api_version")]
    pub azure_ai_agents_api_version: String,
    #[serde(default = "default_logo_validator_command")]
    pub logo_validator_mcp_command: String,
    #[serde(default = "default_logo_validator_args")]
    pub logo_validator_mcp_args: String,
    #[serde(default = "default_web_search_command")]
    pub web_search_mcp_command: String,
    #[serde(default = "default_web_search_args")]
    pub web_search_mcp_args: String,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    /// Load settings from an explicit set of variables instead of the process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Environment::default().source(Some(vars)))
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(environment.ignore_empty(true))
            .build()?;

        let settings: Self = config.try_deserialize().map_err(|err| {
            tracing::debug!("Configuration error: {:?}", &err);
            let error_str = err.to_string();
            if error_str.starts_with("missing field") {
                // "missing field `brave_api_key`"
                let field = error_str
                    .trim_start_matches("missing field `")
                    .trim_end_matches('`');
                ConfigError::MissingEnvVar {
                    env_var: to_env_var(field),
                }
            } else if let config::ConfigError::NotFound(field) = &err {
                ConfigError::MissingEnvVar {
                    env_var: to_env_var(field),
                }
            } else {
                ConfigError::Other(err)
            }
        })?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            &self.azure_ai_connection_string,
            &self.azure_ai_chat_model_id,
            &self.brave_api_key,
        ];
        for (name, value) in REQUIRED_ENV_VARS.iter().zip(required) {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingEnvVar {
                    env_var: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Launch configuration for the logo image validation tool server
    pub fn logo_tools_server(&self) -> McpServerConfig {
        McpServerConfig {
            name: LOGO_TOOLS_SERVER_NAME.to_string(),
            command: self.logo_validator_mcp_command.clone(),
            args: split_args(&self.logo_validator_mcp_args),
            env: None,
        }
    }

    /// Launch configuration for the web search tool server, which receives the api key
    pub fn web_search_server(&self) -> McpServerConfig {
        McpServerConfig {
            name: WEB_SEARCH_SERVER_NAME.to_string(),
            command: self.web_search_mcp_command.clone(),
            args: split_args(&self.web_search_mcp_args),
            env: Some(HashMap::from([(
                "BRAVE_API_KEY".to_string(),
                self.brave_api_key.clone(),
            )])),
        }
    }
}

fn to_env_var(field: &str) -> String {
    field.to_uppercase()
}

fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(String::from).collect()
}

fn default_api_version() -> String {
    "2024-12-01-preview".to_string()
}

fn default_logo_validator_command() -> String {
    "dotnet".to_string()
}

fn default_logo_validator_args() -> String {
    "run --project logo-validator-mcp".to_string()
}

fn default_web_search_command() -> String {
    "npx".to_string()
}

fn default_web_search_args() -> String {
    "-y @modelcontextprotocol/server-brave-search".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "AZURE_AI_CONNECTION_STRING".to_string(),
                "eastus.api.azureml.ms;sub-id;my-rg;my-project".to_string(),
            ),
            ("AZURE_AI_CHAT_MODEL_ID".to_string(), "gpt-4o".to_string()),
            ("BRAVE_API_KEY".to_string(), "brave-key".to_string()),
        ])
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::from_vars(complete_vars()).unwrap();

        assert_eq!(settings.azure_ai_chat_model_id, "gpt-4o");
        assert_eq!(settings.azure_ai_agents_api_version, "2024-12-01-preview");
        assert_eq!(settings.logo_validator_mcp_command, "dotnet");
        assert_eq!(settings.web_search_mcp_command, "npx");
    }

    #[test]
    fn test_missing_variable_is_named() {
        for name in REQUIRED_ENV_VARS {
            let mut vars = complete_vars();
            vars.remove(name);

            match Settings::from_vars(vars) {
                Err(ConfigError::MissingEnvVar { env_var }) => assert_eq!(env_var, name),
                other => panic!("Expected MissingEnvVar for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_empty_variable_counts_as_missing() {
        for name in REQUIRED_ENV_VARS {
            let mut vars = complete_vars();
            vars.insert(name.to_string(), String::new());

            let err = Settings::from_vars(vars).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Please set the {} environment variable.", name)
            );
        }
    }

    #[test]
    fn test_blank_variable_counts_as_missing() {
        let mut vars = complete_vars();
        vars.insert("AZURE_AI_CHAT_MODEL_ID".to_string(), "   ".to_string());

        assert!(matches!(
            Settings::from_vars(vars),
            Err(ConfigError::MissingEnvVar { env_var }) if env_var == "AZURE_AI_CHAT_MODEL_ID"
        ));
    }

    #[test]
    fn test_server_configs() {
        let mut vars = complete_vars();
        vars.insert(
            "LOGO_VALIDATOR_MCP_ARGS".to_string(),
            "run --project /opt/logo-validator".to_string(),
        );
        let settings = Settings::from_vars(vars).unwrap();

        let logo = settings.logo_tools_server();
        assert_eq!(logo.name, LOGO_TOOLS_SERVER_NAME);
        assert_eq!(logo.args, vec!["run", "--project", "/opt/logo-validator"]);
        assert!(logo.env.is_none());

        let search = settings.web_search_server();
        assert_eq!(search.name, WEB_SEARCH_SERVER_NAME);
        assert_eq!(
            search.env.unwrap().get("BRAVE_API_KEY").map(String::as_str),
            Some("brave-key")
        );
    }
}
