use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::Mutex;

use super::base::PlatformError;

/// Resource the agents api expects tokens for
pub const AZURE_RESOURCE: &str = "https://management.azure.com";

/// Refresh a cached token when it has less than this left
const EXPIRY_MARGIN_SECS: i64 = 300;

/// A cached access token
#[derive(Debug, Clone)]
pub struct TokenData {
    access_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenData {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now(),
            None => true,
        }
    }
}

/// Output of `az account get-access-token`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix seconds; older cli versions emit it as a string
    #[serde(rename = "expires_on")]
    expires_on: Option<serde_json::Value>,
}

pub enum AzureAuth {
    /// A bearer token supplied directly
    Token(String),
    /// Tokens issued by the locally signed-in Azure CLI
    AzureCli { cache: Mutex<Option<TokenData>> },
}

impl AzureAuth {
    pub fn token<S: Into<String>>(token: S) -> Self {
        AzureAuth::Token(token.into())
    }

    pub fn azure_cli() -> Self {
        AzureAuth::AzureCli {
            cache: Mutex::new(None),
        }
    }

    /// The `Authorization` header value for the next request
    pub async fn bearer(&self) -> Result<String, PlatformError> {
        match self {
            AzureAuth::Token(token) => Ok(format!("Bearer {}", token)),
            AzureAuth::AzureCli { cache } => {
                let mut cache = cache.lock().await;
                if let Some(token) = cache.as_ref().filter(|t| t.is_fresh()) {
                    return Ok(format!("Bearer {}", token.access_token));
                }
                let token = fetch_cli_token().await?;
                let header = format!("Bearer {}", token.access_token);
                *cache = Some(token);
                Ok(header)
            }
        }
    }
}

async fn fetch_cli_token() -> Result<TokenData, PlatformError> {
    tracing::debug!("requesting access token from the azure cli");
    let output = Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            AZURE_RESOURCE,
            "--output",
            "json",
        ])
        .output()
        .await
        .map_err(|e| PlatformError::Credential(format!("failed to run az: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlatformError::Credential(format!(
            "az account get-access-token failed: {}",
            stderr.trim()
        )));
    }

    parse_cli_token(&output.stdout)
}

fn parse_cli_token(stdout: &[u8]) -> Result<TokenData, PlatformError> {
    let token: CliToken = serde_json::from_slice(stdout)
        .map_err(|e| PlatformError::Credential(format!("unexpected az output: {}", e)))?;

    Ok(TokenData {
        access_token: token.access_token,
        expires_at: token
            .expires_on
            .and_then(|v| v.as_i64().or_else(|| v.as_str()?.parse().ok()))
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_token() {
        let stdout = br#"{
            "accessToken": "eyJ0eXAi",
            "expiresOn": "2030-01-01 00:00:00.000000",
            "expires_on": 1893456000,
            "subscription": "1234",
            "tokenType": "Bearer"
        }"#;

        let token = parse_cli_token(stdout).unwrap();
        assert_eq!(token.access_token, "eyJ0eXAi");
        assert_eq!(token.expires_at.unwrap().timestamp(), 1893456000);
        assert!(token.is_fresh());
    }

    #[test]
    fn test_expired_token_is_not_fresh() {
        let token = TokenData {
            access_token: "old".to_string(),
            expires_at: Some(Utc::now() + Duration::seconds(60)),
        };
        assert!(!token.is_fresh());
    }

    #[test]
    fn test_parse_garbage_is_credential_error() {
        assert!(matches!(
            parse_cli_token(b"Please run 'az login'"),
            Err(PlatformError::Credential(_))
        ));
    }

    #[tokio::test]
    async fn test_static_token_bearer() {
        let auth = AzureAuth::token("abc");
        assert_eq!(auth.bearer().await.unwrap(), "Bearer abc");
    }
}
