use url::Url;

use super::base::PlatformError;

/// Location of an Azure AI project, parsed from its connection string.
///
/// The connection string has the form `<host>;<subscription id>;<resource group>;<project name>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub endpoint: Url,
    pub subscription_id: String,
    pub resource_group: String,
    pub project_name: String,
    pub api_version: String,
}

impl ProjectConfig {
    pub fn from_connection_string(
        connection_string: &str,
        api_version: &str,
    ) -> Result<Self, PlatformError> {
        let parts: Vec<&str> = connection_string.trim().split(';').map(str::trim).collect();
        let [host, subscription_id, resource_group, project_name] = parts.as_slice() else {
            return Err(PlatformError::InvalidConnectionString(format!(
                "expected 4 ';'-separated parts, found {}",
                parts.len()
            )));
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(PlatformError::InvalidConnectionString(
                "empty part".to_string(),
            ));
        }

        // Hosts are bare names in real connection strings; a scheme is accepted for local endpoints
        let endpoint = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| PlatformError::InvalidConnectionString(e.to_string()))?;

        Ok(Self {
            endpoint,
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            project_name: project_name.to_string(),
            api_version: api_version.to_string(),
        })
    }

    /// Base url every agents api path hangs off
    pub fn base_url(&self) -> String {
        format!(
            "{}/agents/v1.0/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            self.subscription_id,
            self.resource_group,
            self.project_name
        )
    }
}
