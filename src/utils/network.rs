use crate::config::Settings;
use crate::error::{AzfilesError, Result};
use reqwest::Client;
use std::time::Duration;

/// Configuration for the HTTP client.
///
/// No request timeout is set: a range write or download runs as long as
/// the transfer takes. Only the connect phase can be bounded.
pub struct NetworkConfig {
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            user_agent: format!("azfiles/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&Settings> for NetworkConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout,
            ..Self::default()
        }
    }
}

/// Create a configured HTTP client
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    let mut builder = Client::builder().user_agent(&config.user_agent);
    if let Some(timeout) = config.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| AzfilesError::network(format!("Failed to create HTTP client: {}", e)))
}
