//! Connection settings for the generated `ImageAnnotator` client

use crate::annotator::ImageAnnotator;
use crate::error::Result;
use crate::rpc::image_annotator_client::ImageAnnotatorClient;
use ::config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::info;

/// Public Cloud Vision endpoint
pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com";

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "vision.toml";

/// Prefix of the environment variables overriding the config file
pub const ENV_PREFIX: &str = "VISION";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: Option<u64>,
    pub keepalive_ms: u64,
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: None,
            keepalive_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults, then the TOML file (if present), then `VISION_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ClientConfig::default();
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .set_default("endpoint", defaults.endpoint)?
            .set_default("connect_timeout_ms", defaults.connect_timeout_ms as i64)?
            .set_default("keepalive_ms", defaults.keepalive_ms as i64)?
            .set_default("log_level", defaults.log_level)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// The endpoint as tonic expects it: `grpc://` becomes `http://`
    pub fn endpoint_uri(&self) -> String {
        match self.endpoint.strip_prefix("grpc://") {
            Some(addr) => format!("http://{addr}"),
            None => self.endpoint.clone(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    fn endpoint(&self) -> Result<Endpoint> {
        let uri = self.endpoint_uri();
        let mut endpoint = Endpoint::from_shared(uri.clone())?
            .connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .tcp_keepalive(Some(Duration::from_millis(self.keepalive_ms)));
        if let Some(timeout) = self.request_timeout() {
            endpoint = endpoint.timeout(timeout);
        }
        if uri.starts_with("https://") {
            endpoint = endpoint.tls_config(ClientTlsConfig::new())?;
        }
        Ok(endpoint)
    }
}

/// Open a channel to the configured endpoint
pub async fn connect(
    config: &ClientConfig,
) -> Result<ImageAnnotator<ImageAnnotatorClient<Channel>>> {
    let channel = config.endpoint()?.connect().await?;
    info!("connected to {}", config.endpoint_uri());
    Ok(ImageAnnotator::new(ImageAnnotatorClient::new(channel)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "endpoint = \"grpc://127.0.0.1:9000\"\nrequest_timeout_ms = 2500\nlog_level = \"debug\""
        )
        .unwrap();

        let config = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.endpoint_uri(), "http://127.0.0.1:9000");
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.keepalive_ms, 1000);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let res = ClientConfig::load(Some(Path::new("/no/such/vision.toml")));
        assert!(matches!(res, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_endpoint_builds() {
        let config = ClientConfig {
            endpoint: "http://[::1]:50051".into(),
            ..Default::default()
        };
        assert!(config.endpoint().is_ok());

        let config = ClientConfig {
            endpoint: "not a uri".into(),
            ..Default::default()
        };
        assert!(config.endpoint().is_err());
    }
}
