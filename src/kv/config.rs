// ABOUTME: Consul connection settings resolved from config files and CONSUL_* variables
// ABOUTME: Mirrors the ambient defaults of the standard Consul client configuration

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use super::error::{KvError, Result};

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsulConfig {
    /// `host:port`, optionally with an `http://` or `https://` scheme
    pub address: String,
    pub scheme: String,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    /// Basic auth as `user[:password]`
    pub http_auth: Option<String>,
    pub datacenter: Option<String>,
    pub namespace: Option<String>,
    pub partition: Option<String>,
    pub ca_file: Option<PathBuf>,
    pub tls_skip_verify: bool,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            scheme: "http".to_string(),
            token: None,
            token_file: None,
            http_auth: None,
            datacenter: None,
            namespace: None,
            partition: None,
            ca_file: None,
            tls_skip_verify: false,
        }
    }
}

impl ConsulConfig {
    /// Default settings overlaid with the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.merge_env();
        config
    }

    /// Overlay `CONSUL_*` variables from the process environment.
    pub fn merge_env(&mut self) {
        self.merge_env_with(|name| std::env::var(name).ok());
    }

    /// Overlay `CONSUL_*` variables read through `lookup`.
    ///
    /// Empty values are ignored. Unparsable booleans are logged and skipped
    /// rather than failing the run.
    pub fn merge_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(address) = var("CONSUL_HTTP_ADDR") {
            self.address = address;
        }
        if let Some(token) = var("CONSUL_HTTP_TOKEN") {
            self.token = Some(token);
        }
        if let Some(token_file) = var("CONSUL_HTTP_TOKEN_FILE") {
            self.token_file = Some(PathBuf::from(token_file));
        }
        if let Some(auth) = var("CONSUL_HTTP_AUTH") {
            self.http_auth = Some(auth);
        }
        if let Some(ssl) = var("CONSUL_HTTP_SSL") {
            match parse_bool(&ssl) {
                Some(true) => self.scheme = "https".to_string(),
                Some(false) => {}
                None => warn!("Could not parse CONSUL_HTTP_SSL value {:?}", ssl),
            }
        }
        if let Some(verify) = var("CONSUL_HTTP_SSL_VERIFY") {
            match parse_bool(&verify) {
                Some(verify) => self.tls_skip_verify = !verify,
                None => warn!("Could not parse CONSUL_HTTP_SSL_VERIFY value {:?}", verify),
            }
        }
        if let Some(ca_file) = var("CONSUL_CACERT") {
            self.ca_file = Some(PathBuf::from(ca_file));
        }
        if let Some(namespace) = var("CONSUL_NAMESPACE") {
            self.namespace = Some(namespace);
        }
        if let Some(partition) = var("CONSUL_PARTITION") {
            self.partition = Some(partition);
        }
    }

    /// Base URL of the agent, e.g. `http://127.0.0.1:8500/`.
    pub fn base_url(&self) -> Result<Url> {
        let raw = match self.address.split_once("://") {
            Some(("unix", _)) => {
                return Err(KvError::ClientInit(format!(
                    "unix socket addresses are not supported: {}",
                    self.address
                )))
            }
            Some(("http", _)) | Some(("https", _)) => self.address.clone(),
            Some((scheme, _)) => {
                return Err(KvError::ClientInit(format!(
                    "unsupported scheme {:?} in address {}",
                    scheme, self.address
                )))
            }
            None => format!("{}://{}", self.scheme, self.address),
        };

        Url::parse(&raw)
            .map_err(|e| KvError::ClientInit(format!("invalid address {}: {}", self.address, e)))
    }

    /// ACL token, preferring the inline token over the token file.
    pub fn resolve_token(&self) -> Result<Option<String>> {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Some(token.clone()));
        }

        match &self.token_file {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    KvError::ClientInit(format!(
                        "reading token file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            None => Ok(None),
        }
    }

    /// Basic auth credentials split into user and optional password.
    pub fn basic_auth(&self) -> Option<(String, Option<String>)> {
        self.http_auth.as_ref().map(|auth| match auth.split_once(':') {
            Some((user, password)) => (user.to_string(), Some(password.to_string())),
            None => (auth.clone(), None),
        })
    }
}

/// Boolean parsing with the same spellings Go's `strconv.ParseBool` accepts.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
