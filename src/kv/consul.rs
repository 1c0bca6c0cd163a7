// ABOUTME: Consul KV client speaking the agent HTTP API with a blocking reqwest client
// ABOUTME: Implements point reads and recursive prefix reads, decoding base64 values

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Certificate, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::config::ConsulConfig;
use super::error::{KvError, Result};
use super::store::{KvPair, KvStore};

pub const USER_AGENT: &str = concat!("ctmpl/", env!("CARGO_PKG_VERSION"));

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Entry as returned by `GET /v1/kv/<key>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConsulEntry {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

pub struct ConsulClient {
    http: Client,
    base: Url,
    token: Option<String>,
    basic_auth: Option<(String, Option<String>)>,
    datacenter: Option<String>,
    namespace: Option<String>,
    partition: Option<String>,
}

impl ConsulClient {
    /// Build a client from resolved connection settings.
    ///
    /// # Errors
    ///
    /// Returns `KvError::ClientInit` for an unusable address, an unreadable
    /// token file or CA bundle, or a TLS setup failure.
    pub fn new(config: &ConsulConfig) -> Result<Self> {
        let base = config.base_url()?;
        let token = config.resolve_token()?;

        let mut builder = Client::builder().user_agent(USER_AGENT);

        if config.tls_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ca_file) = &config.ca_file {
            let pem = std::fs::read(ca_file).map_err(|e| {
                KvError::ClientInit(format!("reading CA file {}: {}", ca_file.display(), e))
            })?;
            let certificate = Certificate::from_pem(&pem).map_err(|e| {
                KvError::ClientInit(format!("parsing CA file {}: {}", ca_file.display(), e))
            })?;
            builder = builder.add_root_certificate(certificate);
        }

        let http = builder
            .build()
            .map_err(|e| KvError::ClientInit(e.to_string()))?;

        debug!(
            "Consul client ready at {} (token: {})",
            base,
            if token.is_some() { "set" } else { "none" }
        );

        Ok(Self {
            http,
            base,
            token,
            basic_auth: config.basic_auth(),
            datacenter: config.datacenter.clone(),
            namespace: config.namespace.clone(),
            partition: config.partition.clone(),
        })
    }

    /// Client configured purely from `CONSUL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(&ConsulConfig::from_env())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn kv_url(&self, key: &str) -> Result<Url> {
        let key = key.strip_prefix('/').unwrap_or(key);
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| KvError::ClientInit(format!("{} cannot be used as a base URL", self.base)))?
            .pop_if_empty()
            .extend(["v1", "kv"])
            .extend(key.split('/'));
        Ok(url)
    }

    fn request(&self, url: Url) -> RequestBuilder {
        let mut request = self.http.get(url);

        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }
        if let Some((user, password)) = &self.basic_auth {
            request = request.basic_auth(user, password.as_ref());
        }

        let scoping = [
            ("dc", &self.datacenter),
            ("ns", &self.namespace),
            ("partition", &self.partition),
        ];
        for (name, value) in scoping {
            if let Some(value) = value {
                request = request.query(&[(name, value)]);
            }
        }

        request
    }

    /// One read against the KV endpoint. `None` means the agent answered 404.
    fn fetch(&self, key: &str, recurse: bool) -> Result<Option<Vec<ConsulEntry>>> {
        let mut request = self.request(self.kv_url(key)?);
        if recurse {
            request = request.query(&[("recurse", "")]);
        }

        let response = request.send().map_err(|e| KvError::Unavailable {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let entries = response
                    .json::<Vec<ConsulEntry>>()
                    .map_err(|e| KvError::Decode {
                        key: key.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(entries))
            }
            status => {
                let body = response.text().unwrap_or_default();
                Err(KvError::Unavailable {
                    key: key.to_string(),
                    reason: format!("unexpected response {}: {}", status, body.trim()),
                })
            }
        }
    }
}

fn decode_entry(entry: ConsulEntry) -> Result<KvPair> {
    let value = match entry.value {
        Some(encoded) => BASE64.decode(encoded.as_bytes()).map_err(|e| KvError::Decode {
            key: entry.key.clone(),
            reason: format!("value is not base64: {}", e),
        })?,
        None => Vec::new(),
    };
    Ok(KvPair::new(entry.key, value))
}

impl KvStore for ConsulClient {
    fn get(&self, key: &str) -> Result<Option<KvPair>> {
        match self.fetch(key, false)? {
            Some(entries) => entries.into_iter().next().map(decode_entry).transpose(),
            None => Ok(None),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<KvPair>> {
        match self.fetch(prefix, true)? {
            Some(entries) => entries.into_iter().map(decode_entry).collect(),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_at(address: &str) -> ConsulClient {
        let config = ConsulConfig {
            address: address.to_string(),
            ..Default::default()
        };
        ConsulClient::new(&config).unwrap()
    }

    #[test]
    fn test_kv_url_layout() {
        let client = client_at("127.0.0.1:8500");
        assert_eq!(
            client.kv_url("app/db/host").unwrap().as_str(),
            "http://127.0.0.1:8500/v1/kv/app/db/host"
        );
        assert_eq!(
            client.kv_url("/app/list/").unwrap().as_str(),
            "http://127.0.0.1:8500/v1/kv/app/list/"
        );
        assert_eq!(
            client.kv_url("").unwrap().as_str(),
            "http://127.0.0.1:8500/v1/kv/"
        );
    }

    #[test]
    fn test_kv_url_escapes_segments() {
        let client = client_at("127.0.0.1:8500");
        assert_eq!(
            client.kv_url("app/with space?").unwrap().as_str(),
            "http://127.0.0.1:8500/v1/kv/app/with%20space%3F"
        );
    }

    #[test]
    fn test_decode_entry() {
        let pair = decode_entry(ConsulEntry {
            key: "a".to_string(),
            value: Some(BASE64.encode("hello")),
        })
        .unwrap();
        assert_eq!(pair.value_string(), "hello");

        let folder = decode_entry(ConsulEntry {
            key: "dir/".to_string(),
            value: None,
        })
        .unwrap();
        assert!(folder.value.is_empty());

        assert!(matches!(
            decode_entry(ConsulEntry {
                key: "bad".to_string(),
                value: Some("!!!".to_string()),
            }),
            Err(KvError::Decode { .. })
        ));
    }

    #[test]
    fn test_bad_address_is_client_init_error() {
        let config = ConsulConfig {
            address: "ftp://consul:21".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ConsulClient::new(&config),
            Err(KvError::ClientInit(_))
        ));
    }
}
