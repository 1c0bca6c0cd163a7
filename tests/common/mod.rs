// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides temp template files and mocked Consul KV endpoints

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use mockito::{Matcher, Mock, ServerGuard};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use ctmpl::kv::ConsulConfig;

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_template(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents).expect("Failed to write template");
        path
    }
}

/// JSON body Consul returns for the given entries
pub fn kv_body(entries: &[(&str, &str)]) -> String {
    let entries: Vec<serde_json::Value> = entries
        .iter()
        .enumerate()
        .map(|(i, (key, value))| {
            serde_json::json!({
                "LockIndex": 0,
                "Key": key,
                "Flags": 0,
                "Value": BASE64.encode(value),
                "CreateIndex": 100 + i,
                "ModifyIndex": 200 + i,
            })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

/// Mock a point read of `key` returning `value`
pub fn mock_key(server: &mut ServerGuard, key: &str, value: &str) -> Mock {
    server
        .mock("GET", format!("/v1/kv/{}", key).as_str())
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(kv_body(&[(key, value)]))
        .create()
}

/// Mock a point read of `key` that Consul does not have
pub fn mock_missing_key(server: &mut ServerGuard, key: &str) -> Mock {
    server
        .mock("GET", format!("/v1/kv/{}", key).as_str())
        .match_query(Matcher::Any)
        .with_status(404)
        .create()
}

/// Mock a recursive read under `prefix`
pub fn mock_prefix(server: &mut ServerGuard, prefix: &str, entries: &[(&str, &str)]) -> Mock {
    let mock = server
        .mock("GET", format!("/v1/kv/{}", prefix).as_str())
        .match_query(Matcher::UrlEncoded("recurse".into(), "".into()));

    if entries.is_empty() {
        mock.with_status(404).create()
    } else {
        mock.with_status(200)
            .with_header("content-type", "application/json")
            .with_body(kv_body(entries))
            .create()
    }
}

/// Consul settings pointing at a mock server
pub fn consul_config(server: &ServerGuard) -> ConsulConfig {
    ConsulConfig {
        address: server.url(),
        ..Default::default()
    }
}
