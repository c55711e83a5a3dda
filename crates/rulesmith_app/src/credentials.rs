//! Credential resolution for the tool service.
//!
//! Precedence: command-line flags, then `LC_OID`/`LC_API_KEY`/`LC_UID`
//! environment variables, then the `~/.limacharlie` file. The raw key is
//! never printed; callers display it through `mask_key`.

use std::env;
use std::fs;

use rulesmith_core::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub oid: String,
    pub api_key: String,
    pub uid: Option<String>,
    /// Where the credentials came from, for operator feedback.
    pub source: &'static str,
}

pub fn resolve(
    oid: Option<String>,
    api_key: Option<String>,
    uid: Option<String>,
) -> Result<ResolvedCredentials, ConfigError> {
    if let (Some(oid), Some(api_key)) = (oid.clone(), api_key.clone()) {
        return Ok(ResolvedCredentials {
            oid,
            api_key,
            uid,
            source: "command line",
        });
    }

    let env_oid = env::var("LC_OID").ok().filter(|v| !v.is_empty());
    let env_key = env::var("LC_API_KEY").ok().filter(|v| !v.is_empty());
    if let (Some(env_oid), Some(env_key)) = (env_oid, env_key) {
        return Ok(ResolvedCredentials {
            oid: oid.unwrap_or(env_oid),
            api_key: api_key.unwrap_or(env_key),
            uid: uid.or_else(|| env::var("LC_UID").ok().filter(|v| !v.is_empty())),
            source: "environment variables",
        });
    }

    if let Some(file) = read_credentials_file() {
        let (file_oid, file_key, file_uid) = parse_credentials_file(&file);
        if let (Some(file_oid), Some(file_key)) = (file_oid, file_key) {
            return Ok(ResolvedCredentials {
                oid: oid.unwrap_or(file_oid),
                api_key: api_key.unwrap_or(file_key),
                uid: uid.or(file_uid),
                source: "~/.limacharlie",
            });
        }
    }

    if oid.is_none() {
        return Err(ConfigError::MissingParameter { name: "oid" });
    }
    Err(ConfigError::MissingParameter { name: "api key" })
}

fn read_credentials_file() -> Option<String> {
    let path = dirs::home_dir()?.join(".limacharlie");
    fs::read_to_string(path).ok()
}

/// Pull `oid`, `api_key` and `uid` out of the top-level `key: value` lines
/// of the credentials file.
fn parse_credentials_file(content: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut oid = None;
    let mut api_key = None;
    let mut uid = None;
    for line in content.lines() {
        // Indented lines belong to named environments, not the defaults.
        if line.starts_with([' ', '\t']) {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "oid" => oid = Some(value.to_string()),
            "api_key" => api_key = Some(value.to_string()),
            "uid" => uid = Some(value.to_string()),
            _ => {}
        }
    }
    (oid, api_key, uid)
}
