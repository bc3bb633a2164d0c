//! Shared AWS profile files.
//!
//! The last step of settings resolution: the profile named by
//! `AWS_PROFILE` (default `default`) in `~/.aws/credentials` and
//! `~/.aws/config`. `AWS_SHARED_CREDENTIALS_FILE` and `AWS_CONFIG_FILE`
//! override the locations. Only static keys and the region are read;
//! SSO, `credential_process` and role chaining are not supported.

use std::collections::HashMap;
use std::path::PathBuf;

use super::signing::Credentials;

const DEFAULT_PROFILE: &str = "default";

/// Region and credentials found in the shared profile files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedProfile {
    pub region: Option<String>,
    pub credentials: Option<Credentials>,
}

impl SharedProfile {
    /// Read the active profile. Missing or unreadable files give an empty profile.
    pub fn load(env: impl Fn(&str) -> Option<String>) -> Self {
        let profile = env("AWS_PROFILE").unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let aws_dir = dirs::home_dir().map(|home| home.join(".aws"));

        let read = |var: &str, name: &str| {
            let path = env(var)
                .map(PathBuf::from)
                .or_else(|| aws_dir.as_ref().map(|dir| dir.join(name)));
            match path {
                Some(path) => std::fs::read_to_string(&path).unwrap_or_else(|e| {
                    tracing::trace!("No shared AWS file at {}: {}", path.display(), e);
                    String::new()
                }),
                None => String::new(),
            }
        };

        Self::parse(
            &read("AWS_SHARED_CREDENTIALS_FILE", "credentials"),
            &read("AWS_CONFIG_FILE", "config"),
            &profile,
        )
    }

    /// Pick `profile` out of the contents of the two files.
    ///
    /// The credentials file names sections `[name]`; the config file uses
    /// `[profile name]` except for `[default]`.
    pub fn parse(credentials_file: &str, config_file: &str, profile: &str) -> Self {
        let keys = section(credentials_file, profile);
        let config_section = if profile == DEFAULT_PROFILE {
            DEFAULT_PROFILE.to_string()
        } else {
            format!("profile {}", profile)
        };
        let settings = section(config_file, &config_section);

        let credentials = match (keys.get("aws_access_key_id"), keys.get("aws_secret_access_key")) {
            (Some(key), Some(secret)) => Some(Credentials {
                access_key_id: key.clone(),
                secret_access_key: secret.clone(),
                session_token: keys.get("aws_session_token").cloned(),
            }),
            _ => None,
        };

        Self {
            region: settings.get("region").cloned(),
            credentials,
        }
    }
}

/// Non-empty `key = value` pairs of one INI section, keys lowercased.
fn section(contents: &str, name: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    let mut inside = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            inside = header.trim() == name;
            continue;
        }
        if inside
            && let Some((key, value)) = line.split_once('=')
            && !value.trim().is_empty()
        {
            values.insert(key.trim().to_lowercase(), value.trim().to_string());
        }
    }

    values
}
