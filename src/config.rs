// src/config.rs

// Runtime settings and the credentials store.
//
// Settings come from environment variables with defaults. Credentials are
// kept in a JSON file mapping a reference name to a login, so requests and
// plans only ever carry the reference.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LLM_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_LLM_MODEL: &str = "llama3";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub secrets_file: PathBuf,
    pub llm_endpoint: String,
    pub llm_model: String,
    pub ssh_bin: String,
    pub sshpass_bin: String,
    pub sqlplus_bin: String,
    pub mongosh_bin: String,
    pub probe_timeout: Duration,
    /// ssh `ConnectTimeout` and mongosh server selection bound.
    pub connect_timeout_secs: u64,
    /// Wall-clock limit for any one external command.
    pub command_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secrets_file: PathBuf::from("secrets.json"),
            llm_endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            ssh_bin: "ssh".to_string(),
            sshpass_bin: "sshpass".to_string(),
            sqlplus_bin: "sqlplus".to_string(),
            mongosh_bin: "mongosh".to_string(),
            probe_timeout: Duration::from_millis(1000),
            connect_timeout_secs: 10,
            command_timeout: Duration::from_secs(60),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup; unset keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(v) = lookup("SECRETS_FILE") {
            settings.secrets_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("LLM_ENDPOINT") {
            settings.llm_endpoint = v;
        }
        if let Some(v) = lookup("LLM_MODEL") {
            settings.llm_model = v;
        }
        if let Some(v) = lookup("SSH_BIN") {
            settings.ssh_bin = v;
        }
        if let Some(v) = lookup("SSHPASS_BIN") {
            settings.sshpass_bin = v;
        }
        if let Some(v) = lookup("SQLPLUS_BIN") {
            settings.sqlplus_bin = v;
        }
        if let Some(v) = lookup("MONGOSH_BIN") {
            settings.mongosh_bin = v;
        }
        if let Some(v) = lookup("PROBE_TIMEOUT_MS") {
            let ms = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PROBE_TIMEOUT_MS",
                value: v.clone(),
            })?;
            settings.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("CONNECT_TIMEOUT_SECS") {
            settings.connect_timeout_secs = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CONNECT_TIMEOUT_SECS",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("COMMAND_TIMEOUT_SECS") {
            let secs = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "COMMAND_TIMEOUT_SECS",
                value: v.clone(),
            })?;
            settings.command_timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }
}

/// One login referenced from a request's `credentials` field.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("key_path", &self.key_path)
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secrets {
    entries: BTreeMap<String, Credential>,
}

impl Secrets {
    /// Loads the secrets file. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No secrets file found");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let secrets: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            keys = ?secrets.entries.keys().collect::<Vec<_>>(),
            "Loaded secrets file"
        );
        Ok(secrets)
    }

    pub fn insert(mut self, reference: &str, credential: Credential) -> Self {
        self.entries.insert(reference.to_string(), credential);
        self
    }

    pub fn get(&self, reference: &str) -> Option<&Credential> {
        self.entries.get(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn lookup_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LLM_MODEL", "mistral"),
            ("PROBE_TIMEOUT_MS", "250"),
            ("COMMAND_TIMEOUT_SECS", "120"),
        ]);
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.llm_model, "mistral");
        assert_eq!(settings.probe_timeout, Duration::from_millis(250));
        assert_eq!(settings.command_timeout, Duration::from_secs(120));
        assert_eq!(settings.connect_timeout_secs, 10);
        assert_eq!(settings.ssh_bin, "ssh");
        assert_eq!(settings.llm_endpoint, DEFAULT_LLM_ENDPOINT);
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let err = Settings::from_lookup(|k| (k == "PROBE_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "PROBE_TIMEOUT_MS",
                ..
            }
        ));
    }

    #[test]
    fn secrets_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"vm-root": {{"username": "root", "key_path": "/keys/id_ed25519"}}, "mongo-admin": {{"username": "admin", "password": "pw"}}}}"#
        )
        .unwrap();

        let secrets = Secrets::load(file.path()).unwrap();
        let vm = secrets.get("vm-root").unwrap();
        assert_eq!(vm.username.as_deref(), Some("root"));
        assert!(vm.password.is_none());
        assert_eq!(secrets.get("mongo-admin").unwrap().password.as_deref(), Some("pw"));
        assert!(secrets.get("other").is_none());
    }

    #[test]
    fn missing_secrets_file_is_empty() {
        let secrets = Secrets::load(Path::new("/nonexistent/secrets.json")).unwrap();
        assert_eq!(secrets, Secrets::default());
    }

    #[test]
    fn credential_debug_hides_password() {
        let credential = Credential {
            username: Some("admin".into()),
            password: Some("hunter2".into()),
            key_path: None,
        };
        assert!(!format!("{credential:?}").contains("hunter2"));
    }
}
