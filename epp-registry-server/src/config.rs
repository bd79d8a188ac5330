//! Server configuration: a TOML file with env-var override for the path.

use std::path::Path;

use serde::Deserialize;

/// Configuration of the TCP frontend.
///
/// Every field has a sensible default so the server starts with no config
/// file at all (useful for tests and local runs).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address, e.g. `0.0.0.0:700`.
    pub listen_addr: String,
    /// `<svID>` advertised in the greeting and used as the server trid
    /// prefix.
    pub server_id: String,
    /// TLDs this registry manages.
    pub tlds: Vec<String>,
    /// Registrar ids allowed to log in.
    pub registrars: Vec<String>,
    /// Upper bound on one framed EPP document.
    pub max_frame_bytes: usize,
    /// How often the background worker drains the task queues, in
    /// milliseconds.
    pub worker_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7000".to_string(),
            server_id: "epp.registry.test".to_string(),
            tlds: vec!["tld".to_string()],
            registrars: vec!["TheRegistrar".to_string(), "NewRegistrar".to_string()],
            max_frame_bytes: 128 * 1024,
            worker_interval_ms: 500,
        }
    }
}

impl ServerConfig {
    /// Loads from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Loads from the path in `EPP_REGISTRY_CONFIG`, or defaults when the
    /// variable is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var_os("EPP_REGISTRY_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = ServerConfig::default();
        assert!(!config.tlds.is_empty());
        assert!(!config.registrars.is_empty());
        assert!(config.max_frame_bytes > 4096);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "listen_addr = \"0.0.0.0:700\"\ntlds = [\"tld\", \"example\"]"
        )
        .unwrap();
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:700");
        assert_eq!(config.tlds, vec!["tld", "example"]);
        // Untouched fields keep their defaults.
        assert_eq!(config.server_id, "epp.registry.test");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_adr = \"typo\"").unwrap();
        assert!(ServerConfig::from_file(file.path()).is_err());
    }
}
