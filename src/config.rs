use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 6] = ["pdf", "doc", "docx", "jpg", "jpeg", "png"];

#[derive(Clone, Debug, PartialEq)]
pub struct PortalConfig {
    pub db_path: PathBuf,
    pub max_attachment_bytes: u64,
    pub allowed_extensions: Vec<String>, // lowercase, no leading dot
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("leave.db"),
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl PortalConfig {
    /// Reads `LEAVE_DB_PATH`, `LEAVE_MAX_ATTACHMENT_BYTES` and
    /// `LEAVE_ALLOWED_EXTENSIONS`, falling back to defaults for unset keys.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("LEAVE_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(bytes) = lookup("LEAVE_MAX_ATTACHMENT_BYTES") {
            config.max_attachment_bytes = bytes
                .trim()
                .parse()
                .with_context(|| format!("LEAVE_MAX_ATTACHMENT_BYTES is not a number: {bytes}"))?;
        }
        if let Some(list) = lookup("LEAVE_ALLOWED_EXTENSIONS") {
            let extensions: Vec<String> = list
                .split(',')
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect();
            if extensions.is_empty() {
                anyhow::bail!("LEAVE_ALLOWED_EXTENSIONS must name at least one extension");
            }
            config.allowed_extensions = extensions;
        }

        Ok(config)
    }

    pub fn open_db(&self) -> anyhow::Result<Arc<sled::Db>> {
        let db = sled::open(&self.db_path)
            .with_context(|| format!("failed to open database at {}", self.db_path.display()))?;
        Ok(Arc::new(db))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = PortalConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PortalConfig::default());
        assert_eq!(config.max_attachment_bytes, 5_242_880);
    }

    #[test]
    fn overrides_are_normalised() {
        let config = PortalConfig::from_lookup(lookup(&[
            ("LEAVE_MAX_ATTACHMENT_BYTES", "1024"),
            ("LEAVE_ALLOWED_EXTENSIONS", ".PDF, png ,"),
        ]))
        .unwrap();

        assert_eq!(config.max_attachment_bytes, 1024);
        assert_eq!(config.allowed_extensions, vec!["pdf", "png"]);
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(
            PortalConfig::from_lookup(lookup(&[("LEAVE_MAX_ATTACHMENT_BYTES", "lots")])).is_err()
        );
        assert!(PortalConfig::from_lookup(lookup(&[("LEAVE_ALLOWED_EXTENSIONS", " , ")])).is_err());
    }
}
