use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use kindred_api::media::CloudinaryCredentials;

/// Placeholder signing keys that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "super secret key",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub token_key: String,
    pub static_dir: PathBuf,
    pub seed_file: Option<PathBuf>,
    pub cloudinary: Option<CloudinaryCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let token_key = var("KINDRED_TOKEN_KEY").unwrap_or_default();
        if token_key.is_empty() || PLACEHOLDER_SECRETS.contains(&token_key.as_str()) {
            bail!("KINDRED_TOKEN_KEY is unset or still a placeholder; set it in your .env file");
        }

        let port = match var("KINDRED_PORT") {
            Some(port) => port.parse().context("KINDRED_PORT is not a valid port")?,
            None => 5000,
        };

        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryCredentials {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            host: var("KINDRED_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("KINDRED_DB_PATH").unwrap_or_else(|| "kindred.db".into()).into(),
            token_key,
            static_dir: var("KINDRED_STATIC_DIR").unwrap_or_else(|| "wwwroot".into()).into(),
            seed_file: var("KINDRED_SEED_FILE").map(PathBuf::from),
            cloudinary,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("KINDRED_TOKEN_KEY", "a real key")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.db_path, PathBuf::from("kindred.db"));
        assert_eq!(config.static_dir, PathBuf::from("wwwroot"));
        assert!(config.seed_file.is_none());
        assert!(config.cloudinary.is_none());
    }

    #[test]
    fn token_key_is_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("KINDRED_TOKEN_KEY", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn media_credentials_need_all_three() {
        let partial = config(&[
            ("KINDRED_TOKEN_KEY", "a real key"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
        ])
        .unwrap();
        assert!(partial.cloudinary.is_none());

        let full = config(&[
            ("KINDRED_TOKEN_KEY", "a real key"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "123"),
            ("CLOUDINARY_API_SECRET", "shh"),
            ("KINDRED_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(full.cloudinary.unwrap().cloud_name, "demo");
        assert_eq!(full.port, 8080);
    }
}
