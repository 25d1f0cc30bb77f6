use std::{collections::HashMap, path::PathBuf};

use directories::ProjectDirs;
use uuid::Uuid;

use crate::{
    catalog::{CatalogSource, DuplicatePolicy},
    error::ConfigError,
    store::RemoteConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub catalog: CatalogSource,
    /// Base that card image paths (`/data/en/images/<id>.png`) are resolved against.
    pub asset_root: String,
    pub duplicate_policy: DuplicatePolicy,
    pub remote: Option<RemoteConfig>,
}

impl Config {
    /// Reads `OPTCG_*` variables, after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("OPTCG_"))
            .collect();
        Self::from_vars(&vars)
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let data_dir = match get("OPTCG_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "optcg-deck-builder")
                .ok_or(ConfigError::NoProjectDirs)?
                .data_dir()
                .to_path_buf(),
        };

        let catalog = match get("OPTCG_CATALOG") {
            Some(raw) => CatalogSource::parse(&raw),
            None => CatalogSource::File(data_dir.join("data").join("en").join("cards.json")),
        };

        let asset_root = get("OPTCG_ASSET_ROOT")
            .unwrap_or_else(|| data_dir.display().to_string())
            .trim_end_matches('/')
            .to_owned();

        let duplicate_policy = match get("OPTCG_DUPLICATE_IDS") {
            Some(raw) => DuplicatePolicy::parse(&raw).ok_or(ConfigError::InvalidValue {
                var: "OPTCG_DUPLICATE_IDS",
                value: raw,
            })?,
            None => DuplicatePolicy::default(),
        };

        let user_id = match get("OPTCG_USER_ID") {
            Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| ConfigError::InvalidValue {
                var: "OPTCG_USER_ID",
                value: raw,
            })?),
            None => None,
        };

        let remote = match (get("OPTCG_SUPABASE_URL"), get("OPTCG_SUPABASE_ANON_KEY")) {
            (Some(base_url), Some(anon_key)) if user_id.is_some() => Some(RemoteConfig {
                base_url,
                anon_key,
                access_token: get("OPTCG_ACCESS_TOKEN"),
                user_id,
            }),
            _ => None,
        };

        Ok(Self {
            data_dir,
            catalog,
            asset_root,
            duplicate_policy,
            remote,
        })
    }

    /// Where to fetch the image for a card's `img_url`.
    pub fn image_location(&self, img_url: &str) -> String {
        if img_url.starts_with("http://") || img_url.starts_with("https://") {
            img_url.to_owned()
        } else {
            format!("{}/{}", self.asset_root, img_url.trim_start_matches('/'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_hang_off_the_data_dir() {
        let config = Config::from_vars(&vars(&[("OPTCG_DATA_DIR", "/tmp/optcg")])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/optcg"));
        assert_eq!(
            config.catalog,
            CatalogSource::File(PathBuf::from("/tmp/optcg/data/en/cards.json"))
        );
        assert_eq!(config.asset_root, "/tmp/optcg");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);
        assert!(config.remote.is_none());
    }

    #[test]
    fn remote_needs_url_key_and_user() {
        let user = Uuid::new_v4().to_string();
        let partial = vars(&[
            ("OPTCG_DATA_DIR", "/tmp/optcg"),
            ("OPTCG_SUPABASE_URL", "https://decks.example.com"),
            ("OPTCG_SUPABASE_ANON_KEY", "anon"),
        ]);
        assert!(Config::from_vars(&partial).unwrap().remote.is_none());

        let mut full = partial.clone();
        full.insert("OPTCG_USER_ID".to_string(), user.clone());
        let remote = Config::from_vars(&full).unwrap().remote.unwrap();
        assert_eq!(remote.user_id.map(|u| u.to_string()), Some(user));
        assert_eq!(remote.access_token, None);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = Config::from_vars(&vars(&[
            ("OPTCG_DATA_DIR", "/tmp/optcg"),
            ("OPTCG_DUPLICATE_IDS", "sometimes"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: "OPTCG_DUPLICATE_IDS",
                value: "sometimes".to_string()
            }
        );

        let err = Config::from_vars(&vars(&[
            ("OPTCG_DATA_DIR", "/tmp/optcg"),
            ("OPTCG_USER_ID", "not-a-uuid"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("OPTCG_USER_ID"));
    }

    #[test]
    fn image_location_resolves_relative_paths() {
        let config = Config::from_vars(&vars(&[
            ("OPTCG_DATA_DIR", "/tmp/optcg"),
            ("OPTCG_ASSET_ROOT", "https://cdn.example.com/"),
            ("OPTCG_CATALOG", "https://cdn.example.com/data/en/cards.json"),
        ]))
        .unwrap();
        assert_eq!(
            config.image_location("/data/en/images/OP01-001.png"),
            "https://cdn.example.com/data/en/images/OP01-001.png"
        );
        assert_eq!(
            config.image_location("https://elsewhere/img.png"),
            "https://elsewhere/img.png"
        );
        assert!(matches!(config.catalog, CatalogSource::Url(_)));
    }
}
