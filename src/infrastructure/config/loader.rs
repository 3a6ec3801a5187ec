use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::services::config::{Config, ConfigError};

/// Loads a layered `Config`: programmatic defaults, then an optional TOML
/// file, then `GEPA_`-prefixed environment variables (`__`-nested).
///
/// Precedence (lowest to highest):
/// 1. Programmatic defaults (`Config::default()`)
/// 2. The TOML file at `path`, or `./gepa.toml` if `path` is `None` and
///    that file exists
/// 3. `GEPA_`-prefixed environment variables
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: Option<&std::path::Path>) -> Result<Config, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        let default_path = std::path::Path::new("gepa.toml");
        let file_path = path.unwrap_or(default_path);
        if file_path.exists() {
            figment = figment.merge(Toml::file(file_path));
        }

        figment = figment.merge(Env::prefixed("GEPA_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_when_no_file_present() {
        let config = ConfigLoader::load(Some(std::path::Path::new(
            "/nonexistent/path/gepa.toml",
        )))
        .unwrap();
        assert_eq!(config.minibatch_size, 4);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gepa.toml");
        std::fs::write(&path, "minibatch_size = 9\n").unwrap();
        let config = ConfigLoader::load(Some(&path)).unwrap();
        assert_eq!(config.minibatch_size, 9);
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gepa.toml");
        std::fs::write(&path, "minibatch_size = 9\n").unwrap();
        std::env::set_var("GEPA_MINIBATCH_SIZE", "12");
        let config = ConfigLoader::load(Some(&path)).unwrap();
        std::env::remove_var("GEPA_MINIBATCH_SIZE");
        assert_eq!(config.minibatch_size, 12);
    }
}
