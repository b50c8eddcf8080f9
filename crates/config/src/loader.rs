use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    schema::BridgeConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "linecord.toml",
    "linecord.yaml",
    "linecord.yml",
    "linecord.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./linecord.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/linecord/linecord.{toml,yaml,yml,json}` (user-global)
///
/// Returns `BridgeConfig::default()` if no config file is found.
pub fn discover_and_load() -> BridgeConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    BridgeConfig::default()
}

/// Returns the user-global config directory (`~/.config/linecord/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "linecord").map(|d| d.config_dir().to_path_buf())
}

fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

fn parse_config(raw: &str, path: &Path) -> Result<BridgeConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.to_string(),
        }),
    }
}

/// Apply the deployment environment variables on top of file config.
///
/// Recognised: `DISCORD_TOKEN`, `DISCORD_CHANNEL_ID`,
/// `DISCORD_FANOUT_CHANNEL_IDS` (comma separated), `LINE_CHANNEL_ACCESS_TOKEN`,
/// `LINE_CHANNEL_SECRET`, `PORT`.
pub fn apply_env_overrides(config: &mut BridgeConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut BridgeConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("DISCORD_TOKEN") {
        config.discord.token = Secret::new(token);
    }
    if let Some(channel_id) = get("DISCORD_CHANNEL_ID") {
        config.discord.channel_id = channel_id.trim().to_string();
    }
    if let Some(list) = get("DISCORD_FANOUT_CHANNEL_IDS") {
        config.discord.fanout_channel_ids = list
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(token) = get("LINE_CHANNEL_ACCESS_TOKEN") {
        config.line.channel_access_token = Secret::new(token);
    }
    if let Some(secret) = get("LINE_CHANNEL_SECRET") {
        config.line.channel_secret = Secret::new(secret);
    }
    if let Some(port) = get("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(port = %port, error = %e, "ignoring invalid PORT"),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {secrecy::ExposeSecret, std::collections::HashMap};

    use super::*;

    #[test]
    fn loads_toml_with_env_placeholders_left_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linecord.toml");
        std::fs::write(
            &path,
            "[discord]\nchannel_id = \"42\"\ntoken = \"${LINECORD_TEST_UNSET_VAR}\"\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.discord.channel_id, "42");
        assert_eq!(
            cfg.discord.token.expose_secret(),
            "${LINECORD_TEST_UNSET_VAR}"
        );
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("linecord.yaml");
        std::fs::write(&yaml, "relay:\n  pacing_ms: 350\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().relay.pacing_ms, 350);

        let json = dir.path().join("linecord.json");
        std::fs::write(&json, r#"{"server": {"port": 8088}}"#).unwrap();
        assert_eq!(load_config(&json).unwrap().server.port, 8088);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("linecord.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(Error::UnsupportedFormat { extension }) if extension == "ini"
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_config(Path::new("/nonexistent/linecord.toml")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DISCORD_TOKEN", "discord-token"),
            ("DISCORD_CHANNEL_ID", " 1001 "),
            ("DISCORD_FANOUT_CHANNEL_IDS", "2002, 3003,,"),
            ("LINE_CHANNEL_ACCESS_TOKEN", "line-token"),
            ("LINE_CHANNEL_SECRET", "line-secret"),
            ("PORT", "8080"),
        ]);
        let mut cfg = BridgeConfig::default();
        apply_env_overrides_with(&mut cfg, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(cfg.discord.token.expose_secret(), "discord-token");
        assert_eq!(cfg.discord.channel_id, "1001");
        assert_eq!(cfg.discord.fanout_channel_ids, vec!["2002", "3003"]);
        assert_eq!(cfg.line.channel_access_token.expose_secret(), "line-token");
        assert_eq!(cfg.line.channel_secret.expose_secret(), "line-secret");
        assert_eq!(cfg.server.port, 8080);
    }

    #[test]
    fn invalid_port_is_ignored() {
        let mut cfg = BridgeConfig::default();
        apply_env_overrides_with(&mut cfg, |name| {
            (name == "PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(cfg.server.port, 3000);
    }
}
