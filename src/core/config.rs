use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::api::DEFAULT_BASE_URL;

pub const BASE_URL_ENV: &str = "JERRY_BASE_URL";

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend root, e.g. "http://localhost:5000"
    pub base_url: Option<String>,
    /// Overall transport timeout for each request; unset means no deadline
    pub request_timeout_secs: Option<u64>,
    /// Store the login token in the system keyring (default: on)
    pub keyring: Option<bool>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn Error>> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &Path) -> Result<Config, Box<dyn Error>> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Write through a temp file in the same directory so a crash never
    /// leaves a truncated config behind.
    pub fn save_to_path(&self, config_path: &Path) -> Result<(), Box<dyn Error>> {
        let parent = config_path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let contents = toml::to_string_pretty(self)?;
        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(contents.as_bytes())?;
        temp_file.flush()?;
        temp_file.persist(config_path)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        let proj_dirs = ProjectDirs::from("dev", "jerry", "jerry")
            .ok_or("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Command-line flag, then environment, then config file, then default.
    pub fn resolve_base_url(&self, flag: Option<&str>, env: Option<&str>) -> String {
        [flag, env, self.base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn keyring_enabled(&self) -> bool {
        self.keyring.unwrap_or(true)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "base-url" => {
                let value = value.trim();
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    return Err(format!("base-url must start with http:// or https://: {value}").into());
                }
                self.base_url = Some(value.to_string());
            }
            "request-timeout" => {
                let secs = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| format!("request-timeout must be a whole number of seconds: {value}"))?;
                self.request_timeout_secs = Some(secs);
            }
            "keyring" => {
                self.keyring = Some(parse_toggle(value)?);
            }
            _ => return Err(format!("Unknown config key: {key}").into()),
        }
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), Box<dyn Error>> {
        match key {
            "base-url" => self.base_url = None,
            "request-timeout" => self.request_timeout_secs = None,
            "keyring" => self.keyring = None,
            _ => return Err(format!("Unknown config key: {key}").into()),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        println!("Current configuration:");
        match &self.base_url {
            Some(url) => println!("  base-url: {url}"),
            None => println!("  base-url: (unset, default {DEFAULT_BASE_URL})"),
        }
        match self.request_timeout_secs {
            Some(secs) => println!("  request-timeout: {secs}s"),
            None => println!("  request-timeout: (unset)"),
        }
        match self.keyring_enabled() {
            true => println!("  keyring: on"),
            false => println!("  keyring: off"),
        }
    }
}

fn parse_toggle(value: &str) -> Result<bool, Box<dyn Error>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("Expected on/off, got: {other}").into()),
    }
}
