use std::time::Duration;
use std::{env, fmt, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use webring::schedule::ScheduleError;
use webring::{CheckSchedule, CheckerSettings, RingEndpoint};

pub const DEFAULT_API_TOKEN: &str = "ADMIN_TOKEN_CHANGE_ME";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("Failed to write config file: {0}")]
    WriteFailed(#[source] io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("No config path available: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub ring: RingEndpoint,
    pub checker: CheckerSettings,
    pub schedule: Schedule,
    pub database: Database,
    pub admin: Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    /// Cron expression; takes precedence over `interval_seconds`
    pub cron: Option<String>,
    pub interval_seconds: u64,
    pub run_on_start: bool,
}

impl Default for Schedule {
    fn default() -> Self {
        Self { cron: None, interval_seconds: 30 * 60, run_on_start: false }
    }
}

impl Schedule {
    pub fn check_schedule(&self) -> Result<CheckSchedule, ScheduleError> {
        match self.cron.as_deref().map(str::trim) {
            Some(expr) if !expr.is_empty() => CheckSchedule::cron(expr),
            _ => CheckSchedule::every(Duration::from_secs(self.interval_seconds)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub path: path::PathBuf,
    pub max_connections: usize,
}

impl Default for Database {
    fn default() -> Self {
        Self { path: "webring.db".into(), max_connections: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Admin {
    pub api_token: String,
}

impl Default for Admin {
    fn default() -> Self {
        Self { api_token: DEFAULT_API_TOKEN.into() }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/webring/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("webring/config.toml"))
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::InvalidEnv { name, value })
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        let variants: Vec<String> = self.ring.accepted_variants.iter().map(ToString::to_string).collect();
        let schedule = match self.schedule.check_schedule() {
            Ok(schedule) => schedule.to_string(),
            Err(e) => format!("invalid ({e})"),
        };
        let token = if self.admin.api_token == DEFAULT_API_TOKEN { "<default>" } else { "<redacted>" };

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Ring")?;
        write_1(f, "Public URL", &self.ring.public_url())?;
        write_1(f, "HTTP Port", &self.ring.http_port)?;
        write_1(f, "HTTPS Port", &self.ring.https_port)?;
        write_1(f, "Accepted Variants", &variants.join(", "))?;
        write_title_1(f, "Checker")?;
        write_1(f, "User Agent", &self.checker.user_agent(&self.ring))?;
        write_1(f, "Timeout (s)", &self.checker.timeout_seconds)?;
        write_1(f, "Max Redirects", &self.checker.max_redirects)?;
        write_1(f, "Concurrency", &self.checker.concurrency)?;
        write_title_1(f, "Schedule")?;
        write_1(f, "Runs", &schedule)?;
        write_1(f, "Run On Start", &self.schedule.run_on_start)?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path.display())?;
        write_1(f, "Max Connections", &self.database.max_connections)?;
        write_title_1(f, "Admin")?;
        write_1(f, "API Token", &token)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/webring/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(Error::WriteFailed)
    }

    /// Apply `WEBRING_*` overrides from the process environment
    pub fn apply_process_env(&mut self) -> Result<(), Error> {
        self.apply_env(|name| env::var(name).ok())
    }

    /// Apply `WEBRING_*` overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), Error> {
        if let Some(token) = lookup("WEBRING_API_TOKEN") {
            self.admin.api_token = token;
        }
        if let Some(host) = lookup("WEBRING_HOST") {
            self.ring.host = host;
        }
        if let Some(path) = lookup("WEBRING_PATH") {
            self.ring.path = path;
        }
        if let Some(port) = lookup("WEBRING_HTTP_PORT") {
            self.ring.http_port = parse_env("WEBRING_HTTP_PORT", port)?;
        }
        if let Some(port) = lookup("WEBRING_HTTPS_PORT") {
            self.ring.https_port = parse_env("WEBRING_HTTPS_PORT", port)?;
        }
        if let Some(https) = lookup("WEBRING_HTTPS") {
            self.ring.https = parse_env("WEBRING_HTTPS", https.to_ascii_lowercase())?;
        }
        if let Some(agent) = lookup("WEBRING_SCRAPER_USER_AGENT") {
            self.checker.user_agent = Some(agent);
        }
        if let Some(cron) = lookup("WEBRING_SCRAPE_CRON") {
            self.schedule.cron = Some(cron);
        }
        if let Some(database) = lookup("WEBRING_DATABASE") {
            self.database.path = database.into();
        }
        if let Some(bind) = lookup("WEBRING_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("WEBRING_PORT") {
            self.server.port = parse_env("WEBRING_PORT", port)?;
        }
        Ok(())
    }
}
