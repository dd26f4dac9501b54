use anyhow::Result;
use regex::Regex;
use serde::Deserialize;

fn default_db_path() -> String {
    "sqlite:///var/lib/annals/news.db".into()
}

fn default_auth_db_path() -> String {
    "sqlite:///var/lib/annals/auth.db".into()
}

fn default_site_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into())
}

fn default_idle_timeout_secs() -> u64 {
    600
}

fn default_max_sessions() -> usize {
    1000
}

fn default_max_scan_results() -> usize {
    1000
}

fn default_runtime_threads() -> usize {
    1
}

fn default_true() -> bool {
    true
}

fn default_cache_max_bytes() -> String {
    "64M".into()
}

fn default_cache_ttl_secs() -> u64 {
    15 * 60
}

fn default_cache_sweep_secs() -> u64 {
    5 * 60
}

/// Default log level filter
pub const DEFAULT_LOG_FILTER: &str = "annals=info,sqlx=warn";

/// Parse a size string with optional K/M/G suffix into bytes.
pub fn parse_size(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (digits, factor) = match trimmed.chars().last()? {
        'K' | 'k' => (&trimmed[..trimmed.len() - 1], 1024u64),
        'M' | 'm' => (&trimmed[..trimmed.len() - 1], 1024u64 * 1024),
        'G' | 'g' => (&trimmed[..trimmed.len() - 1], 1024u64 * 1024 * 1024),
        '0'..='9' => (trimmed, 1u64),
        _ => return None,
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(factor))
}

/// Expand `$ENV{NAME}` and `$FILE{path}` placeholders in the raw config
/// text before TOML parsing. A missing variable or unreadable file is a
/// configuration error.
fn expand_placeholders(text: &str) -> Result<String> {
    let placeholder = Regex::new(r"\$(ENV|FILE)\{([^}]+)\}")?;
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in placeholder.captures_iter(text) {
        let span = caps.get(0).unwrap();
        out.push_str(&text[cursor..span.start()]);
        let argument = &caps[2];
        match &caps[1] {
            "ENV" => out.push_str(&std::env::var(argument)?),
            _ => out.push_str(std::fs::read_to_string(argument)?.trim_end_matches('\n')),
        }
        cursor = span.end();
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Transport wrapping for one listening port.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Plain TCP.
    #[default]
    Cleartext,
    /// TLS handshake before the greeting.
    Tls,
    /// Cleartext start; client may upgrade via STARTTLS.
    Starttls,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenerConfig {
    pub addr: String,
    #[serde(default)]
    pub kind: PortKind,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_bytes")]
    pub max_bytes: String,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_sweep_secs")]
    pub sweep_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_cache_max_bytes(),
            ttl_secs: default_cache_ttl_secs(),
            sweep_secs: default_cache_sweep_secs(),
        }
    }
}

impl CacheConfig {
    pub fn max_bytes(&self) -> u64 {
        parse_size(&self.max_bytes).unwrap_or(64 * 1024 * 1024)
    }
}

#[derive(Deserialize, Clone)]
pub struct Config {
    #[serde(default, alias = "listener")]
    pub listeners: Vec<ListenerConfig>,
    #[serde(default = "default_site_name")]
    pub site_name: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_auth_db_path")]
    pub auth_db_path: String,

    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_max_scan_results")]
    pub max_scan_results: usize,
    #[serde(default = "default_runtime_threads")]
    pub runtime_threads: usize,

    /// Whether unauthenticated sessions may post.
    #[serde(default = "default_true")]
    pub allow_posting: bool,

    #[serde(default)]
    pub tls_cert: Option<String>,
    #[serde(default)]
    pub tls_key: Option<String>,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level filter, e.g. "annals=debug,sqlx=warn".
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read configuration file '{path}': {e}

Create a configuration file at that path, pass --config <path>, or set
the ANNALS_CONFIG environment variable."
            )
        })?;
        let text = expand_placeholders(&text).map_err(|e| {
            anyhow::anyhow!(
                "Failed to expand $ENV{{...}}/$FILE{{...}} placeholders in '{path}': {e}"
            )
        })?;
        let mut cfg: Config = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse configuration file '{path}': {e}"))?;

        if cfg.listeners.is_empty() {
            cfg.listeners.push(ListenerConfig {
                addr: ":119".into(),
                kind: PortKind::Cleartext,
            });
        }
        cfg.max_sessions = cfg.max_sessions.max(1);
        cfg.max_scan_results = cfg.max_scan_results.max(1);
        Ok(cfg)
    }

    /// Apply the runtime-reloadable subset of a freshly parsed config.
    /// Listener and cache topology stay fixed for the process lifetime.
    pub fn update_runtime(&mut self, new: Config) {
        self.idle_timeout_secs = new.idle_timeout_secs;
        self.allow_posting = new.allow_posting;
        self.max_scan_results = new.max_scan_results;
        self.site_name = new.site_name;
        self.log_level = new.log_level;
    }

    pub fn get_runtime_threads(&self) -> Result<usize> {
        if self.runtime_threads == 0 {
            Ok(std::thread::available_parallelism()?.get())
        } else {
            Ok(self.runtime_threads)
        }
    }
}
