//! Configuration system (layered: defaults < TOML file < environment).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::PlanxError;
use crate::util::RetryPolicy;

/// Placeholder substituted with the session's creation date.
pub const CURRENT_DATE_PLACEHOLDER: &str = "{current_date}";

/// Token endpoint used for refresh-token grants unless overridden.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const DEFAULT_SYSTEM_PROMPT: &str = "\
You are planX, a smart assistant for developers and students.
Current Date: {current_date}
Your goal is to automate daily tasks and save the user time.

Capabilities:
1. MAIL: check unread messages, send replies, clean up promotions.
2. CALENDAR: check the schedule, book meetings, find free slots.
3. SEARCH: look up real-time information.
4. Answer general questions.

Rules for tool use:
1. Tool arguments MUST be valid JSON.
2. Use DOUBLE QUOTES for every JSON key and string value.
   Correct: {\"calendar_id\": \"primary\", \"time\": \"10:00\"}
   Wrong: {'calendar_id': 'primary', 'time': '10:00'}
3. For questions about \"today\", work from the Current Date above.";

/// OAuth client settings for refreshing expired credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthSettings {
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
        }
    }
}

impl OAuthSettings {
    /// Whether a client id is available for refresh-token grants.
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }
}

impl std::fmt::Debug for OAuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSettings")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Runtime settings for the orchestrator and its stores.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanxConfig {
    /// Maximum Executing phases per turn before a capped answer is forced.
    pub max_round_trips: u32,
    pub reasoning_timeout: Duration,
    pub tool_timeout: Duration,
    /// Attempts per reasoning call, including the first.
    pub reasoning_attempts: u32,
    /// Preamble for new sessions; may contain `{current_date}`.
    pub system_prompt: String,
    /// Answer used when the model's final text is empty.
    pub empty_answer_fallback: String,
    /// Root for the file-backed stores.
    pub data_dir: PathBuf,
    pub oauth: OAuthSettings,
}

impl Default for PlanxConfig {
    fn default() -> Self {
        Self {
            max_round_trips: 8,
            reasoning_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
            reasoning_attempts: 2,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            empty_answer_fallback: "Task completed.".to_string(),
            data_dir: default_data_dir(),
            oauth: OAuthSettings::default(),
        }
    }
}

/// On-disk shape of the TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    max_round_trips: Option<u32>,
    reasoning_timeout_ms: Option<u64>,
    tool_timeout_ms: Option<u64>,
    reasoning_attempts: Option<u32>,
    system_prompt: Option<String>,
    empty_answer_fallback: Option<String>,
    data_dir: Option<PathBuf>,
    #[serde(default)]
    oauth: OAuthFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OAuthFile {
    token_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl PlanxConfig {
    /// Load from the process environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self, PlanxError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults, the file named by `PLANX_CONFIG` (if any), then
    /// variables returned by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PlanxError> {
        let mut config = Self::default();
        if let Some(path) = lookup("PLANX_CONFIG").filter(|p| !p.trim().is_empty()) {
            config.apply_file(path)?;
        }
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanxError> {
        let mut config = Self::default();
        config.apply_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, path: impl AsRef<Path>) -> Result<(), PlanxError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PlanxError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|e| {
            PlanxError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })?;

        if let Some(v) = file.max_round_trips {
            self.max_round_trips = v;
        }
        if let Some(ms) = file.reasoning_timeout_ms {
            self.reasoning_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.tool_timeout_ms {
            self.tool_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = file.reasoning_attempts {
            self.reasoning_attempts = v;
        }
        if let Some(v) = file.system_prompt {
            self.system_prompt = v;
        }
        if let Some(v) = file.empty_answer_fallback {
            self.empty_answer_fallback = v;
        }
        if let Some(v) = file.data_dir {
            self.data_dir = v;
        }
        if let Some(v) = file.oauth.token_url {
            self.oauth.token_url = v;
        }
        if file.oauth.client_id.is_some() {
            self.oauth.client_id = file.oauth.client_id;
        }
        if file.oauth.client_secret.is_some() {
            self.oauth.client_secret = file.oauth.client_secret;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), PlanxError> {
        if let Some(v) = parse_var::<u32>(lookup, "PLANX_MAX_ROUND_TRIPS")? {
            self.max_round_trips = v;
        }
        if let Some(ms) = parse_var::<u64>(lookup, "PLANX_REASONING_TIMEOUT_MS")? {
            self.reasoning_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(lookup, "PLANX_TOOL_TIMEOUT_MS")? {
            self.tool_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = parse_var::<u32>(lookup, "PLANX_REASONING_ATTEMPTS")? {
            self.reasoning_attempts = v;
        }
        if let Some(v) = lookup("PLANX_SYSTEM_PROMPT") {
            self.system_prompt = v;
        }
        if let Some(v) = lookup("PLANX_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("PLANX_OAUTH_TOKEN_URL") {
            self.oauth.token_url = v;
        }
        if let Some(v) = lookup("PLANX_OAUTH_CLIENT_ID") {
            self.oauth.client_id = Some(v);
        }
        if let Some(v) = lookup("PLANX_OAUTH_CLIENT_SECRET") {
            self.oauth.client_secret = Some(v);
        }
        Ok(())
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), PlanxError> {
        if self.max_round_trips == 0 {
            return Err(PlanxError::Configuration(
                "max_round_trips must be at least 1".into(),
            ));
        }
        if self.reasoning_timeout.is_zero() {
            return Err(PlanxError::Configuration(
                "reasoning timeout must be greater than zero".into(),
            ));
        }
        if self.tool_timeout.is_zero() {
            return Err(PlanxError::Configuration(
                "tool timeout must be greater than zero".into(),
            ));
        }
        if self.reasoning_attempts == 0 {
            return Err(PlanxError::Configuration(
                "reasoning_attempts must be at least 1".into(),
            ));
        }
        if self.system_prompt.trim().is_empty() {
            return Err(PlanxError::Configuration("system prompt must not be empty".into()));
        }
        Ok(())
    }

    /// Retry policy for reasoning calls.
    pub fn reasoning_retry(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.reasoning_attempts)
    }

    /// The system preamble with `{current_date}` filled in, e.g.
    /// `Sunday, October 18, 2026`.
    pub fn render_system_prompt(&self, today: NaiveDate) -> String {
        self.system_prompt.replace(
            CURRENT_DATE_PLACEHOLDER,
            &today.format("%A, %B %d, %Y").to_string(),
        )
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, PlanxError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| PlanxError::Configuration(format!("{name}: invalid value '{raw}': {e}"))),
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".planx"))
        .unwrap_or_else(|| PathBuf::from(".planx"))
}
