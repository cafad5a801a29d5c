//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session durations (work, short break, long break)
//! - Cycle length before a long break
//! - Auto-start, sound and notification switches
//!
//! Configuration is stored at `~/.config/pomodoro/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;
use crate::timer::{DurationLookup, SessionType};

/// Application configuration.
///
/// Durations are stored as human strings (`"25m"`, `"1h30m"`, `"90s"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_work_duration", with = "duration_str")]
    pub work_duration: Duration,
    #[serde(default = "default_short_break", with = "duration_str")]
    pub short_break_duration: Duration,
    #[serde(default = "default_long_break", with = "duration_str")]
    pub long_break_duration: Duration,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
    #[serde(default = "default_true")]
    pub auto_start_breaks: bool,
    #[serde(default = "default_true")]
    pub auto_start_work: bool,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub notify_enabled: bool,
}

/// Command-line overrides layered over the stored config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub work_duration: Option<Duration>,
    pub short_break_duration: Option<Duration>,
    pub long_break_duration: Option<Duration>,
    pub sessions_until_long_break: Option<u32>,
    pub no_sound: bool,
    pub no_notify: bool,
    pub no_auto_break: bool,
    pub no_auto_work: bool,
}

// Default functions
fn default_work_duration() -> Duration {
    Duration::from_secs(25 * 60)
}
fn default_short_break() -> Duration {
    Duration::from_secs(5 * 60)
}
fn default_long_break() -> Duration {
    Duration::from_secs(15 * 60)
}
fn default_sessions_until_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_duration: default_work_duration(),
            short_break_duration: default_short_break(),
            long_break_duration: default_long_break(),
            sessions_until_long_break: default_sessions_until_long_break(),
            auto_start_breaks: true,
            auto_start_work: true,
            sound_enabled: true,
            notify_enabled: true,
        }
    }
}

impl DurationLookup for Config {
    fn duration_for(&self, session_type: SessionType) -> Duration {
        match session_type {
            SessionType::Work => self.work_duration,
            SessionType::ShortBreak => self.short_break_duration,
            SessionType::LongBreak => self.long_break_duration,
        }
    }
}

impl Config {
    /// `~/.config/pomodoro/config.toml` (see [`data_dir`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, or defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
        };
        let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Reject values the timer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("work_duration", self.work_duration),
            ("short_break_duration", self.short_break_duration),
            ("long_break_duration", self.long_break_duration),
        ];
        for (key, value) in durations {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "duration must be positive".into(),
                });
            }
        }
        if self.sessions_until_long_break == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sessions_until_long_break".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn sessions_until_long(&self) -> u32 {
        self.sessions_until_long_break
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(d) = overrides.work_duration.filter(|d| !d.is_zero()) {
            self.work_duration = d;
        }
        if let Some(d) = overrides.short_break_duration.filter(|d| !d.is_zero()) {
            self.short_break_duration = d;
        }
        if let Some(d) = overrides.long_break_duration.filter(|d| !d.is_zero()) {
            self.long_break_duration = d;
        }
        if let Some(n) = overrides.sessions_until_long_break.filter(|n| *n > 0) {
            self.sessions_until_long_break = n;
        }
        if overrides.no_sound {
            self.sound_enabled = false;
        }
        if overrides.no_notify {
            self.notify_enabled = false;
        }
        if overrides.no_auto_break {
            self.auto_start_breaks = false;
        }
        if overrides.no_auto_work {
            self.auto_start_work = false;
        }
    }

    /// Get a config value as string by key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match json.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key, typed after the existing field.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse or
    /// validate. The config is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let obj = json
            .as_object_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let existing = obj
            .get(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .trim()
                    .parse::<bool>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
            ),
            serde_json::Value::Number(_) => serde_json::Value::Number(
                value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                    .into(),
            ),
            _ => {
                parse_duration(value)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as duration")))?;
                serde_json::Value::String(value.trim().to_string())
            }
        };
        obj.insert(key.to_string(), new_value);

        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// `(key, value)` pairs in declaration order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("work_duration", format_duration(self.work_duration)),
            ("short_break_duration", format_duration(self.short_break_duration)),
            ("long_break_duration", format_duration(self.long_break_duration)),
            ("sessions_until_long_break", self.sessions_until_long_break.to_string()),
            ("auto_start_breaks", self.auto_start_breaks.to_string()),
            ("auto_start_work", self.auto_start_work.to_string()),
            ("sound_enabled", self.sound_enabled.to_string()),
            ("notify_enabled", self.notify_enabled.to_string()),
        ]
    }
}

/// Parse `"25m"`, `"1h30m"`, `"1.5m"`, `"500ms"` or a bare number of minutes.
///
/// Each component is a decimal number followed by one of `h`, `m`, `s` or
/// `ms`. Zero durations are rejected.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    if s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return nanos_to_duration(scaled_nanos(&s, NANOS_PER_MINUTE)?);
    }

    let mut total: u128 = 0;
    let mut rest = s.as_str();
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(split);
        let split = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(split);

        // A trailing number without a unit is ambiguous after other units.
        let unit_nanos = match unit {
            "h" => NANOS_PER_MINUTE * 60,
            "m" => NANOS_PER_MINUTE,
            "s" => NANOS_PER_SECOND,
            "ms" => NANOS_PER_SECOND / 1000,
            _ => return None,
        };
        total = total.checked_add(scaled_nanos(number, unit_nanos)?)?;
        rest = tail;
    }

    nanos_to_duration(total)
}

const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;

/// `number` (e.g. `"1.5"`) times `unit_nanos`, without going through floats.
fn scaled_nanos(number: &str, unit_nanos: u128) -> Option<u128> {
    let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac = &frac[..frac.len().min(18)];
    let frac_nanos = if frac.is_empty() {
        0
    } else {
        frac.parse::<u128>().ok()? * unit_nanos / 10u128.pow(frac.len() as u32)
    };
    whole.checked_mul(unit_nanos)?.checked_add(frac_nanos)
}

fn nanos_to_duration(nanos: u128) -> Option<Duration> {
    let secs = u64::try_from(nanos / NANOS_PER_SECOND).ok()?;
    let d = Duration::new(secs, (nanos % NANOS_PER_SECOND) as u32);
    (!d.is_zero()).then_some(d)
}

/// Compact form accepted by [`parse_duration`], e.g. `"1h30m"`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 {
        out.push_str(&format!("{s}s"));
    }
    let ms = d.subsec_millis();
    if ms > 0 {
        out.push_str(&format!("{ms}ms"));
    }
    if out.is_empty() {
        out.push_str("0s");
    }
    out
}

mod duration_str {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid duration '{s}'")))
    }
}
