use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal,
};

use crate::clients::flexible::ClientType;
use crate::error::ConfigError;
use crate::generator::{GeneratorConfig, ValidationMode};
use crate::model::Difficulty;

/// Trait for types that can retrieve their API key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Older or alternative variable names, checked in order after `KEY_NAME`
    const FALLBACK_KEY_NAMES: &'static [&'static str] = &[];

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();

        std::iter::once(Self::KEY_NAME)
            .chain(Self::FALLBACK_KEY_NAMES.iter().copied())
            .find_map(|name| env::var(name).ok().filter(|value| !value.trim().is_empty()))
    }

    fn require_key() -> Result<String, ConfigError> {
        Self::find_key().ok_or(ConfigError::MissingKey(Self::KEY_NAME))
    }

    /// Find the API key with user fallback - waits 15 seconds for user input
    fn find_key_with_user() -> Result<String, ConfigError> {
        if let Some(key) = Self::find_key() {
            return Ok(key);
        }

        print!("Environment variable {} not found. Please enter the API key (15 second timeout): ", Self::KEY_NAME);
        io::stdout().flush()?;

        let (sender, receiver) = std::sync::mpsc::channel();

        thread::spawn(move || {
            let mut input = String::new();
            if io::stdin().read_line(&mut input).is_ok() {
                let _ = sender.send(input.trim().to_string());
            }
        });

        let api_key = match receiver.recv_timeout(Duration::from_secs(15)) {
            Ok(input) if !input.is_empty() => input,
            _ => return Err(ConfigError::MissingKey(Self::KEY_NAME)),
        };

        if Self::prompt_save_to_env() {
            if let Err(e) = Self::save_to_env_file(&api_key) {
                eprintln!("Warning: Failed to save to .env file: {}", e);
            } else {
                println!("API key saved to .env file");
            }
        }

        Ok(api_key)
    }

    /// Prompt user if they want to save the API key to .env file
    fn prompt_save_to_env() -> bool {
        print!("Add {} to .env file? (y/N): ", Self::KEY_NAME);
        let _ = io::stdout().flush();

        if let Ok(key) = read_single_key(Duration::from_secs(30)) {
            let answer = matches!(key, Some(KeyCode::Char('y' | 'Y')));
            println!("{}", if answer { "y" } else { "n" });
            return answer;
        }

        // Fallback to readline
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_ok() {
            input.trim().eq_ignore_ascii_case("y")
        } else {
            false
        }
    }

    /// Append the API key to .env unless it is already there
    fn save_to_env_file(api_key: &str) -> Result<(), ConfigError> {
        if let Ok(content) = std::fs::read_to_string(".env") {
            if content.contains(&format!("{}=", Self::KEY_NAME)) {
                return Ok(());
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(".env")?;
        writeln!(file, "{}={}", Self::KEY_NAME, api_key)?;

        Ok(())
    }
}

/// Read one key press in raw mode. `Ok(None)` on timeout or a non-key event.
pub fn read_single_key(timeout: Duration) -> io::Result<Option<KeyCode>> {
    terminal::enable_raw_mode()?;

    let result = (|| -> io::Result<Option<KeyCode>> {
        if event::poll(timeout)? {
            if let Event::Key(KeyEvent { code, kind: KeyEventKind::Press, .. }) = event::read()? {
                return Ok(Some(code));
            }
        }
        Ok(None)
    })();

    terminal::disable_raw_mode()?;
    result
}

/// Runtime settings, read from `QUIZ_*` variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientType,
    pub timeout: Duration,
    pub validation: ValidationMode,
    pub difficulty: Difficulty,
}

impl AppConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Load settings from the process environment (after `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup. Unset variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let client = match lookup("QUIZ_CLIENT") {
            Some(value) => parse_setting("QUIZ_CLIENT", &value)?,
            None => ClientType::detect_with(&lookup),
        };

        let timeout = match lookup("QUIZ_TIMEOUT_SECS") {
            Some(value) => {
                let secs: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: "QUIZ_TIMEOUT_SECS",
                    value: value.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        };

        let validation = match lookup("QUIZ_VALIDATION") {
            Some(value) => parse_setting("QUIZ_VALIDATION", &value)?,
            None => ValidationMode::default(),
        };

        let difficulty = match lookup("QUIZ_DIFFICULTY") {
            Some(value) => parse_setting("QUIZ_DIFFICULTY", &value)?,
            None => Difficulty::default(),
        };

        Ok(Self { client, timeout, validation, difficulty })
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            timeout: self.timeout,
            validation: self.validation,
        }
    }
}

fn parse_setting<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(matches!(config.client, ClientType::Mock));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.validation, ValidationMode::Strict);
        assert_eq!(config.difficulty, Difficulty::Medium);
    }

    #[test]
    fn explicit_settings_are_parsed() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("QUIZ_CLIENT", "DeepSeek"),
            ("QUIZ_TIMEOUT_SECS", " 15 "),
            ("QUIZ_VALIDATION", "lenient"),
            ("QUIZ_DIFFICULTY", "hard"),
        ]))
        .unwrap();
        assert!(matches!(config.client, ClientType::DeepSeek));
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.validation, ValidationMode::Lenient);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.generator_config().timeout, Duration::from_secs(15));
    }

    #[test]
    fn client_is_detected_from_available_keys() {
        let config = AppConfig::from_lookup(lookup_from(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();
        assert!(matches!(config.client, ClientType::Claude));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("API_KEY", "g-test"),
        ]))
        .unwrap();
        assert!(matches!(config.client, ClientType::Gemini));
    }

    #[test]
    fn invalid_values_are_reported_by_name() {
        let err = AppConfig::from_lookup(lookup_from(&[("QUIZ_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "QUIZ_TIMEOUT_SECS", .. }));

        let err = AppConfig::from_lookup(lookup_from(&[("QUIZ_CLIENT", "gpt")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "QUIZ_CLIENT", .. }));
    }
}
