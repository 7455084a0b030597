use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use crate::errors::IntakeError;
use crate::format::DEFAULT_WRAP_WIDTH;
use crate::llm_client::OPENAI_API_URL;

pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Substituted for a missing key under `MissingKeyPolicy::Placeholder`.
/// The remote call then fails authentication.
pub const PLACEHOLDER_API_KEY: &str = "TYPE YOUR OPENAI API KEY";

/// What to do when `OPENAI_API_KEY` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Refuse to start a review (`IntakeError::ConfigurationMissing`).
    #[default]
    Fail,
    /// Proceed with `PLACEHOLDER_API_KEY` (dry runs against a mock endpoint).
    Placeholder,
}

impl FromStr for MissingKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "placeholder" => Ok(Self::Placeholder),
            other => Err(format!("expected 'fail' or 'placeholder', got '{other}'")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` when unset or blank; see `resolve_api_key`.
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub missing_key_policy: MissingKeyPolicy,
    /// `INTAKE_PROMPTS_DIR`; when unset the prompt library picks its own default.
    pub prompts_dir: Option<PathBuf>,
    pub wrap_width: usize,
    pub request_timeout_secs: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, IntakeError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IntakeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let wrap_width = parse_or("INTAKE_WRAP_WIDTH", &lookup, DEFAULT_WRAP_WIDTH)?;
        if wrap_width == 0 {
            return Err(IntakeError::InvalidWidth(wrap_width));
        }

        Ok(Config {
            openai_api_key: lookup(OPENAI_API_KEY_VAR).filter(|k| !k.trim().is_empty()),
            openai_base_url: lookup("OPENAI_BASE_URL")
                .unwrap_or_else(|| OPENAI_API_URL.to_string()),
            missing_key_policy: parse_or(
                "INTAKE_MISSING_KEY_POLICY",
                &lookup,
                MissingKeyPolicy::default(),
            )?,
            prompts_dir: lookup("INTAKE_PROMPTS_DIR").map(PathBuf::from),
            wrap_width,
            request_timeout_secs: parse_or("INTAKE_REQUEST_TIMEOUT_SECS", &lookup, 120)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Returns the credential to hand to the LLM client, applying the missing-key policy.
    pub fn resolve_api_key(&self) -> Result<String, IntakeError> {
        match (&self.openai_api_key, self.missing_key_policy) {
            (Some(key), _) => Ok(key.clone()),
            (None, MissingKeyPolicy::Fail) => Err(IntakeError::ConfigurationMissing {
                key: OPENAI_API_KEY_VAR.to_string(),
            }),
            (None, MissingKeyPolicy::Placeholder) => {
                warn!(
                    "{} is not set; using placeholder credential, remote calls will fail authentication",
                    OPENAI_API_KEY_VAR
                );
                Ok(PLACEHOLDER_API_KEY.to_string())
            }
        }
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, IntakeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| IntakeError::InvalidConfig {
                key: key.to_string(),
                reason: e.to_string(),
            }),
    }
}
