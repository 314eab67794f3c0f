//! Configuration Loading
//!
//! Settings structs are extracted from a [`Figment`]. In production the
//! figment reads the process environment, where `JWT_SECRET_KEY` maps to the
//! `jwt_secret_key` field. Tests merge [`figment::providers::Serialized`]
//! values instead.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use figment::Figment;
use figment::providers::Env;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::crypto::from_base64;

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Failed to extract configuration: {0}")]
    Extract(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Extract(e.to_string())
    }
}

impl ConfigError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Figment over the process environment, keys lowercased
pub fn env_figment() -> Figment {
    Figment::new().merge(Env::raw())
}

/// Extract a settings struct from `figment`
pub fn extract<T: DeserializeOwned>(figment: &Figment) -> Result<T, ConfigError> {
    Ok(figment.extract()?)
}

/// Trimmed value; empty counts as unset.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Positive number of seconds as a [`Duration`].
pub fn positive_secs(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

/// Comma-separated list; blank entries are skipped.
pub fn parse_list<T>(key: &str, raw: &str) -> Result<Vec<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(key, format!("{entry}: {e}")))
        })
        .collect()
}

/// Decode a secret given as Base64, falling back to its raw bytes.
///
/// Values that decode to fewer than 16 bytes are taken raw, so short
/// passphrases that happen to be valid Base64 keep their full text.
pub fn decode_secret(raw: &str) -> Vec<u8> {
    match from_base64(raw) {
        Ok(bytes) if bytes.len() >= 16 => bytes,
        _ => raw.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;
    use serde::Deserialize;
    use std::net::IpAddr;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        bind_addr: String,
        workers: u32,
        verbose: bool,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                bind_addr: "127.0.0.1:8000".to_string(),
                workers: 1,
                verbose: false,
            }
        }
    }

    #[test]
    fn test_extract_defaults_and_overrides() {
        let sample: Sample = extract(&Figment::new()).unwrap();
        assert_eq!(sample, Sample::default());

        let figment = Figment::new()
            .merge(Serialized::default("workers", 4))
            .merge(Serialized::default("verbose", true));
        let sample: Sample = extract(&figment).unwrap();
        assert_eq!(sample.workers, 4);
        assert!(sample.verbose);
        assert_eq!(sample.bind_addr, "127.0.0.1:8000");
    }

    #[test]
    fn test_extract_type_mismatch() {
        let figment = Figment::new().merge(Serialized::default("workers", "many"));
        assert!(matches!(
            extract::<Sample>(&figment),
            Err(ConfigError::Extract(_))
        ));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  value ".into())).as_deref(), Some("value"));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn test_positive_secs() {
        assert!(positive_secs("TTL", 0).is_err());
        assert_eq!(positive_secs("TTL", 900), Ok(Duration::from_secs(900)));
    }

    #[test]
    fn test_parse_list() {
        let ips: Vec<IpAddr> = parse_list("TRUSTED_PROXIES", " 10.0.0.1, ,::1 ").unwrap();
        assert_eq!(ips, vec!["10.0.0.1".parse::<IpAddr>().unwrap(), "::1".parse().unwrap()]);
        assert!(parse_list::<IpAddr>("TRUSTED_PROXIES", "").unwrap().is_empty());
        assert!(matches!(
            parse_list::<IpAddr>("TRUSTED_PROXIES", "10.0.0.1,proxy"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_decode_secret() {
        // 32 zero bytes in base64
        let b64 = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";
        assert_eq!(decode_secret(b64), vec![0u8; 32]);
        assert_eq!(decode_secret("my secret"), b"my secret".to_vec());
        assert_eq!(decode_secret("abcd"), b"abcd".to_vec());
    }
}
