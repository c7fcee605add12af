use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_RETRIEVER_URL: &str = "https://url-content-retriever.vercel.app/api/retriever";
const DEFAULT_ANSWERER_URL: &str = "https://google-generative-ai-nine.vercel.app/api/gemini";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}: invalid socket address {value:?}")]
    BindAddr { name: &'static str, value: String },
    #[error("{name}: invalid service URL {value:?} ({reason})")]
    ServiceUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("{name}: expected a positive number of seconds, got {value:?}")]
    Timeout { name: &'static str, value: String },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub retriever_url: Url,
    pub answerer_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub insecure_ssl: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_raw = lookup("RESEARCHER_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|_| ConfigError::BindAddr {
            name: "RESEARCHER_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let retriever_url = parse_service_url(
            "RESEARCHER_RETRIEVER_URL",
            lookup("RESEARCHER_RETRIEVER_URL").unwrap_or_else(|| DEFAULT_RETRIEVER_URL.into()),
        )?;
        let answerer_url = parse_service_url(
            "RESEARCHER_ANSWERER_URL",
            lookup("RESEARCHER_ANSWERER_URL").unwrap_or_else(|| DEFAULT_ANSWERER_URL.into()),
        )?;

        let connect_timeout = parse_secs(
            "RESEARCHER_CONNECT_TIMEOUT_SECS",
            lookup("RESEARCHER_CONNECT_TIMEOUT_SECS"),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;
        let request_timeout = parse_secs(
            "RESEARCHER_REQUEST_TIMEOUT_SECS",
            lookup("RESEARCHER_REQUEST_TIMEOUT_SECS"),
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;

        let insecure_ssl = lookup("RESEARCHER_INSECURE_SSL").as_deref() == Some("1");

        Ok(Self {
            bind_addr,
            retriever_url,
            answerer_url,
            connect_timeout,
            request_timeout,
            insecure_ssl,
        })
    }
}

fn parse_service_url(name: &'static str, value: String) -> Result<Url, ConfigError> {
    let parsed = Url::parse(&value).map_err(|e| ConfigError::ServiceUrl {
        name,
        value: value.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::ServiceUrl {
            name,
            value,
            reason: "only http and https are supported".to_string(),
        });
    }
    Ok(parsed)
}

fn parse_secs(
    name: &'static str,
    value: Option<String>,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = value else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Timeout { name, value: raw }),
    }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.retriever_url.as_str(), DEFAULT_RETRIEVER_URL);
        assert_eq!(config.answerer_url.as_str(), DEFAULT_ANSWERER_URL);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(!config.insecure_ssl);
    }

    #[test]
    fn overrides_are_honoured() {
        let config = Config::from_lookup(lookup_from(&[
            ("RESEARCHER_BIND_ADDR", "127.0.0.1:9090"),
            ("RESEARCHER_RETRIEVER_URL", "http://localhost:3000/retrieve"),
            ("RESEARCHER_REQUEST_TIMEOUT_SECS", "15"),
            ("RESEARCHER_INSECURE_SSL", "1"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:9090");
        assert_eq!(config.retriever_url.as_str(), "http://localhost:3000/retrieve");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.insecure_ssl);
    }

    #[test]
    fn rejects_non_http_service_url() {
        let err = Config::from_lookup(lookup_from(&[(
            "RESEARCHER_ANSWERER_URL",
            "ftp://example.com/answer",
        )]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ServiceUrl {
                name: "RESEARCHER_ANSWERER_URL",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_and_garbage_timeouts() {
        for bad in ["0", "soon", "-3"] {
            let err = Config::from_lookup(lookup_from(&[(
                "RESEARCHER_CONNECT_TIMEOUT_SECS",
                bad,
            )]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Timeout { .. }), "{bad}");
        }
    }

    #[test]
    fn rejects_bad_bind_addr() {
        let err =
            Config::from_lookup(lookup_from(&[("RESEARCHER_BIND_ADDR", "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::BindAddr { .. }));
    }
}
