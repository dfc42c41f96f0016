pub mod persona;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::cli::{ ChatArgs, ServeArgs };
use self::persona::{ resolve_persona, DEFAULT_GREETING };

pub const DEFAULT_MAX_FRAME_RETRIES: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("upstream API key is not configured")]
    MissingCredential,
    #[error("failed to read persona file '{path}': {source}")]
    PersonaIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("persona file '{0}' is empty")]
    EmptyPersona(String),
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("relay route '{0}' must start with '/'")]
    InvalidRoute(String),
    #[error("both --tls-cert-path and --tls-key-path must be provided to enable TLS")]
    IncompleteTls,
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert_path: String,
    pub key_path: String,
}

/// Read-only settings shared by every relay call. The credential is only
/// reachable through [`RelayConfig::api_key`], which reports its absence.
#[derive(Clone)]
pub struct RelayConfig {
    pub server_addr: String,
    pub route: String,
    pub upstream_url: Url,
    pub model: String,
    pub persona: Arc<str>,
    pub tls: Option<TlsPaths>,
    api_key: Option<String>,
}

impl RelayConfig {
    pub fn new(upstream_url: Url, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            server_addr: "127.0.0.1:4000".to_string(),
            route: "/ai-chat".to_string(),
            upstream_url,
            model: model.into(),
            persona: Arc::from(persona::DEFAULT_PERSONA),
            tls: None,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn with_persona(mut self, persona: impl Into<Arc<str>>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn from_args(args: &ServeArgs) -> Result<Self, ConfigError> {
        let upstream_url = parse_url(&args.chat_base_url)?;

        let route = args.route.trim().to_string();
        if !route.starts_with('/') {
            return Err(ConfigError::InvalidRoute(route));
        }

        let tls = if args.enable_tls {
            match (non_blank(args.tls_cert_path.as_ref()), non_blank(args.tls_key_path.as_ref())) {
                (Some(cert_path), Some(key_path)) => Some(TlsPaths { cert_path, key_path }),
                _ => {
                    return Err(ConfigError::IncompleteTls);
                }
            }
        } else {
            None
        };

        Ok(Self {
            server_addr: args.server_addr.clone(),
            route,
            upstream_url,
            model: args.chat_model.clone(),
            persona: resolve_persona(args.persona_path.as_deref())?,
            tls,
            api_key: non_blank(args.chat_api_key.as_ref()),
        })
    }

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::MissingCredential)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("server_addr", &self.server_addr)
            .field("route", &self.route)
            .field("upstream_url", &self.upstream_url.as_str())
            .field("model", &self.model)
            .field("persona_chars", &self.persona.chars().count())
            .field("tls", &self.tls)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone)]
pub struct ConsumerConfig {
    pub relay_url: Url,
    pub relay_token: Option<String>,
    pub max_frame_retries: u32,
    pub timeout: Option<Duration>,
    pub greeting: Option<String>,
}

impl ConsumerConfig {
    pub fn from_args(args: &ChatArgs) -> Result<Self, ConfigError> {
        let greeting = match &args.greeting {
            Some(g) if g.trim().is_empty() => None,
            Some(g) => Some(g.clone()),
            None => Some(DEFAULT_GREETING.to_string()),
        };

        Ok(Self {
            relay_url: parse_url(&args.relay_url)?,
            relay_token: non_blank(args.relay_token.as_ref()),
            max_frame_retries: args.max_frame_retries,
            timeout: args.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            greeting,
        })
    }
}

impl fmt::Debug for ConsumerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerConfig")
            .field("relay_url", &self.relay_url.as_str())
            .field("relay_token", &self.relay_token.as_ref().map(|_| "<redacted>"))
            .field("max_frame_retries", &self.max_frame_retries)
            .field("timeout", &self.timeout)
            .field("greeting", &self.greeting)
            .finish()
    }
}
