//! MongoDB connection target decomposition
//!
//! Tunneling replaces the host part of the connection string with a local
//! endpoint, so the string has to be split into its parts first.

use regex::Regex;
use std::sync::OnceLock;

/// Port assumed when the connection string names a host without one
pub const DEFAULT_MONGO_PORT: u16 = 27017;

static TARGET_PATTERN: OnceLock<Regex> = OnceLock::new();
static CREDENTIALS_PATTERN: OnceLock<Regex> = OnceLock::new();

fn target_pattern() -> &'static Regex {
    TARGET_PATTERN.get_or_init(|| {
        Regex::new(r"^(mongodb(?:\+srv)?)://([^/]*)@([^/@]*)(?:/(.*))?$").unwrap()
    })
}

/// A connection string split as `scheme://credentials@host/rest`
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    scheme: String,
    credentials: String,
    host: String,
    rest: String,
}

impl ConnectionTarget {
    /// Decomposes a connection string
    ///
    /// # Errors
    ///
    /// Returns a message when the string does not have the
    /// `mongodb://credentials@host/rest` shape.
    pub fn parse(url: &str) -> Result<Self, String> {
        let caps = target_pattern().captures(url.trim()).ok_or_else(|| {
            format!(
                "Connection target '{}' does not match mongodb://credentials@host/rest",
                redact_connection_string(url)
            )
        })?;

        Ok(Self {
            scheme: caps[1].to_string(),
            credentials: caps[2].to_string(),
            host: caps[3].to_string(),
            rest: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }

    /// URI scheme (`mongodb` or `mongodb+srv`)
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host part as written, possibly a seed list
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Database path and options after the host
    pub fn rest(&self) -> &str {
        &self.rest
    }

    /// The single `host:port` a tunnel has to forward to
    ///
    /// # Errors
    ///
    /// SRV records and seed lists cannot be represented by one local endpoint.
    pub fn tunnel_destination(&self) -> Result<String, String> {
        if self.scheme == "mongodb+srv" {
            return Err(
                "mongodb+srv connection targets cannot be tunneled; use a mongodb:// host"
                    .to_string(),
            );
        }
        if self.host.is_empty() {
            return Err("Connection target has an empty host".to_string());
        }
        if self.host.contains(',') {
            return Err(format!(
                "Tunneling supports a single host, got seed list '{}'",
                self.host
            ));
        }

        let has_port = match self.host.rfind(':') {
            Some(idx) => !self.host.ends_with(']') && self.host[idx + 1..].parse::<u16>().is_ok(),
            None => false,
        };
        if has_port {
            Ok(self.host.clone())
        } else {
            Ok(format!("{}:{}", self.host, DEFAULT_MONGO_PORT))
        }
    }

    /// Rebuilds the connection string with `host` in place of the original host
    ///
    /// `directConnection=true` is added unless the options already set it, so the
    /// driver keeps talking to the substituted endpoint instead of the members it
    /// would otherwise discover.
    pub fn with_host(&self, host: &str) -> String {
        let rest = if self.rest.contains("directConnection=") {
            self.rest.clone()
        } else if self.rest.contains('?') {
            format!("{}&directConnection=true", self.rest)
        } else {
            format!("{}?directConnection=true", self.rest)
        };
        format!("{}://{}@{}/{}", self.scheme, self.credentials, host, rest)
    }
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("scheme", &self.scheme)
            .field("credentials", &"***")
            .field("host", &self.host)
            .field("rest", &self.rest)
            .finish()
    }
}

/// Masks the credentials of a connection string for logging
pub fn redact_connection_string(url: &str) -> String {
    let re = CREDENTIALS_PATTERN.get_or_init(|| Regex::new(r"://[^/@]*@").unwrap());
    re.replace(url, "://***@").into_owned()
}
