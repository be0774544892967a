//! Connection URL parsing
//!
//! A connection URL names a transport driver and hands it an optional
//! argument string: `scheme://args`, e.g. `fake://1a,2b`, `mcp2210://`
//! or `ftdi://0`. A bare `scheme` without separator is accepted and
//! carries no arguments.

use crate::error::ConnectionError;

/// URL separator between scheme and arguments
pub const SEPARATOR: &str = "://";

/// A parsed connection URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionUrl {
    /// Driver scheme, lowercased
    pub scheme: String,
    /// Argument string after the separator, `None` when there is no separator
    pub args: Option<String>,
}

impl ConnectionUrl {
    /// Parse a connection URL
    ///
    /// More than one separator is rejected.
    pub fn parse(url: &str) -> Result<Self, ConnectionError> {
        let parts: Vec<&str> = url.split(SEPARATOR).collect();
        match parts.as_slice() {
            [scheme] => Ok(Self {
                scheme: scheme.trim().to_lowercase(),
                args: None,
            }),
            [scheme, args] => Ok(Self {
                scheme: scheme.trim().to_lowercase(),
                args: Some(args.to_string()),
            }),
            _ => Err(ConnectionError::MalformedUrl(url.to_string())),
        }
    }

    /// Argument string, empty when none was given
    pub fn args_or_empty(&self) -> &str {
        self.args.as_deref().unwrap_or("")
    }
}

impl std::fmt::Display for ConnectionUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.args {
            Some(args) => write!(f, "{}{}{}", self.scheme, SEPARATOR, args),
            None => write!(f, "{}", self.scheme),
        }
    }
}

/// Split a driver argument string into its comma-separated items
///
/// Empty items are dropped, so `""` and `","` both yield nothing.
pub fn split_args(args: &str) -> Vec<&str> {
    args.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_args() {
        let url = ConnectionUrl::parse("fake://1a,2b").unwrap();
        assert_eq!(url.scheme, "fake");
        assert_eq!(url.args.as_deref(), Some("1a,2b"));
    }

    #[test]
    fn test_parse_empty_args() {
        let url = ConnectionUrl::parse("MCP2210://").unwrap();
        assert_eq!(url.scheme, "mcp2210");
        assert_eq!(url.args.as_deref(), Some(""));
        assert_eq!(url.to_string(), "mcp2210://");
    }

    #[test]
    fn test_parse_bare_scheme() {
        let url = ConnectionUrl::parse("fake").unwrap();
        assert_eq!(url.scheme, "fake");
        assert_eq!(url.args, None);
        assert_eq!(url.args_or_empty(), "");
    }

    #[test]
    fn test_parse_two_separators() {
        assert!(matches!(
            ConnectionUrl::parse("ftdi://0://1"),
            Err(ConnectionError::MalformedUrl(_))
        ));
    }

    #[test]
    fn test_split_args() {
        assert_eq!(split_args("1a, 2b,"), vec!["1a", "2b"]);
        assert!(split_args("").is_empty());
    }
}
