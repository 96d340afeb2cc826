// src/crawl/scope.rs
// =============================================================================
// Decides which pages the crawler is allowed to expand.
//
// A page is "in scope" when:
// 1. its authority (host, plus port when it is not the default one) matches
//    the configured authority, AND
// 2. the prefix list is empty, OR its path starts with one of the prefixes
//
// Scope only controls expansion. Every link found on an in-scope page gets
// its status checked, even when it points somewhere out of scope.
// =============================================================================

use url::Url;

use crate::error::ConfigError;

/// What the crawler may expand. Immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRule {
    authority: String,
    prefixes: Vec<String>,
}

impl ScopeRule {
    /// Builds a rule for an explicit authority such as `docs.example.com:8080`.
    pub fn new(authority: impl Into<String>, prefixes: Vec<String>) -> Result<Self, ConfigError> {
        let authority = authority.into().to_ascii_lowercase();
        if authority.is_empty() {
            return Err(ConfigError::MissingAuthority(authority));
        }

        let prefixes = prefixes
            .into_iter()
            .map(normalize_prefix)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { authority, prefixes })
    }

    /// Takes the authority from the seed URL.
    pub fn from_seed(seed: &Url, prefixes: Vec<String>) -> Result<Self, ConfigError> {
        let authority =
            authority_of(seed).ok_or_else(|| ConfigError::MissingAuthority(seed.to_string()))?;
        Self::new(authority, prefixes)
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn in_scope(&self, url: &Url) -> bool {
        let Some(authority) = authority_of(url) else {
            return false;
        };
        if !authority.eq_ignore_ascii_case(&self.authority) {
            return false;
        }

        self.prefixes.is_empty() || self.prefixes.iter().any(|p| url.path().starts_with(p.as_str()))
    }
}

/// `host[:port]`, with the port left out when it is the scheme default.
pub fn authority_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn normalize_prefix(prefix: String) -> Result<String, ConfigError> {
    let trimmed = prefix.trim();
    if trimmed.is_empty() || trimmed.contains(char::is_whitespace) || trimmed.contains('?') {
        return Err(ConfigError::InvalidPrefix(prefix));
    }

    if trimmed.starts_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("/{}", trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_authority_policy_matches_host() {
        let scope = ScopeRule::from_seed(&url("http://x.test/"), vec![]).unwrap();
        assert!(scope.in_scope(&url("http://x.test/anything/at/all")));
        assert!(scope.in_scope(&url("https://X.TEST/other")));
        assert!(!scope.in_scope(&url("http://y.test/")));
        assert!(!scope.in_scope(&url("http://sub.x.test/")));
    }

    #[test]
    fn test_authority_includes_non_default_port() {
        let scope = ScopeRule::from_seed(&url("http://127.0.0.1:8080/"), vec![]).unwrap();
        assert_eq!(scope.authority(), "127.0.0.1:8080");
        assert!(scope.in_scope(&url("http://127.0.0.1:8080/page")));
        assert!(!scope.in_scope(&url("http://127.0.0.1:9090/page")));
        assert!(!scope.in_scope(&url("http://127.0.0.1/page")));
    }

    #[test]
    fn test_default_port_is_ignored() {
        let scope = ScopeRule::from_seed(&url("https://x.test:443/"), vec![]).unwrap();
        assert_eq!(scope.authority(), "x.test");
    }

    #[test]
    fn test_prefix_policy() {
        let scope = ScopeRule::new(
            "x.test",
            vec!["/docs".to_string(), "versions".to_string()],
        )
        .unwrap();

        assert_eq!(scope.prefixes(), ["/docs", "/versions"]);
        assert!(scope.in_scope(&url("http://x.test/docs/a")));
        assert!(scope.in_scope(&url("http://x.test/versions/1.0/")));
        assert!(!scope.in_scope(&url("http://x.test/other")));
        assert!(!scope.in_scope(&url("http://y.test/docs/a")));
    }

    #[test]
    fn test_non_http_urls_are_out_of_scope() {
        let scope = ScopeRule::new("x.test", vec![]).unwrap();
        assert!(!scope.in_scope(&url("mailto:someone@x.test")));
    }

    #[test]
    fn test_rejects_bad_prefix() {
        let err = ScopeRule::new("x.test", vec!["   ".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrefix(_)));
    }

    #[test]
    fn test_rejects_empty_authority() {
        assert!(ScopeRule::new("", vec![]).is_err());
    }
}
