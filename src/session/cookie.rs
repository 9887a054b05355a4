//! Cookie naming and attribute policy
//!
//! Production cookies are locked to the host with `__Secure-`/`__Host-` name
//! prefixes, marked `Secure` and `Partitioned`, and sent `SameSite=Lax`.
//! Development cookies carry no prefix and use `SameSite=None` so that a local
//! frontend on another origin can complete the callback.

use actix_web::cookie::{time::Duration, Cookie, SameSite};

/// Base name shared by the broker's cookies
pub const DEFAULT_COOKIE_BASE: &str = "authjs";

/// Prefix for cookies that must only be sent over HTTPS
pub const SECURE_PREFIX: &str = "__Secure-";

/// Prefix for cookies bound to the exact host with `Path=/` and no `Domain`
pub const HOST_PREFIX: &str = "__Host-";

/// Name and attributes for one cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    /// `Some(true)` emits the `Partitioned` attribute; `None` omits it
    pub partitioned: Option<bool>,
    pub path: String,
}

impl CookieSpec {
    /// Render a `Set-Cookie` header value carrying `value` for `max_age`
    #[must_use]
    pub fn header_value(&self, value: &str, max_age: Duration) -> String {
        let cookie = Cookie::build(self.name.clone(), value.to_owned())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site)
            .path(self.path.clone())
            .max_age(max_age)
            .finish();

        // actix's cookie version has no Partitioned attribute
        let mut header = cookie.to_string();
        if self.partitioned == Some(true) {
            header.push_str("; Partitioned");
        }
        header
    }

    /// Render a `Set-Cookie` header value that removes the cookie
    #[must_use]
    pub fn removal_header_value(&self) -> String {
        self.header_value("", Duration::ZERO)
    }
}

/// The cookies the broker writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSet {
    pub session_token: CookieSpec,
    pub callback_url: CookieSpec,
    pub csrf_token: CookieSpec,
    /// Binds a pending sign-in's OAuth state to the browser that started it
    pub state: CookieSpec,
}

impl CookieSet {
    /// Cookie policy for the given environment using the default base name
    #[must_use]
    pub fn for_environment(production: bool) -> Self {
        Self::new(production, DEFAULT_COOKIE_BASE)
    }

    #[must_use]
    pub fn new(production: bool, base_name: &str) -> Self {
        let (secure_prefix, host_prefix) = if production {
            (SECURE_PREFIX, HOST_PREFIX)
        } else {
            ("", "")
        };
        let same_site = if production {
            SameSite::Lax
        } else {
            SameSite::None
        };
        let partitioned = production.then_some(true);

        let spec = |name: String, http_only: bool| CookieSpec {
            name,
            http_only,
            secure: production,
            same_site,
            partitioned,
            path: "/".to_string(),
        };

        Self {
            session_token: spec(format!("{secure_prefix}{base_name}.session-token"), true),
            callback_url: spec(format!("{secure_prefix}{base_name}.callback-url"), false),
            csrf_token: spec(format!("{host_prefix}{base_name}.csrf-token"), true),
            state: spec(format!("{secure_prefix}{base_name}.state"), true),
        }
    }

    fn all(&self) -> [&CookieSpec; 4] {
        [
            &self.session_token,
            &self.callback_url,
            &self.csrf_token,
            &self.state,
        ]
    }

    /// Removal headers for every broker cookie
    #[must_use]
    pub fn removal_headers(&self) -> Vec<String> {
        self.all()
            .iter()
            .map(|spec| spec.removal_header_value())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_policy() {
        let cookies = CookieSet::for_environment(true);

        assert_eq!(cookies.session_token.name, "__Secure-authjs.session-token");
        assert_eq!(cookies.callback_url.name, "__Secure-authjs.callback-url");
        assert_eq!(cookies.csrf_token.name, "__Host-authjs.csrf-token");
        assert_eq!(cookies.state.name, "__Secure-authjs.state");

        for spec in cookies.all() {
            assert!(spec.secure, "{} must be secure", spec.name);
            assert_eq!(spec.partitioned, Some(true));
            assert_eq!(spec.same_site, SameSite::Lax);
            assert_eq!(spec.path, "/");
        }
    }

    #[test]
    fn test_development_policy() {
        let cookies = CookieSet::for_environment(false);

        assert_eq!(cookies.session_token.name, "authjs.session-token");
        assert_eq!(cookies.callback_url.name, "authjs.callback-url");
        assert_eq!(cookies.csrf_token.name, "authjs.csrf-token");
        assert_eq!(cookies.state.name, "authjs.state");

        for spec in cookies.all() {
            assert!(!spec.secure);
            assert_eq!(spec.partitioned, None);
            assert_eq!(spec.same_site, SameSite::None);
        }
    }

    #[test]
    fn test_http_only_flags() {
        let cookies = CookieSet::for_environment(true);
        assert!(cookies.session_token.http_only);
        assert!(cookies.csrf_token.http_only);
        assert!(cookies.state.http_only);
        assert!(!cookies.callback_url.http_only);
    }

    #[test]
    fn test_custom_base_name() {
        let cookies = CookieSet::new(true, "broker");
        assert_eq!(cookies.session_token.name, "__Secure-broker.session-token");
        assert_eq!(cookies.csrf_token.name, "__Host-broker.csrf-token");
    }

    #[test]
    fn test_production_header_value() {
        let cookies = CookieSet::for_environment(true);
        let header = cookies
            .session_token
            .header_value("sealed", Duration::hours(1));

        assert!(header.starts_with("__Secure-authjs.session-token=sealed"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("; Secure"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=3600"));
        assert!(header.ends_with("; Partitioned"));
    }

    #[test]
    fn test_development_header_value() {
        let cookies = CookieSet::for_environment(false);
        let header = cookies
            .session_token
            .header_value("sealed", Duration::hours(1));

        assert!(header.starts_with("authjs.session-token=sealed"));
        assert!(header.contains("SameSite=None"));
        assert!(!header.contains("; Secure"));
        assert!(!header.contains("Partitioned"));
    }

    #[test]
    fn test_removal_headers() {
        let cookies = CookieSet::for_environment(true);
        let headers = cookies.removal_headers();

        assert_eq!(headers.len(), 4);
        for header in headers {
            assert!(header.contains("Max-Age=0"));
            assert!(header.ends_with("; Partitioned"));
        }
    }
}
