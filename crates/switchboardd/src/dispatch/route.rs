//! Route parsing for `/{prefix}/{service}/{method}` paths.

use thiserror::Error;

/// Service and method named by a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    service: String,
    method: String,
}

impl Route {
    /// Parses `path` against the required `prefix`.
    ///
    /// The leading slash is optional and a single trailing slash is tolerated.
    /// Names are taken verbatim; no case folding or decoding is applied.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when the prefix is missing or the path does not
    /// hold exactly two non-empty segments after it.
    pub fn parse(path: &str, prefix: &str) -> Result<Self, RouteError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let segments: Vec<&str> = trimmed.split('/').collect();

        match segments.as_slice() {
            [head, ..] if *head != prefix => Err(RouteError::missing_prefix(path, prefix)),
            [_, service, method] if !service.is_empty() && !method.is_empty() => Ok(Self {
                service: (*service).to_owned(),
                method: (*method).to_owned(),
            }),
            [_, rest @ ..] if rest.len() == 2 => Err(RouteError::EmptySegment {
                path: path.to_owned(),
            }),
            _ => Err(RouteError::SegmentCount {
                path: path.to_owned(),
                found: segments.len().saturating_sub(1),
            }),
        }
    }

    /// Service segment.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Method segment.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// Reasons a path does not name a service method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The first segment was not the route prefix.
    #[error("path '{path}' does not start with '/{prefix}'")]
    MissingPrefix {
        /// Path as received.
        path: String,
        /// Required prefix.
        prefix: String,
    },
    /// The path held the wrong number of segments after the prefix.
    #[error("path '{path}' has {found} segments after the prefix, expected 2")]
    SegmentCount {
        /// Path as received.
        path: String,
        /// Segments found after the prefix.
        found: usize,
    },
    /// The service or method segment was empty.
    #[error("path '{path}' has an empty service or method segment")]
    EmptySegment {
        /// Path as received.
        path: String,
    },
}

impl RouteError {
    /// Creates a missing prefix error.
    pub fn missing_prefix(path: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::MissingPrefix {
            path: path.into(),
            prefix: prefix.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::canonical("/HPC/AuthService/Login")]
    #[case::no_leading_slash("HPC/AuthService/Login")]
    #[case::trailing_slash("/HPC/AuthService/Login/")]
    fn accepts_service_method_paths(#[case] path: &str) {
        let route = Route::parse(path, "HPC").expect("route parses");
        assert_eq!(route.service(), "AuthService");
        assert_eq!(route.method(), "Login");
    }

    #[rstest]
    #[case::empty("")]
    #[case::root("/")]
    #[case::prefix_only("/HPC")]
    #[case::service_only("/HPC/AuthService")]
    #[case::too_deep("/HPC/AuthService/Login/extra")]
    #[case::double_trailing("/HPC/AuthService/Login//")]
    #[case::empty_service("/HPC//Login")]
    #[case::wrong_prefix("/api/AuthService/Login")]
    #[case::prefix_case("/hpc/AuthService/Login")]
    fn rejects_other_paths(#[case] path: &str) {
        assert!(Route::parse(path, "HPC").is_err(), "{path} should not parse");
    }

    #[test]
    fn names_are_kept_verbatim() {
        let route = Route::parse("/HPC/authservice/LOGIN", "HPC").expect("route parses");
        assert_eq!(route.service(), "authservice");
        assert_eq!(route.method(), "LOGIN");
    }

    #[test]
    fn prefix_is_configurable() {
        let route = Route::parse("/RPC/Ledger/Deposit", "RPC").expect("route parses");
        assert_eq!(route.service(), "Ledger");
        assert!(Route::parse("/HPC/Ledger/Deposit", "RPC").is_err());
    }
}
