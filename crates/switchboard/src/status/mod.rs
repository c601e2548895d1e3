//! Transport status codes produced by the translator.
//!
//! Statuses use HTTP numbering so transports that speak HTTP can forward them
//! unchanged, while socket transports can serialise the bare number.

use std::fmt;

use serde::Serialize;

/// Transport-level status attached to every dispatch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Status(u16);

impl Status {
    /// The call completed and produced a result.
    pub const OK: Self = Self(200);
    /// The payload could not be decoded into the method input.
    pub const BAD_REQUEST: Self = Self(400);
    /// The caller is not authorised to perform the call.
    pub const UNAUTHORIZED: Self = Self(401);
    /// The service, method or route does not exist.
    pub const NOT_FOUND: Self = Self(404);
    /// The dispatcher or the invoked method failed unexpectedly.
    pub const INTERNAL_ERROR: Self = Self(500);

    /// Returns the numeric status code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Returns `true` for success-class statuses (`2xx`).
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    /// Maps a domain error code onto a failure status.
    ///
    /// Codes in the client and server error ranges (`400..=599`) pass through
    /// verbatim. Any other code cannot describe a failure and collapses to
    /// [`Status::INTERNAL_ERROR`].
    #[must_use]
    pub const fn from_domain_code(code: u16) -> Self {
        if code >= 400 && code <= 599 {
            Self(code)
        } else {
            Self::INTERNAL_ERROR
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::unauthorised(401, Status::UNAUTHORIZED)]
    #[case::conflict(409, Status(409))]
    #[case::unavailable(503, Status(503))]
    #[case::success_code(200, Status::INTERNAL_ERROR)]
    #[case::zero(0, Status::INTERNAL_ERROR)]
    #[case::out_of_range(600, Status::INTERNAL_ERROR)]
    fn maps_domain_codes(#[case] code: u16, #[case] expected: Status) {
        assert_eq!(Status::from_domain_code(code), expected);
    }

    #[test]
    fn only_2xx_is_success() {
        assert!(Status::OK.is_success());
        assert!(!Status::NOT_FOUND.is_success());
        assert!(!Status::INTERNAL_ERROR.is_success());
    }

    #[test]
    fn serialises_as_bare_number() {
        let json = serde_json::to_string(&Status::NOT_FOUND).expect("serialise status");
        assert_eq!(json, "404");
    }
}
