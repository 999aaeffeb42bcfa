/*
 * Copyright Stalwart Labs Ltd. See the COPYING
 * file at the top-level directory of this distribution.
 *
 * Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
 * https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
 * <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
 * option. This file may not be copied, modified, or distributed
 * except according to those terms.
 */

use std::fmt::{Debug, Display};

use base64::{engine::general_purpose::STANDARD, Engine};

/// Authentication performed after EHLO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// No authentication
    #[default]
    None,

    /// AUTH LOGIN
    Login,
}

impl Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::None => write!(f, "NONE"),
            AuthMode::Login => write!(f, "LOGIN"),
        }
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    secret: String,
}

impl<'x> From<(&'x str, &'x str)> for Credentials {
    fn from(credentials: (&'x str, &'x str)) -> Self {
        Credentials {
            username: credentials.0.into(),
            secret: credentials.1.into(),
        }
    }
}

impl From<(String, String)> for Credentials {
    fn from(credentials: (String, String)) -> Self {
        Credentials {
            username: credentials.0,
            secret: credentials.1,
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Creates a new `Credentials` instance.
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Credentials {
        Credentials {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    pub fn set_secret(&mut self, secret: impl Into<String>) {
        self.secret = secret.into();
    }

    /// Base64 encoded username, as sent in reply to the first LOGIN challenge.
    pub(crate) fn encode_username(&self) -> String {
        STANDARD.encode(self.username.as_bytes())
    }

    /// Base64 encoded password, as sent in reply to the second LOGIN challenge.
    pub(crate) fn encode_secret(&self) -> String {
        STANDARD.encode(self.secret.as_bytes())
    }
}

#[cfg(test)]
mod test {
    use crate::smtp::auth::Credentials;

    #[test]
    fn auth_encode() {
        let credentials = Credentials::new("tim", "tanstaaftanstaaf");
        assert_eq!(credentials.encode_username(), "dGlt");
        assert_eq!(credentials.encode_secret(), "dGFuc3RhYWZ0YW5zdGFhZg==");

        let credentials = Credentials::from(("", ""));
        assert_eq!(credentials.encode_username(), "");
    }

    #[test]
    fn update_credentials() {
        let mut credentials = Credentials::default();
        credentials.set_username("tim");
        credentials.set_secret("tanstaaftanstaaf");
        assert_eq!(credentials, Credentials::new("tim", "tanstaaftanstaaf"));
        assert_eq!(credentials.username(), "tim");
        assert_eq!(credentials.encode_username(), "dGlt");

        credentials.set_secret(String::from("secret"));
        assert_eq!(credentials.encode_secret(), "c2VjcmV0");
    }

    #[test]
    fn secret_is_not_logged() {
        let credentials = Credentials::new("tim", "tanstaaftanstaaf");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("tim"));
        assert!(!debug.contains("tanstaaf"));
    }
}
