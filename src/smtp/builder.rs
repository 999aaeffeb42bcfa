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

use std::time::Duration;

use crate::{
    transport::{client::TcpConnector, Connector},
    Mailer,
};

use super::auth::{AuthMode, Credentials};

pub const DEFAULT_PORT: u16 = 25;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encryption {
    /// Plain text for the whole session
    #[default]
    None,

    /// TLS from the first byte (SMTPS)
    ImplicitTls,

    /// Plain text upgraded with STARTTLS after the first EHLO
    StartTls,
}

#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub host: String,
    pub port: u16,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    pub encryption: Encryption,
    pub auth: AuthMode,
    pub credentials: Credentials,
    pub ignore_self_signed: bool,
    /// Name sent with EHLO.
    pub helo_host: String,
}

impl MailerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        MailerConfig {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: Some(DEFAULT_TIMEOUT),
            encryption: Encryption::None,
            auth: AuthMode::None,
            credentials: Credentials::default(),
            ignore_self_signed: false,
            helo_host: local_host_name(),
        }
    }

    /// Sets the timeout in milliseconds, `-1` disables it. Anything below `-1`
    /// is rejected and leaves the current timeout untouched.
    pub fn set_timeout_millis(&mut self, millis: i64) -> crate::Result<()> {
        self.timeout = match millis {
            -1 => None,
            millis if millis >= 0 => Some(Duration::from_millis(millis as u64)),
            millis => return Err(crate::Error::InvalidTimeout(millis)),
        };
        Ok(())
    }
}

pub(crate) fn local_host_name() -> String {
    gethostname::gethostname()
        .to_str()
        .unwrap_or("[127.0.0.1]")
        .to_string()
}

/// Builder for [`Mailer`].
#[derive(Debug, Clone)]
pub struct MailerBuilder {
    config: MailerConfig,
}

impl MailerBuilder {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let mut config = MailerConfig::new(host);
        config.port = port;
        MailerBuilder { config }
    }

    /// Plain text, implicit TLS or STARTTLS
    pub fn encryption(mut self, encryption: Encryption) -> Self {
        self.config.encryption = encryption;
        self
    }

    /// Authenticate with AUTH LOGIN using the provided credentials.
    pub fn credentials(mut self, username: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.auth = AuthMode::Login;
        self.config.credentials = Credentials::new(username, secret);
        self
    }

    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.config.auth = auth;
        self
    }

    /// Sets the SMTP connection timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Wait forever for connections and replies
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Sets the timeout in milliseconds, `-1` meaning no timeout.
    pub fn timeout_millis(mut self, millis: i64) -> crate::Result<Self> {
        self.config.set_timeout_millis(millis)?;
        Ok(self)
    }

    /// Accept self-signed server certificates
    pub fn ignore_self_signed(mut self, ignore: bool) -> Self {
        self.config.ignore_self_signed = ignore;
        self
    }

    /// Set the EHLO hostname
    pub fn helo_host(mut self, host: impl Into<String>) -> Self {
        self.config.helo_host = host.into();
        self
    }

    pub fn config(self) -> MailerConfig {
        self.config
    }

    /// Builds a mailer using TCP and rustls.
    pub fn build(self) -> Mailer<TcpConnector> {
        Mailer::new(self.config, TcpConnector::default())
    }

    /// Builds a mailer over a custom transport.
    pub fn build_with<C: Connector>(self, connector: C) -> Mailer<C> {
        Mailer::new(self.config, connector)
    }
}
