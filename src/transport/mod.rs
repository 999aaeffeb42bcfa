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

use std::{fmt::Display, future::Future, io, time::Duration};

pub mod client;
pub mod stream;
pub mod tls;

#[cfg(test)]
pub(crate) mod mock;

/// Opens connections to the relay.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Stream: Transport;

    /// Opens a plain text connection.
    async fn connect_plain(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self::Stream>;

    /// Opens a connection and performs the TLS handshake right away.
    async fn connect_tls(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> Result<Self::Stream>;

    /// Whether self-signed server certificates are accepted by the next
    /// handshake.
    fn ignore_self_signed(&mut self, ignore: bool);
}

/// A line oriented, bidirectional byte stream.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Performs a TLS handshake over the existing connection.
    async fn upgrade_to_tls(&mut self) -> Result<()>;

    async fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// A complete line is buffered and can be read without waiting.
    fn can_read_line(&self) -> bool;

    /// Reads one line, including its line terminator. Waits until the line
    /// is available.
    async fn read_line(&mut self) -> Result<String>;

    async fn disconnect(&mut self);
}

#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(io::Error),

    /// TLS error
    Tls(rustls::Error),

    /// Invalid TLS name provided
    InvalidTLSName,

    /// Connection or reply timeout
    Timeout,

    /// Connection closed by the server
    Closed,

    /// Operation on a transport that is not connected
    NotConnected,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// TLS failures are reported apart from connection failures.
    pub fn is_tls(&self) -> bool {
        matches!(self, Error::Tls(_) | Error::InvalidTLSName)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Tls(e) => write!(f, "TLS error: {}", e),
            Error::InvalidTLSName => write!(f, "Invalid TLS name provided"),
            Error::Timeout => write!(f, "Connection timeout"),
            Error::Closed => write!(f, "Connection closed by remote host"),
            Error::NotConnected => write!(f, "Not connected"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

/// Runs `fut`, giving up after `timeout` unless it is `None`.
pub(crate) async fn with_timeout<T, E>(
    timeout: Option<Duration>,
    fut: impl Future<Output = std::result::Result<T, E>>,
) -> std::result::Result<T, E>
where
    E: From<Error>,
{
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| E::from(Error::Timeout))?,
        None => fut.await,
    }
}
