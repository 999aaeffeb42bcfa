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

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::client::TlsStream;

#[allow(clippy::large_enum_variant)]
#[doc(hidden)]
#[derive(Default)]
pub enum Stream {
    Basic(TcpStream),
    Tls(TlsStream<TcpStream>),
    #[default]
    None,
}

impl Stream {
    pub(crate) async fn read(&mut self, buf: &mut [u8]) -> super::Result<usize> {
        match self {
            Stream::Basic(stream) => Ok(stream.read(buf).await?),
            Stream::Tls(stream) => Ok(stream.read(buf).await?),
            Stream::None => Err(super::Error::NotConnected),
        }
    }

    pub(crate) async fn write_all(&mut self, bytes: &[u8]) -> super::Result<()> {
        match self {
            Stream::Basic(stream) => stream.write_all(bytes).await?,
            Stream::Tls(stream) => stream.write_all(bytes).await?,
            Stream::None => return Err(super::Error::NotConnected),
        }
        self.flush().await
    }

    pub(crate) async fn flush(&mut self) -> super::Result<()> {
        match self {
            Stream::Basic(stream) => stream.flush().await?,
            Stream::Tls(stream) => stream.flush().await?,
            Stream::None => (),
        }
        Ok(())
    }

    pub(crate) async fn shutdown(&mut self) {
        let _ = match self {
            Stream::Basic(stream) => stream.shutdown().await,
            Stream::Tls(stream) => stream.shutdown().await,
            Stream::None => Ok(()),
        };
    }

    pub fn is_secure(&self) -> bool {
        matches!(self, Stream::Tls(_))
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self, Stream::None)
    }
}
