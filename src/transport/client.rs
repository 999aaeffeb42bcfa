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

use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use super::{
    stream::Stream,
    tls::{build_tls_connector, into_tls},
    with_timeout, Connector, Error, Transport,
};

/// Connects over TCP, using rustls for implicit TLS and STARTTLS.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    ignore_self_signed: bool,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A TCP connection, optionally upgraded to TLS.
pub struct TcpTransport {
    stream: Stream,
    buf: Vec<u8>,
    hostname: String,
    tls_connector: TlsConnector,
}

impl Connector for TcpConnector {
    type Stream = TcpTransport;

    async fn connect_plain(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> super::Result<TcpTransport> {
        let tls_connector = build_tls_connector(self.ignore_self_signed)?;
        let stream = with_timeout(timeout, async {
            TcpStream::connect((host, port)).await.map_err(Error::from)
        })
        .await?;

        log::info!("Connected to {}:{}", host, port);

        Ok(TcpTransport {
            stream: Stream::Basic(stream),
            buf: Vec::with_capacity(1024),
            hostname: host.to_string(),
            tls_connector,
        })
    }

    async fn connect_tls(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> super::Result<TcpTransport> {
        let tls_connector = build_tls_connector(self.ignore_self_signed)?;
        let stream = with_timeout(timeout, async {
            let stream = TcpStream::connect((host, port))
                .await
                .map_err(Error::from)?;
            into_tls(&tls_connector, host, stream).await
        })
        .await?;

        log::info!("Connected to {}:{} over TLS", host, port);

        Ok(TcpTransport {
            stream: Stream::Tls(stream),
            buf: Vec::with_capacity(1024),
            hostname: host.to_string(),
            tls_connector,
        })
    }

    fn ignore_self_signed(&mut self, ignore: bool) {
        self.ignore_self_signed = ignore;
    }
}

impl TcpTransport {
    pub fn is_secure(&self) -> bool {
        self.stream.is_secure()
    }

    fn take_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&ch| ch == b'\n')?;
        let line = String::from_utf8_lossy(&self.buf[..=pos]).into_owned();
        self.buf.drain(..=pos);
        Some(line)
    }
}

impl Transport for TcpTransport {
    async fn upgrade_to_tls(&mut self) -> super::Result<()> {
        match std::mem::take(&mut self.stream) {
            Stream::Basic(stream) => {
                // Anything buffered before the handshake is plain text
                self.buf.clear();
                self.stream =
                    Stream::Tls(into_tls(&self.tls_connector, &self.hostname, stream).await?);
                log::info!("Upgraded connection to {} to TLS", self.hostname);
                Ok(())
            }
            stream @ Stream::Tls(_) => {
                self.stream = stream;
                Ok(())
            }
            Stream::None => Err(Error::NotConnected),
        }
    }

    async fn write_all(&mut self, bytes: &[u8]) -> super::Result<()> {
        self.stream.write_all(bytes).await
    }

    fn can_read_line(&self) -> bool {
        self.buf.contains(&b'\n')
    }

    async fn read_line(&mut self) -> super::Result<String> {
        let mut chunk = [0u8; 1024];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            match self.stream.read(&mut chunk).await? {
                0 => return Err(Error::Closed),
                br => self.buf.extend_from_slice(&chunk[..br]),
            }
        }
    }

    async fn disconnect(&mut self) {
        if self.stream.is_connected() {
            std::mem::take(&mut self.stream).shutdown().await;
            log::info!("Disconnected from {}", self.hostname);
        }
        self.buf.clear();
    }
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc, time::Duration};

    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::TcpListener,
    };

    use crate::{
        transport::{Connector, Error, Transport},
        Mail, MailerBuilder, State,
    };

    use super::TcpConnector;

    #[tokio::test]
    async fn read_lines() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            stream
                .write_all(b"220-mx.example.com\r\n220 ready\r\n")
                .await
                .unwrap();
            let mut line = String::new();
            BufReader::new(&mut stream).read_line(&mut line).await.unwrap();
            line
        });

        let mut transport = TcpConnector::new()
            .connect_plain("127.0.0.1", port, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert!(!transport.is_secure());
        assert_eq!(transport.read_line().await.unwrap(), "220-mx.example.com\r\n");
        assert!(transport.can_read_line());
        assert_eq!(transport.read_line().await.unwrap(), "220 ready\r\n");
        assert!(!transport.can_read_line());

        transport.write_all(b"QUIT\r\n").await.unwrap();
        assert_eq!(server.await.unwrap(), "QUIT\r\n");
        assert!(matches!(transport.read_line().await, Err(Error::Closed)));

        transport.disconnect().await;
        assert!(matches!(
            transport.write_all(b"NOOP\r\n").await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(matches!(
            TcpConnector::new()
                .connect_plain("127.0.0.1", port, Some(Duration::from_secs(5)))
                .await,
            Err(Error::Io(_))
        ));
    }

    #[tokio::test]
    async fn loopback_session() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut reader = BufReader::new(reader);
            let mut commands = Vec::new();
            let mut in_data = false;

            writer.write_all(b"220 localhost ESMTP\r\n").await.unwrap();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                let line = line.trim_end().to_string();
                if in_data {
                    if line == "." {
                        in_data = false;
                        writer.write_all(b"250 2.0.0 Queued\r\n").await.unwrap();
                    }
                    continue;
                }
                let reply: &[u8] = match line.as_str() {
                    cmd if cmd.starts_with("EHLO") => b"250-localhost\r\n250 8BITMIME\r\n",
                    "DATA" => {
                        in_data = true;
                        b"354 Start mail input\r\n"
                    }
                    "QUIT" => b"221 Bye\r\n",
                    _ => b"250 OK\r\n",
                };
                commands.push(line);
                writer.write_all(reply).await.unwrap();
            }
            commands
        });

        let mut mailer = MailerBuilder::new("127.0.0.1", port)
            .helo_host("client.example.com")
            .timeout(Duration::from_secs(5))
            .build();
        let finished = Rc::new(RefCell::new(Vec::new()));
        let finished_ = finished.clone();
        mailer.on_finished(move |empty| finished_.borrow_mut().push(empty));

        mailer.enqueue(
            Mail::builder()
                .from("John Doe <john@example.com>")
                .to("Jane Doe <jane@example.com>")
                .subject("Hi!")
                .body("Hello world!")
                .build()
                .unwrap(),
        );
        assert!(mailer.send_all().await);
        mailer.block_until_idle().await;

        assert_eq!(mailer.state(), State::Disconnected);
        assert_eq!(mailer.report().processed, 1);
        assert!(mailer.queue().is_empty());
        assert_eq!(*finished.borrow(), [true]);
        assert_eq!(
            server.await.unwrap(),
            [
                "EHLO client.example.com",
                "MAIL FROM:<john@example.com>",
                "RCPT TO:<jane@example.com>",
                "DATA",
                "QUIT"
            ]
        );
    }
}
