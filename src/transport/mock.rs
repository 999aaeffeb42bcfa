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

//! In-memory relay replaying a script of replies, one per command.

use std::{cell::RefCell, collections::VecDeque, io, rc::Rc, time::Duration};

use super::{Connector, Error, Transport};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Action {
    Reply(&'static str),
    Drop,
}

#[derive(Debug, Default)]
pub(crate) struct Server {
    script: VecDeque<Action>,
    pending: VecDeque<String>,
    closed: bool,
    pub written: Vec<String>,
    pub refuse: bool,
    pub fail_tls: bool,
    pub fail_upgrade: bool,
    pub ignore_self_signed: bool,
    pub connections: usize,
    pub disconnections: usize,
}

impl Server {
    /// Makes the next scripted action visible to the client.
    fn serve(&mut self) {
        match self.script.pop_front() {
            Some(Action::Reply(reply)) => {
                self.pending.extend(
                    reply
                        .split_inclusive('\n')
                        .map(|line| line.to_string()),
                );
            }
            Some(Action::Drop) => self.closed = true,
            None => (),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct MockConnector {
    server: Rc<RefCell<Server>>,
}

#[derive(Debug)]
pub(crate) struct MockStream {
    server: Rc<RefCell<Server>>,
}

impl MockConnector {
    pub fn new(script: impl IntoIterator<Item = Action>) -> Self {
        let connector = MockConnector::default();
        connector.server.borrow_mut().script = script.into_iter().collect();
        connector
    }

    /// Replies in order, the first one being the greeting.
    pub fn replies(replies: impl IntoIterator<Item = &'static str>) -> Self {
        Self::new(replies.into_iter().map(Action::Reply))
    }

    pub fn server(&self) -> std::cell::RefMut<'_, Server> {
        self.server.borrow_mut()
    }

    /// Everything the client wrote, one entry per write, without the
    /// trailing CRLF.
    pub fn written(&self) -> Vec<String> {
        self.server.borrow().written.clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.written()
            .into_iter()
            .map(|command| {
                command
                    .split_once(' ')
                    .map_or(command.clone(), |(verb, _)| verb.to_string())
            })
            .collect()
    }

    fn open(&mut self) -> super::Result<MockStream> {
        let mut server = self.server.borrow_mut();
        if server.refuse {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "Connection refused",
            )));
        }
        server.connections += 1;
        server.closed = false;
        server.pending.clear();
        server.serve();
        Ok(MockStream {
            server: self.server.clone(),
        })
    }
}

impl Connector for MockConnector {
    type Stream = MockStream;

    async fn connect_plain(
        &mut self,
        _host: &str,
        _port: u16,
        _timeout: Option<Duration>,
    ) -> super::Result<MockStream> {
        self.open()
    }

    async fn connect_tls(
        &mut self,
        _host: &str,
        _port: u16,
        _timeout: Option<Duration>,
    ) -> super::Result<MockStream> {
        if self.server.borrow().fail_tls {
            return Err(Error::Tls(rustls::Error::InvalidCertificate(
                rustls::CertificateError::UnknownIssuer,
            )));
        }
        self.open()
    }

    fn ignore_self_signed(&mut self, ignore: bool) {
        self.server.borrow_mut().ignore_self_signed = ignore;
    }
}

impl Transport for MockStream {
    async fn upgrade_to_tls(&mut self) -> super::Result<()> {
        let mut server = self.server.borrow_mut();
        if server.fail_upgrade {
            return Err(Error::Tls(rustls::Error::General(
                "handshake failure".to_string(),
            )));
        }
        server.written.push("<TLS>".to_string());
        Ok(())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> super::Result<()> {
        let mut server = self.server.borrow_mut();
        if server.closed {
            return Err(Error::Closed);
        }
        let text = String::from_utf8_lossy(bytes);
        server
            .written
            .push(text.strip_suffix("\r\n").unwrap_or(&text).to_string());
        server.serve();
        Ok(())
    }

    fn can_read_line(&self) -> bool {
        !self.server.borrow().pending.is_empty()
    }

    async fn read_line(&mut self) -> super::Result<String> {
        let mut server = self.server.borrow_mut();
        match server.pending.pop_front() {
            Some(line) => Ok(line),
            None if server.closed => Err(Error::Closed),
            None => Err(Error::Timeout),
        }
    }

    async fn disconnect(&mut self) {
        self.server.borrow_mut().disconnections += 1;
    }
}
