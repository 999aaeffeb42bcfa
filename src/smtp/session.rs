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

use std::{io, time::Duration};

use log::{debug, info, warn};

use crate::transport::{self, client::TcpConnector, with_timeout, Connector, Transport};

use super::{
    address::bare_address,
    builder::{Encryption, MailerConfig},
    event::{Failure, Listeners},
    message::Mail,
    queue::MailQueue,
    reply::{Reply, ReplyLines},
    state::{step, LoginState, StartTlsState, State, Step},
};

/// Outcome counters of the last `send_all` cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Messages accepted by the server
    pub processed: usize,
    pub temporary_errors: usize,
    pub permanent_errors: usize,
}

#[derive(Debug, Default)]
struct Cycle {
    /// Transactions to attempt before quitting
    target: usize,
    attempted: usize,
    /// Recipients of the current message already sent
    recipients_sent: usize,
    /// Greeting, EHLO, STARTTLS and AUTH completed
    ready: bool,
}

/// Delivers a queue of messages through a single SMTP relay, one transaction
/// at a time.
pub struct Mailer<C: Connector = TcpConnector> {
    config: MailerConfig,
    connector: C,
    transport: Option<C::Stream>,
    queue: MailQueue,
    state: State,
    login: LoginState,
    start_tls: StartTlsState,
    cycle: Cycle,
    report: Report,
    listeners: Listeners,
}

impl<C: Connector> Mailer<C> {
    pub fn new(config: MailerConfig, connector: C) -> Self {
        Mailer {
            config,
            connector,
            transport: None,
            queue: MailQueue::new(),
            state: State::Disconnected,
            login: LoginState::PreLogin,
            start_tls: StartTlsState::PreStartTls,
            cycle: Cycle::default(),
            report: Report::default(),
            listeners: Listeners::default(),
        }
    }

    /// Appends a message to the queue. Messages enqueued while sending are
    /// picked up by the running cycle if it has attempts left.
    pub fn enqueue(&mut self, mail: Mail) {
        self.queue.push_back(mail);
    }

    pub fn queue(&self) -> &MailQueue {
        &self.queue
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_busy(&self) -> bool {
        self.state != State::Disconnected
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn login_state(&self) -> LoginState {
        self.login
    }

    pub fn start_tls_state(&self) -> StartTlsState {
        self.start_tls
    }

    pub fn report(&self) -> Report {
        self.report
    }

    /// Temporary and permanent error counts of the last cycle.
    pub fn last_errors(&self) -> (usize, usize) {
        (self.report.temporary_errors, self.report.permanent_errors)
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Changes take effect on the next `send_all`.
    pub fn config_mut(&mut self) -> &mut MailerConfig {
        &mut self.config
    }

    /// Called with the number of messages delivered so far in the cycle.
    pub fn on_progress(&mut self, listener: impl FnMut(usize) + 'static) {
        self.listeners.add_progress(listener);
    }

    /// Called once the connection is closed, with `true` if the queue is empty.
    pub fn on_finished(&mut self, listener: impl FnMut(bool) + 'static) {
        self.listeners.add_finished(listener);
    }

    pub fn on_error(&mut self, listener: impl FnMut(&Failure) + 'static) {
        self.listeners.add_error(listener);
    }

    /// A reply line is buffered and the next `poll` will not wait for the
    /// network.
    pub fn reply_pending(&self) -> bool {
        self.transport
            .as_ref()
            .map_or(false, |transport| transport.can_read_line())
    }

    /// Connects to the relay and starts delivering the queue.
    ///
    /// Returns `false` without doing anything if a session is already running
    /// or the queue is empty, and `false` after emitting an error event if the
    /// connection could not be established.
    pub async fn send_all(&mut self) -> bool {
        if self.is_busy() || self.queue.is_empty() {
            return false;
        }

        self.report = Report::default();
        self.cycle = Cycle {
            target: self.queue.len(),
            ..Default::default()
        };
        self.queue.begin_cycle();

        match self.connect().await {
            Ok(transport) => {
                info!(
                    "Delivering {} message(s) through {}:{}",
                    self.queue.len(),
                    self.config.host,
                    self.config.port
                );
                self.transport = Some(transport);
                self.state = State::Connected;
                true
            }
            Err(err) => {
                let failure = Failure::from(err);
                warn!(
                    "Failed to connect to {}:{}: {}",
                    self.config.host, self.config.port, failure
                );
                self.listeners.error(&failure);
                false
            }
        }
    }

    /// Sends QUIT, whatever the current state. The session ends once the
    /// server replies.
    pub async fn cancel(&mut self) {
        if self.is_busy() {
            info!("Cancelling session with {}", self.config.host);
            if let Err(err) = self.send("QUIT", State::QuitSent).await {
                self.abort(err).await;
            }
        }
    }

    /// Waits for the next complete reply and handles it.
    pub async fn poll(&mut self) {
        if !self.is_busy() {
            return;
        }

        let result = match self.transport.as_mut() {
            Some(transport) => read_reply(transport, self.config.timeout).await,
            None => Err(transport::Error::NotConnected.into()),
        };

        match result {
            Ok(reply) => {
                if let Err(err) = self.on_reply(reply).await {
                    self.abort(err).await;
                }
            }
            Err(err) => self.abort(err).await,
        }
    }

    /// Drives the session until it is disconnected.
    pub async fn block_until_idle(&mut self) {
        while self.is_busy() {
            self.poll().await;
        }
    }

    async fn connect(&mut self) -> crate::Result<C::Stream> {
        let config = &self.config;
        self.connector.ignore_self_signed(config.ignore_self_signed);

        Ok(match config.encryption {
            Encryption::ImplicitTls => {
                self.connector
                    .connect_tls(&config.host, config.port, config.timeout)
                    .await?
            }
            Encryption::None | Encryption::StartTls => {
                self.connector
                    .connect_plain(&config.host, config.port, config.timeout)
                    .await?
            }
        })
    }

    async fn on_reply(&mut self, reply: Reply) -> crate::Result<()> {
        debug!("<- {}", reply);

        if reply.is_permanent_failure() || reply.is_temporary_failure() {
            self.on_failure(reply).await
        } else {
            self.dispatch().await
        }
    }

    /// A 4xx or 5xx reply, whatever the command, counts against the message
    /// at the head of the queue.
    async fn on_failure(&mut self, reply: Reply) -> crate::Result<()> {
        let failure = Failure::Reply(reply);

        match self.state {
            State::RsetSent => {
                warn!("RSET failed: {}", failure);
                self.listeners.error(&failure);
                self.next_or_quit().await
            }
            State::QuitSent => {
                warn!("QUIT failed: {}", failure);
                self.listeners.error(&failure);
                self.disconnect().await;
                Ok(())
            }
            state => {
                self.cycle.attempted += 1;
                self.cycle.recipients_sent = 0;
                self.login = LoginState::PreLogin;

                if failure.is_permanent() {
                    self.report.permanent_errors += 1;
                    if let Some(mail) = self.queue.pop_front() {
                        warn!(
                            "Dropping message {:?} after permanent failure in state {:?}: {}",
                            mail.subject(),
                            state,
                            failure
                        );
                    }
                } else {
                    self.report.temporary_errors += 1;
                    warn!(
                        "Deferring message after temporary failure in state {:?}: {}",
                        state, failure
                    );
                    if self.queue.rotate() {
                        self.cycle.target += 1;
                    }
                }

                self.listeners.error(&failure);
                self.send("RSET", State::RsetSent).await
            }
        }
    }

    async fn dispatch(&mut self) -> crate::Result<()> {
        match step(
            self.state,
            self.login,
            self.start_tls,
            self.config.encryption,
            self.config.auth,
        ) {
            Step::UpgradeThenEhlo => {
                self.upgrade().await?;
                self.ehlo().await
            }
            Step::Ehlo => self.ehlo().await,
            Step::StartTls => {
                self.start_tls = StartTlsState::PostStartTls;
                self.send("STARTTLS", State::Connected).await
            }
            Step::AuthLogin => {
                self.login = LoginState::AuthLoginSent;
                self.send("AUTH LOGIN", State::Auth).await
            }
            Step::Username => {
                self.login = LoginState::UsernameSent;
                let username = self.config.credentials.encode_username();
                self.send_secret(&username).await
            }
            Step::Password => {
                self.login = LoginState::PasswordSent;
                let secret = self.config.credentials.encode_secret();
                self.send_secret(&secret).await
            }
            Step::MailFrom => {
                self.login = LoginState::PreLogin;
                self.cycle.ready = true;
                self.mail_from().await
            }
            Step::RcptTo => self.rcpt_to().await,
            Step::Data => self.send("DATA", State::DataSent).await,
            Step::Content => {
                let Some(mail) = self.queue.front().cloned() else {
                    return self.send("QUIT", State::QuitSent).await;
                };
                // Attachments are read from disk
                let payload = tokio::task::spawn_blocking(move || mail.wire_format())
                    .await
                    .map_err(|err| {
                        transport::Error::Io(io::Error::new(io::ErrorKind::Other, err))
                    })?;
                debug!("-> <message, {} bytes>", payload.len());
                self.write(payload.as_bytes(), State::ContentSent).await
            }
            Step::Delivered => {
                self.queue.pop_front();
                self.report.processed += 1;
                self.cycle.attempted += 1;
                self.cycle.recipients_sent = 0;
                info!("Message {} delivered", self.report.processed);
                self.listeners.progress(self.report.processed);
                self.next_or_quit().await
            }
            Step::NextOrQuit => self.next_or_quit().await,
            Step::Disconnect => {
                self.disconnect().await;
                Ok(())
            }
        }
    }

    async fn upgrade(&mut self) -> crate::Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(transport::Error::NotConnected)?;
        with_timeout(self.config.timeout, transport.upgrade_to_tls()).await.map_err(Into::into)
    }

    async fn ehlo(&mut self) -> crate::Result<()> {
        let command = format!("EHLO {}", self.config.helo_host);
        self.send(&command, State::EhloSent).await
    }

    async fn mail_from(&mut self) -> crate::Result<()> {
        let command = match self.queue.front() {
            Some(mail) => format!("MAIL FROM:<{}>", bare_address(mail.sender())),
            None => return self.send("QUIT", State::QuitSent).await,
        };
        self.send(&command, State::MailFromSent).await
    }

    async fn rcpt_to(&mut self) -> crate::Result<()> {
        let (command, count) = match self.queue.front() {
            Some(mail) => {
                let recipients = mail.all_recipients();
                (
                    recipients
                        .get(self.cycle.recipients_sent)
                        .map(|rcpt| format!("RCPT TO:<{}>", bare_address(rcpt))),
                    recipients.len(),
                )
            }
            None => (None, 0),
        };
        let Some(command) = command else {
            return match count {
                0 if !self.queue.is_empty() => {
                    self.on_failure(Reply::new(554, "No valid recipients")).await
                }
                _ => self.send("QUIT", State::QuitSent).await,
            };
        };

        self.cycle.recipients_sent += 1;
        let next = if self.cycle.recipients_sent >= count {
            self.cycle.recipients_sent = 0;
            State::ToSent
        } else {
            State::MailFromSent
        };
        self.send(&command, next).await
    }

    async fn next_or_quit(&mut self) -> crate::Result<()> {
        if !self.cycle.ready
            || self.cycle.attempted >= self.cycle.target
            || self.queue.is_empty()
        {
            self.send("QUIT", State::QuitSent).await
        } else {
            self.mail_from().await
        }
    }

    async fn send(&mut self, command: &str, next: State) -> crate::Result<()> {
        debug!("-> {}", command);
        self.write(format!("{}\r\n", command).as_bytes(), next).await
    }

    async fn send_secret(&mut self, secret: &str) -> crate::Result<()> {
        debug!("-> <redacted>");
        self.write(format!("{}\r\n", secret).as_bytes(), State::Auth).await
    }

    async fn write(&mut self, bytes: &[u8], next: State) -> crate::Result<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(transport::Error::NotConnected)?;
        with_timeout(self.config.timeout, transport.write_all(bytes)).await?;
        self.state = next;
        Ok(())
    }

    /// Closes the connection without QUIT after a transport error.
    async fn abort(&mut self, err: crate::Error) {
        let failure = Failure::from(err);
        warn!(
            "Connection to {}:{} lost in state {:?}: {}",
            self.config.host, self.config.port, self.state, failure
        );
        self.listeners.error(&failure);
        self.disconnect().await;
    }

    async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.disconnect().await;
        }

        self.state = State::Disconnected;
        self.login = LoginState::PreLogin;
        self.start_tls = StartTlsState::PreStartTls;
        self.cycle = Cycle::default();

        info!(
            "Disconnected from {}:{}, {} message(s) left in queue",
            self.config.host,
            self.config.port,
            self.queue.len()
        );
        self.listeners.finished(self.queue.is_empty());
    }
}

async fn read_lines<T: Transport>(transport: &mut T) -> crate::Result<Reply> {
    let mut lines = ReplyLines::default();

    loop {
        let line = transport.read_line().await?;
        if let Some(reply) = lines.feed(&line)? {
            return Ok(reply);
        }
    }
}

async fn read_reply<T: Transport>(
    transport: &mut T,
    timeout: Option<Duration>,
) -> crate::Result<Reply> {
    with_timeout(timeout, read_lines(transport)).await
}
