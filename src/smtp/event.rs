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

use std::fmt::Display;

use super::reply::Reply;

/// Code reported for connection failures.
pub const CONNECTION_FAILURE: u16 = 0;

/// Code reported for TLS failures.
pub const TLS_FAILURE: u16 = 1;

/// Payload of the error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Connection(String),
    Tls(String),
    Reply(Reply),
}

impl Failure {
    /// `0` for connection failures, `1` for TLS failures, otherwise the SMTP
    /// reply code.
    pub fn code(&self) -> u16 {
        match self {
            Failure::Connection(_) => CONNECTION_FAILURE,
            Failure::Tls(_) => TLS_FAILURE,
            Failure::Reply(reply) => reply.code(),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Failure::Connection(message) | Failure::Tls(message) => message.clone(),
            Failure::Reply(reply) => reply.text(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Failure::Reply(reply) if reply.is_temporary_failure())
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Failure::Reply(reply) if reply.is_permanent_failure())
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.message())
    }
}

impl From<crate::Error> for Failure {
    fn from(err: crate::Error) -> Self {
        match &err {
            crate::Error::Transport(inner) if inner.is_tls() => Failure::Tls(err.to_string()),
            _ => Failure::Connection(err.to_string()),
        }
    }
}

impl From<Reply> for Failure {
    fn from(reply: Reply) -> Self {
        Failure::Reply(reply)
    }
}

type ProgressListener = Box<dyn FnMut(usize)>;
type FinishedListener = Box<dyn FnMut(bool)>;
type ErrorListener = Box<dyn FnMut(&Failure)>;

#[derive(Default)]
pub(crate) struct Listeners {
    progress: Vec<ProgressListener>,
    finished: Vec<FinishedListener>,
    error: Vec<ErrorListener>,
}

impl Listeners {
    pub fn add_progress(&mut self, listener: impl FnMut(usize) + 'static) {
        self.progress.push(Box::new(listener));
    }

    pub fn add_finished(&mut self, listener: impl FnMut(bool) + 'static) {
        self.finished.push(Box::new(listener));
    }

    pub fn add_error(&mut self, listener: impl FnMut(&Failure) + 'static) {
        self.error.push(Box::new(listener));
    }

    pub fn progress(&mut self, processed: usize) {
        for listener in &mut self.progress {
            listener(processed);
        }
    }

    pub fn finished(&mut self, queue_empty: bool) {
        for listener in &mut self.finished {
            listener(queue_empty);
        }
    }

    pub fn error(&mut self, failure: &Failure) {
        for listener in &mut self.error {
            listener(failure);
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("progress", &self.progress.len())
            .field("finished", &self.finished.len())
            .field("error", &self.error.len())
            .finish()
    }
}
