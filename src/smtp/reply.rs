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

use smtp_proto::{
    response::parser::{ResponseReceiver, MAX_RESPONSE_LENGTH as MAX_REPONSE_LENGTH},
    Response,
};

/// A complete SMTP reply. Every line of a multi-line reply is kept, the code
/// is the one of the last line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    message: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Reply {
            code,
            message: vec![message.into()],
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &[String] {
        &self.message
    }

    /// All reply lines joined by a single space.
    pub fn text(&self) -> String {
        self.message.join(" ")
    }

    pub fn is_permanent_failure(&self) -> bool {
        self.code / 100 == 5
    }

    pub fn is_temporary_failure(&self) -> bool {
        self.code / 100 == 4
    }

    fn append(&mut self, response: Response<String>) {
        self.code = response.code();
        self.message.extend(
            response
                .message()
                .split('\n')
                .map(|line| line.trim_end_matches('\r'))
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
}

impl From<Response<String>> for Reply {
    fn from(response: Response<String>) -> Self {
        let mut reply = Reply {
            code: 0,
            message: Vec::new(),
        };
        reply.append(response);
        reply
    }
}

impl Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.text())
    }
}

/// Collects the lines of one reply.
#[derive(Debug, Default)]
pub(crate) struct ReplyLines {
    reply: Option<Reply>,
    len: usize,
}

impl ReplyLines {
    /// Feeds one line, terminator included. Returns the reply once its last
    /// line has been read.
    pub fn feed(&mut self, line: &str) -> crate::Result<Option<Reply>> {
        self.len += line.len();
        if self.len > MAX_REPONSE_LENGTH {
            *self = ReplyLines::default();
            return Err(crate::Error::UnparseableReply);
        }

        // Each line is parsed on its own so that the codes may differ
        let mut bytes = line.as_bytes().to_vec();
        let is_last = bytes.get(3) != Some(&b'-');
        if !is_last {
            bytes[3] = b' ';
        }

        match ResponseReceiver::default().parse(&mut bytes.iter()) {
            Ok(response) => match &mut self.reply {
                Some(reply) => reply.append(response),
                None => self.reply = Some(response.into()),
            },
            Err(_) => {
                *self = ReplyLines::default();
                return Err(crate::Error::UnparseableReply);
            }
        }

        if is_last {
            self.len = 0;
            Ok(self.reply.take())
        } else {
            Ok(None)
        }
    }
}
