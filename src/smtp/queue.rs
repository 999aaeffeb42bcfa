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

use std::collections::VecDeque;

use super::message::Mail;

#[derive(Debug, Clone)]
struct Queued {
    mail: Mail,
    deferred: bool,
}

/// Pending messages, delivered front to back.
#[derive(Debug, Default, Clone)]
pub struct MailQueue {
    entries: VecDeque<Queued>,
}

impl MailQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, mail: Mail) {
        self.entries.push_back(Queued {
            mail,
            deferred: false,
        });
    }

    pub fn pop_front(&mut self) -> Option<Mail> {
        self.entries.pop_front().map(|entry| entry.mail)
    }

    pub fn front(&self) -> Option<&Mail> {
        self.entries.front().map(|entry| &entry.mail)
    }

    /// Moves the front message to the back of the queue.
    ///
    /// Returns `true` if the message had not been deferred yet during the current
    /// sending cycle.
    pub fn rotate(&mut self) -> bool {
        match self.entries.pop_front() {
            Some(mut entry) => {
                let first = !entry.deferred;
                entry.deferred = true;
                self.entries.push_back(entry);
                first
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mail> {
        self.entries.iter().map(|entry| &entry.mail)
    }

    pub(crate) fn begin_cycle(&mut self) {
        for entry in &mut self.entries {
            entry.deferred = false;
        }
    }
}
