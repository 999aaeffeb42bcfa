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

//! # mail-queue
//!
//! _mail-queue_ is a Rust library that delivers a queue of e-mail messages through a single
//! SMTP relay. It includes the following features:
//!
//! - Generates plain or **MIME** multipart messages (_RFC 2045 - 2049_) with base64 encoded
//!   file attachments and folded recipient headers (_RFC 5322_).
//! - Simple Mail Transfer Protocol (**SMTP**; _RFC 5321_) delivery, including the
//!   transparency procedure (dot-stuffing).
//! - Plain text, implicit **TLS** and SMTP Service Extension for Secure SMTP over TLS
//!   (**STARTTLS**; _RFC 3207_).
//! - SMTP Service Extension for Authentication (_RFC 4954_) using the `LOGIN` mechanism.
//! - Per-message failure classification: temporary failures (`4xx`) are requeued,
//!   permanent failures (`5xx`) are dropped, and sending continues with the next message.
//! - Event driven: progress, error and completion events are delivered to registered
//!   listeners while the session runs.
//! - Full async (requires Tokio).
//!
//! ## Usage Example
//!
//! Send two messages via an SMTP server that requires authentication:
//!
//! ```rust
//!     let mut mailer = MailerBuilder::new("smtp.example.com", 587)
//!         .encryption(Encryption::StartTls)
//!         .credentials("john", "p4ssw0rd")
//!         .build();
//!
//!     mailer.on_progress(|sent| println!("{sent} message(s) delivered"));
//!     mailer.on_error(|failure| eprintln!("{failure}"));
//!
//!     mailer.enqueue(
//!         Mail::builder()
//!             .from("John Doe <john@example.com>")
//!             .to("Jane Doe <jane@example.com>")
//!             .subject("Hi!")
//!             .body("Hello world!")
//!             .build()
//!             .unwrap(),
//!     );
//!     mailer.enqueue(
//!         Mail::builder()
//!             .from("john@example.com")
//!             .to("james@test.com")
//!             .cc("jane@example.com")
//!             .subject("Howdy!")
//!             .body("These pretzels are making me thirsty.")
//!             .attachment("./pretzels.png")
//!             .build()
//!             .unwrap(),
//!     );
//!
//!     if mailer.send_all().await {
//!         mailer.block_until_idle().await;
//!     }
//! ```
//!
//! Messages that failed temporarily remain in the queue and are retried by the next call to
//! `send_all`.
//!
//! ## Testing
//!
//! To run the testsuite:
//!
//! ```bash
//!  $ cargo test --all-features
//! ```
//!
//! ## License
//!
//! Licensed under either of
//!
//!  * Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
//!  * MIT license ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)
//!
//! at your option.
//!

pub mod smtp;
#[forbid(unsafe_code)]
pub mod transport;

use std::fmt::Display;

pub use smtp::{
    address::bare_address,
    auth::{AuthMode, Credentials},
    builder::{Encryption, MailerBuilder, MailerConfig},
    event::Failure,
    message::{Mail, MailBuilder},
    queue::MailQueue,
    reply::Reply,
    session::{Mailer, Report},
    state::{LoginState, StartTlsState, State},
};
pub use transport::{client::TcpConnector, Connector, Transport};

#[derive(Debug)]
pub enum Error {
    /// Transport failure (I/O, TLS, timeout)
    Transport(transport::Error),

    /// Failure parsing SMTP reply
    UnparseableReply,

    /// Missing message recipients.
    MissingRcptTo,

    /// Timeout below the "no timeout" sentinel (-1).
    InvalidTimeout(i64),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Transport(e) => e.fmt(f),
            Error::UnparseableReply => write!(f, "Unparseable SMTP reply"),
            Error::MissingRcptTo => write!(f, "Missing message recipients"),
            Error::InvalidTimeout(ms) => write!(f, "Invalid timeout: {} ms", ms),
        }
    }
}

impl std::error::Error for Error {}

impl From<transport::Error> for Error {
    fn from(err: transport::Error) -> Self {
        Error::Transport(err)
    }
}
