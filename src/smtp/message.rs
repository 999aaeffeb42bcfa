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

use std::{fmt::Write, path::PathBuf};

use super::mime::{
    encode_file, file_name, fold_recipients, mime_type, normalize_line_breaks, transparency,
    BOUNDARY,
};

/// An outbound e-mail message. Immutable once built, always has at least
/// one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    sender: String,
    subject: String,
    body: String,
    attachments: Vec<PathBuf>,
}

/// Builder for [`Mail`].
#[derive(Debug, Clone)]
pub struct MailBuilder {
    mail: Mail,
}

impl Default for MailBuilder {
    fn default() -> Self {
        MailBuilder {
            mail: Mail {
                to: Vec::new(),
                cc: Vec::new(),
                bcc: Vec::new(),
                sender: String::new(),
                subject: String::new(),
                body: String::new(),
                attachments: Vec::new(),
            },
        }
    }
}

impl Mail {
    /// Create a new message builder.
    pub fn builder() -> MailBuilder {
        MailBuilder::default()
    }

    /// Create a new message without attachments.
    pub fn new<T, U>(
        to: U,
        sender: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> crate::Result<Self>
    where
        T: Into<String>,
        U: IntoIterator<Item = T>,
    {
        to.into_iter()
            .fold(MailBuilder::default(), |builder, rcpt| builder.to(rcpt))
            .from(sender)
            .subject(subject)
            .body(body)
            .build()
    }

    pub fn to_recipients(&self) -> &[String] {
        &self.to
    }

    pub fn cc_recipients(&self) -> &[String] {
        &self.cc
    }

    pub fn bcc_recipients(&self) -> &[String] {
        &self.bcc
    }

    /// To, Cc and Bcc recipients, in that order.
    pub fn all_recipients(&self) -> Vec<&str> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(String::as_str)
            .collect()
    }

    /// The sender as provided, possibly decorated.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn attachments(&self) -> &[PathBuf] {
        &self.attachments
    }

    /// Builds the DATA payload, dot-stuffed and terminated by a line holding a
    /// single `.`.
    pub fn wire_format(&self) -> String {
        let mut message = String::with_capacity(self.body.len() + 256);

        for (header, addresses) in [("To: ", &self.to), ("Cc: ", &self.cc), ("Bcc: ", &self.bcc)] {
            if !addresses.is_empty() {
                message.push_str(&fold_recipients(header, addresses));
            }
        }

        let _ = write!(message, "From: {}\r\n", self.sender);
        let _ = write!(message, "Subject: {}\r\n", self.subject);

        if !self.attachments.is_empty() {
            message.push_str("MIME-Version: 1.0\r\n");
            let _ = write!(
                message,
                "Content-type: multipart/mixed; boundary=\"{BOUNDARY}\"\r\n\r\n--{BOUNDARY}\r\n"
            );
        }

        message.push_str("\r\n");
        message.push_str(&normalize_line_breaks(&self.body));
        message.push_str("\r\n");

        if !self.attachments.is_empty() {
            let _ = write!(message, "--{BOUNDARY}\r\n");
            for (pos, path) in self.attachments.iter().enumerate() {
                let name = file_name(path);
                let _ = write!(
                    message,
                    "Content-type: {}; name={}\r\n",
                    mime_type(path),
                    name
                );
                message.push_str("Content-Transfer-Encoding: base64\r\n");
                let _ = write!(
                    message,
                    "Content-Disposition: attachment; filename={}\r\n\r\n",
                    name
                );
                message.push_str(&encode_file(path));
                let _ = write!(message, "\r\n--{BOUNDARY}");
                if pos + 1 == self.attachments.len() {
                    message.push_str("--");
                }
                message.push_str("\r\n");
            }
        }

        transparency(&message)
    }
}

impl MailBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primary recipient.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.mail.to.push(address.into());
        self
    }

    /// Add a carbon-copy recipient.
    pub fn cc(mut self, address: impl Into<String>) -> Self {
        self.mail.cc.push(address.into());
        self
    }

    /// Add a blind carbon-copy recipient.
    pub fn bcc(mut self, address: impl Into<String>) -> Self {
        self.mail.bcc.push(address.into());
        self
    }

    /// Set the sender of the message.
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.mail.sender = address.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.mail.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.mail.body = body.into();
        self
    }

    /// Attach a file. The file is read when the message is sent.
    pub fn attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.mail.attachments.push(path.into());
        self
    }

    /// Builds the message, failing if it has no recipients at all.
    pub fn build(self) -> crate::Result<Mail> {
        if self.mail.to.is_empty() && self.mail.cc.is_empty() && self.mail.bcc.is_empty() {
            return Err(crate::Error::MissingRcptTo);
        }
        Ok(self.mail)
    }

    #[cfg(test)]
    pub(crate) fn build_unchecked(self) -> Mail {
        self.mail
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use crate::smtp::mime::{BOUNDARY, MAX_LINE_LENGTH};

    use super::Mail;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mail-queue-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn plain_message() {
        let mail = Mail::builder()
            .to("Jane Doe <jane@example.com>")
            .from("John Doe <john@example.com>")
            .subject("Hi!")
            .body("Hello world!")
            .build()
            .unwrap();

        assert_eq!(
            mail.wire_format(),
            concat!(
                "To: Jane Doe <jane@example.com>\r\n",
                "From: John Doe <john@example.com>\r\n",
                "Subject: Hi!\r\n",
                "\r\n",
                "Hello world!\r\n",
                ".\r\n"
            )
        );
    }

    #[test]
    fn recipient_headers() {
        let mail = Mail::builder()
            .to("jane@example.com")
            .bcc("audit@example.com")
            .cc("james@test.com")
            .cc("john@test.com")
            .from("john@example.com")
            .body("")
            .build()
            .unwrap();

        assert_eq!(
            mail.all_recipients(),
            [
                "jane@example.com",
                "james@test.com",
                "john@test.com",
                "audit@example.com"
            ]
        );
        assert!(mail.wire_format().starts_with(concat!(
            "To: jane@example.com\r\n",
            "Cc: james@test.com,john@test.com\r\n",
            "Bcc: audit@example.com\r\n",
            "From: john@example.com\r\n"
        )));

        let mail = Mail::builder().cc("james@test.com").build().unwrap();
        let wire = mail.wire_format();
        assert!(!wire.contains("To:"));
        assert!(!wire.contains("Bcc:"));
    }

    #[test]
    fn folded_recipients() {
        let mut builder = Mail::builder().from("john@example.com");
        for i in 0..10 {
            builder = builder.to(format!("Recipient Number {i} <recipient{i}@example.com>"));
        }
        let wire = builder.build().unwrap().wire_format();
        let header = wire.split("\r\nFrom:").next().unwrap();
        let lines = header.split("\r\n").collect::<Vec<_>>();

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.len() <= MAX_LINE_LENGTH, "{line:?}");
        }
        for line in &lines[1..] {
            assert!(line.starts_with(' ') && !line.starts_with("  "), "{line:?}");
        }
    }

    #[test]
    fn dot_stuffing() {
        let mail = Mail::new(
            ["jane@example.com"],
            "john@example.com",
            "Dots",
            "first\r\n.\r\n.second\nlast",
        )
        .unwrap();

        assert!(mail
            .wire_format()
            .ends_with("\r\nfirst\r\n..\r\n..second\r\nlast\r\n.\r\n"));
    }

    #[test]
    fn attachments() {
        let text = temp_file("notes.txt", &[b'x'; 200]);
        let data = temp_file("data.bin", &(0..=255u8).collect::<Vec<_>>());

        let mail = Mail::builder()
            .to("jane@example.com")
            .from("john@example.com")
            .subject("Files")
            .body("See attached.")
            .attachment(&text)
            .attachment(&data)
            .build()
            .unwrap();
        let wire = mail.wire_format();
        let text_name = text.file_name().unwrap().to_string_lossy().into_owned();

        assert!(wire.contains(&format!(
            "MIME-Version: 1.0\r\nContent-type: multipart/mixed; boundary=\"{BOUNDARY}\"\r\n\r\n--{BOUNDARY}\r\n\r\nSee attached.\r\n--{BOUNDARY}\r\n"
        )));
        assert!(wire.contains(&format!(
            "Content-type: text/plain; name={text_name}\r\nContent-Transfer-Encoding: base64\r\nContent-Disposition: attachment; filename={text_name}\r\n\r\n"
        )));
        assert_eq!(wire.matches(&format!("\r\n--{BOUNDARY}\r\n")).count(), 3);
        assert!(wire.ends_with(&format!("\r\n--{BOUNDARY}--\r\n.\r\n")));

        let encoded = wire
            .split("\r\n\r\n")
            .nth(3)
            .unwrap()
            .split(&format!("\r\n--{BOUNDARY}"))
            .next()
            .unwrap();
        assert!(encoded.split("\r\n").count() > 1);
        for line in encoded.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH, "{line:?}");
        }

        let _ = std::fs::remove_file(text);
        let _ = std::fs::remove_file(data);
    }

    #[test]
    fn missing_attachment() {
        let mail = Mail::builder()
            .to("jane@example.com")
            .from("john@example.com")
            .body("Body")
            .attachment("/nonexistent/mail-queue/report.pdf")
            .build()
            .unwrap();

        assert!(mail.wire_format().ends_with(&format!(
            concat!(
                "--{0}\r\n",
                "Content-type: ; name=report.pdf\r\n",
                "Content-Transfer-Encoding: base64\r\n",
                "Content-Disposition: attachment; filename=report.pdf\r\n",
                "\r\n",
                "\r\n",
                "--{0}--\r\n",
                ".\r\n"
            ),
            BOUNDARY
        )));
    }

    #[test]
    fn missing_recipients() {
        assert!(matches!(
            Mail::builder().from("john@example.com").build(),
            Err(crate::Error::MissingRcptTo)
        ));
        assert!(Mail::new(Vec::<String>::new(), "john@example.com", "", "").is_err());
    }
}
