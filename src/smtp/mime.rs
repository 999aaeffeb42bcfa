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

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

/// Maximum length of a folded header line, without the CRLF.
pub const MAX_LINE_LENGTH: usize = 78;

/// Length of a base64 attachment line.
pub const BASE64_LINE_LENGTH: usize = 76;

pub const BOUNDARY: &str = "mXysXimXplXebXouXndXarXy";

/// Builds a recipient header line (`To: `, `Cc: `, `Bcc: `) folded at
/// `MAX_LINE_LENGTH`. Continuation lines start with a single space.
pub fn fold_recipients(header: &str, addresses: &[String]) -> String {
    let mut result = String::from(header);
    let mut line_length = header.len();

    for (pos, address) in addresses.iter().enumerate() {
        if pos > 0 && line_length + address.len() >= MAX_LINE_LENGTH {
            result.push_str("\r\n ");
            line_length = 1;
        }
        result.push_str(address);
        line_length += address.len();
        if pos + 1 != addresses.len() {
            result.push(',');
            line_length += 1;
        }
    }
    result.push_str("\r\n");
    result
}

/// Replaces bare LF line breaks by CRLF.
pub fn normalize_line_breaks(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 16);
    let mut last = '\0';
    for ch in text.chars() {
        if ch == '\n' && last != '\r' {
            result.push('\r');
        }
        result.push(ch);
        last = ch;
    }
    result
}

/// Base64 encodes `bytes` into CRLF separated lines.
pub fn wrap_base64(bytes: &[u8]) -> String {
    let encoded = STANDARD.encode(bytes);
    let mut result = String::with_capacity(encoded.len() + (encoded.len() / BASE64_LINE_LENGTH) * 2);
    for (pos, chunk) in encoded.as_bytes().chunks(BASE64_LINE_LENGTH).enumerate() {
        if pos > 0 {
            result.push_str("\r\n");
        }
        result.push_str(&String::from_utf8_lossy(chunk));
    }
    result
}

/// Reads and encodes an attachment. A file that is missing or cannot be read
/// contributes an empty block.
pub fn encode_file(path: &Path) -> String {
    if !path.exists() {
        log::warn!("Attachment {} does not exist, sending it empty", path.display());
        return String::new();
    }
    match std::fs::read(path) {
        Ok(bytes) => wrap_base64(&bytes),
        Err(err) => {
            log::warn!("Failed to read attachment {}: {}", path.display(), err);
            String::new()
        }
    }
}

/// MIME type guessed from the file extension, empty if the file does not exist.
pub fn mime_type(path: &Path) -> String {
    if !path.exists() {
        return String::new();
    }
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Applies the transparency procedure and appends the end-of-data terminator.
pub fn transparency(message: &str) -> String {
    #[derive(Debug)]
    enum State {
        Cr,
        CrLf,
        Init,
    }

    let mut result = String::with_capacity(message.len() + 16);
    let mut state = State::Init;
    let mut last_pos = 0;
    for (pos, byte) in message.bytes().enumerate() {
        if byte == b'.' && matches!(state, State::CrLf) {
            result.push_str(&message[last_pos..pos]);
            result.push('.');
            last_pos = pos;
            state = State::Init;
        } else if byte == b'\r' {
            state = State::Cr;
        } else if byte == b'\n' && matches!(state, State::Cr) {
            state = State::CrLf;
        } else {
            state = State::Init;
        }
    }
    result.push_str(&message[last_pos..]);
    if !result.ends_with("\r\n") {
        result.push_str("\r\n");
    }
    result.push_str(".\r\n");
    result
}
