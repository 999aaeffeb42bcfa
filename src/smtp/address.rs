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

//! Envelope address normalization.
//!
//! Header fields may carry decorated addresses such as `Jane Doe <jane@example.com>`,
//! envelope commands (`MAIL FROM`, `RCPT TO`) only accept the bare mailbox.

/// Returns the bare mailbox of an address string.
///
/// Bare addresses are returned unchanged, decorated addresses are reduced to the
/// mailbox between the angle brackets. Anything else is passed through as-is and
/// left for the server to reject.
pub fn bare_address(address: &str) -> &str {
    if is_bare_address(address) {
        address
    } else {
        decorated_mailbox(address).unwrap_or(address)
    }
}

/// `local@domain`, where the domain has at least two labels.
pub fn is_bare_address(address: &str) -> bool {
    match address.rsplit_once('@') {
        Some((local, domain)) => is_local_part(local) && is_domain(domain),
        None => false,
    }
}

/// `<display name> <local@domain>`, optionally followed by whitespace.
pub fn is_decorated_address(address: &str) -> bool {
    decorated_mailbox(address).is_some()
}

fn decorated_mailbox(address: &str) -> Option<&str> {
    let address = address.trim_end();
    let inner = address.strip_suffix('>')?;
    let (_, mailbox) = inner.rsplit_once('<')?;
    is_bare_address(mailbox).then_some(mailbox)
}

fn is_local_part(local: &str) -> bool {
    !local.is_empty()
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
        && local.bytes().all(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(
                    ch,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'/'
                        | b'='
                        | b'?'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'{'
                        | b'|'
                        | b'}'
                        | b'~'
                        | b'.'
                )
        })
}

fn is_domain(domain: &str) -> bool {
    let mut labels = 0;
    for label in domain.split('.') {
        if label.is_empty()
            || label.starts_with('-')
            || label.ends_with('-')
            || !label
                .bytes()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == b'-')
        {
            return false;
        }
        labels += 1;
    }
    labels >= 2
}
