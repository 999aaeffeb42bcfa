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

use mail_queue::{Encryption, Mail, MailerBuilder};

#[tokio::main]
async fn main() {
    env_logger::init();

    // Connect to the submission port, upgrade to TLS and
    // authenticate using AUTH LOGIN.
    let mut mailer = MailerBuilder::new("smtp.gmail.com", 587)
        .encryption(Encryption::StartTls)
        .credentials("john", "p4ssw0rd")
        .timeout(Duration::from_secs(10))
        .build();

    mailer.on_error(|failure| eprintln!("{failure}"));

    // A message with a file attachment
    mailer.enqueue(
        Mail::builder()
            .from("John Doe <john@example.com>")
            .to("Jane Doe <jane@example.com>")
            .cc("james@test.com")
            .subject("Hello, world!")
            .body("Please find the report attached.")
            .attachment("Cargo.toml")
            .build()
            .unwrap(),
    );

    if mailer.send_all().await {
        mailer.block_until_idle().await;
    }
}
