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

use mail_queue::{Mail, MailerBuilder};

#[tokio::main]
async fn main() {
    env_logger::init();

    // Relay through a local MTA on port 25, no encryption or authentication
    let mut mailer = MailerBuilder::new("localhost", 25).build();

    mailer.on_progress(|sent| println!("{sent} message(s) delivered"));
    mailer.on_error(|failure| eprintln!("Delivery failed: {failure}"));
    mailer.on_finished(|empty| {
        if !empty {
            println!("Some messages were deferred and remain queued");
        }
    });

    for (rcpt, subject) in [
        ("Jane Doe <jane@example.com>", "Hi Jane!"),
        ("james@test.com", "Hi James!"),
    ] {
        mailer.enqueue(
            Mail::builder()
                .from("John Doe <john@example.com>")
                .to(rcpt)
                .subject(subject)
                .body("Hello world!")
                .build()
                .unwrap(),
        );
    }

    if mailer.send_all().await {
        mailer.block_until_idle().await;
    }

    let report = mailer.report();
    println!(
        "Delivered {}, {} temporary and {} permanent failure(s), {} left in queue",
        report.processed,
        report.temporary_errors,
        report.permanent_errors,
        mailer.queue_len()
    );
}
