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

use super::{auth::AuthMode, builder::Encryption};

/// Connection state, named after the last command sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Disconnected,
    Connected,
    EhloSent,
    Auth,
    MailFromSent,
    ToSent,
    DataSent,
    ContentSent,
    RsetSent,
    QuitSent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoginState {
    #[default]
    PreLogin,
    AuthLoginSent,
    UsernameSent,
    PasswordSent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StartTlsState {
    #[default]
    PreStartTls,
    PostStartTls,
}

/// What to do after a positive reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Ehlo,
    UpgradeThenEhlo,
    StartTls,
    AuthLogin,
    Username,
    Password,
    MailFrom,
    RcptTo,
    Data,
    Content,
    Delivered,
    NextOrQuit,
    Disconnect,
}

pub(crate) fn step(
    state: State,
    login: LoginState,
    start_tls: StartTlsState,
    encryption: Encryption,
    auth: AuthMode,
) -> Step {
    match state {
        State::Disconnected | State::Connected => match start_tls {
            StartTlsState::PostStartTls => Step::UpgradeThenEhlo,
            StartTlsState::PreStartTls => Step::Ehlo,
        },
        State::EhloSent => {
            if encryption == Encryption::StartTls && start_tls == StartTlsState::PreStartTls {
                Step::StartTls
            } else if auth == AuthMode::None {
                Step::MailFrom
            } else {
                login_step(login)
            }
        }
        State::Auth => login_step(login),
        State::MailFromSent => Step::RcptTo,
        State::ToSent => Step::Data,
        State::DataSent => Step::Content,
        State::ContentSent => Step::Delivered,
        State::RsetSent => Step::NextOrQuit,
        State::QuitSent => Step::Disconnect,
    }
}

fn login_step(login: LoginState) -> Step {
    match login {
        LoginState::PreLogin => Step::AuthLogin,
        LoginState::AuthLoginSent => Step::Username,
        LoginState::UsernameSent => Step::Password,
        LoginState::PasswordSent => Step::MailFrom,
    }
}
