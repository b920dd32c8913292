// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use {crate::options::OptionKey, thiserror::Error};

/// Unified error type for the TestFlight front-end.
#[derive(Debug, Error)]
pub enum PilotError {
    #[error("option {0} is registered more than once")]
    DuplicateKey(OptionKey),

    #[error("command {0} is registered more than once")]
    DuplicateVerb(String),

    #[error("invalid value for --{}: {value:?} is not a valid {expected}", .key.flag_name())]
    TypeCoercion {
        key: OptionKey,
        value: String,
        expected: &'static str,
    },

    #[error("invalid value for --{}: {value:?} ({reason})", .key.flag_name())]
    Validation {
        key: OptionKey,
        value: String,
        reason: String,
    },

    #[error("missing required option --{}", .0.flag_name())]
    MissingRequiredOption(OptionKey),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("version error: {0}")]
    Version(#[from] semver::Error),

    #[error(transparent)]
    Manager(#[from] anyhow::Error),
}

