// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Asking the operator for values.

use {
    log::{debug, warn},
    std::io::IsTerminal,
};

/// Source of operator answers.
pub trait Prompt {
    /// Whether an operator can answer questions.
    fn is_interactive(&self) -> bool;

    /// Show `message` and read one line.
    fn read_line(&self, message: &str) -> std::io::Result<String>;

    /// Ask the operator for a value.
    ///
    /// Returns `None` without reading anything when no operator is attached,
    /// and when the answer is blank or can't be read.
    fn prompt(&self, message: &str) -> Option<String> {
        if !self.is_interactive() {
            debug!("not prompting for {:?}: input is not interactive", message.trim());
            return None;
        }

        match self.read_line(message) {
            Ok(answer) => {
                let answer = answer.trim();
                (!answer.is_empty()).then(|| answer.to_string())
            }
            Err(err) => {
                warn!("unable to read answer: {err}");
                None
            }
        }
    }
}

/// Prompts on the controlling terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn is_interactive(&self) -> bool {
        std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
    }

    fn read_line(&self, message: &str) -> std::io::Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(message.trim_end().trim_end_matches(':'))
            .allow_empty(true)
            .interact_text()
    }
}

/// Never prompts.
#[derive(Clone, Copy, Debug, Default)]
pub struct NonInteractive;

impl Prompt for NonInteractive {
    fn is_interactive(&self) -> bool {
        false
    }

    fn read_line(&self, _message: &str) -> std::io::Result<String> {
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "input is not interactive",
        ))
    }
}
