//! Yes/no confirmation before destructive or bulk work.

use dialoguer::{theme::ColorfulTheme, Confirm};

use crate::error::{Error, Result};

/// Asks the user to approve an action.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Prompts on the terminal. The default answer is "no".
#[derive(Debug, Default)]
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| Error::Prompt {
                message: e.to_string(),
            })
    }
}

/// Answers every prompt the same way without asking. Used for `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirmer for FixedAnswer {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(self.0)
    }
}
