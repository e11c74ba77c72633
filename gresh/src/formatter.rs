use crate::repl::ReplError;
use colored::*;
use gresh_core::{
    PrepareError,
    definition::LoadError,
    selector::{PromptError, SelectError},
    session::BindError,
};

/// A wrapper struct for a formatted, colored string.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl From<PrepareError> for FormattedString {
    fn from(err: PrepareError) -> Self {
        match err {
            PrepareError::InvalidAddress(err) => FormattedString(format!(
                "{}\n\n'{}'",
                "Invalid Address:".red().bold(),
                err
            )),
            PrepareError::Load(err) => FormattedString::from(err),
            PrepareError::Select(err) => FormattedString::from(err),
        }
    }
}

impl From<LoadError> for FormattedString {
    fn from(err: LoadError) -> Self {
        FormattedString(format!(
            "{}\n\n'{}'",
            "Failed to load the service definition:".red().bold(),
            err
        ))
    }
}

impl From<SelectError> for FormattedString {
    fn from(err: SelectError) -> Self {
        match err {
            SelectError::Prompt(PromptError::Interrupted) => {
                FormattedString("Selection cancelled.".yellow().to_string())
            }
            err => FormattedString(format!(
                "{}\n\n'{}'",
                "Service Selection Failed:".red().bold(),
                err
            )),
        }
    }
}

impl From<BindError> for FormattedString {
    fn from(err: BindError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Connection Error:".red().bold(), err))
    }
}

impl From<ReplError> for FormattedString {
    fn from(err: ReplError) -> Self {
        FormattedString(format!("{}\n\n'{}'", "Terminal Error:".red().bold(), err))
    }
}
