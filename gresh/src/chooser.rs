//! Terminal prompts for the package and service selection.
use colored::*;
use gresh_core::selector::{Choice, ChoiceKind, Chooser, PromptError};
use rustyline::{DefaultEditor, error::ReadlineError};

/// Answers selection prompts, first from the `--package` / `--service` presets, then by asking on
/// the terminal.
pub struct TerminalChooser {
    editor: Option<DefaultEditor>,
    presets: Presets,
}

impl TerminalChooser {
    pub fn new(package: Option<String>, service: Option<String>) -> Self {
        Self {
            editor: None,
            presets: Presets::new(package, service),
        }
    }

    fn ask(&mut self, choice: Choice<'_>) -> Result<usize, PromptError> {
        println!("{} {}", "?".green().bold(), choice.message.bold());
        for (i, option) in choice.options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }

        let editor = match self.editor.take() {
            Some(editor) => editor,
            None => DefaultEditor::new().map_err(|e| PromptError::Failed(e.to_string()))?,
        };
        let editor = self.editor.insert(editor);

        loop {
            let answer = match editor.readline("> ") {
                Ok(answer) => answer,
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                    return Err(PromptError::Interrupted);
                }
                Err(err) => return Err(PromptError::Failed(err.to_string())),
            };

            match resolve(choice.options, answer.trim()) {
                Some(index) => return Ok(index),
                None => println!(
                    "{}",
                    format!("Pick a number between 1 and {}", choice.options.len()).yellow()
                ),
            }
        }
    }
}

impl Chooser for TerminalChooser {
    fn choose(&mut self, choice: Choice<'_>) -> Result<usize, PromptError> {
        match self.presets.answer(choice.kind, choice.options)? {
            Some(index) => {
                tracing::debug!(
                    kind = ?choice.kind,
                    option = %choice.options[index],
                    "answered from preset"
                );
                Ok(index)
            }
            None => self.ask(choice),
        }
    }
}

#[derive(Debug, Default)]
struct Presets {
    package: Option<String>,
    /// Set once a package prompt offered the preset package itself.
    package_reached: bool,
    service: Option<String>,
}

impl Presets {
    fn new(package: Option<String>, service: Option<String>) -> Self {
        Self {
            package,
            package_reached: false,
            service,
        }
    }

    /// The preset answer to a prompt, or `None` when the prompt should be asked.
    ///
    /// A dotted package preset (`acme.billing.v1`) answers every package prompt on the way down:
    /// the option naming it exactly, otherwise the longest option that is one of its parents.
    fn answer(
        &mut self,
        kind: ChoiceKind,
        options: &[String],
    ) -> Result<Option<usize>, PromptError> {
        match kind {
            ChoiceKind::Service => match self.service.take() {
                Some(service) => resolve(options, &service)
                    .map(Some)
                    .ok_or(PromptError::UnknownChoice(service)),
                None => Ok(None),
            },
            ChoiceKind::Package => {
                let Some(package) = &self.package else {
                    return Ok(None);
                };

                if let Some(index) = options.iter().position(|o| o == package) {
                    self.package_reached = true;
                    return Ok(Some(index));
                }

                let parent = options
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| {
                        package
                            .strip_prefix(o.as_str())
                            .is_some_and(|rest| rest.starts_with('.'))
                    })
                    .max_by_key(|(_, o)| o.len())
                    .map(|(index, _)| index);

                match parent {
                    Some(index) => Ok(Some(index)),
                    None if self.package_reached => Ok(None),
                    None => Err(PromptError::UnknownChoice(package.clone())),
                }
            }
        }
    }
}

/// Accepts either the 1-based position of an option or its exact name.
fn resolve(options: &[String], answer: &str) -> Option<usize> {
    if let Some(index) = options.iter().position(|o| o == answer) {
        return Some(index);
    }
    answer
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=options.len()).contains(n))
        .map(|n| n - 1)
}
