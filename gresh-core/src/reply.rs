//! # Reply Printer
//!
//! Completion handler for the calls issued from the interactive session.
//!
//! Replies arrive asynchronously, usually while the user is already sitting at a fresh prompt.
//! The printer writes through a [`Console`], which owns the terminal and knows how to put the
//! prompt back on screen after something was printed underneath it.
use crate::client::RemoteCallError;
use std::sync::Arc;

/// The terminal side of an interactive session.
pub trait Console: Send + Sync {
    /// Writes `text` followed by a line break.
    fn print(&self, text: &str);

    /// Puts the session prompt back on screen.
    fn display_prompt(&self);
}

/// Prints call results on a session's console.
///
/// Bound to the session as `printReply` and its alias `pr`.
#[derive(Clone)]
pub struct ReplyPrinter {
    console: Arc<dyn Console>,
}

impl ReplyPrinter {
    pub fn new(console: Arc<dyn Console>) -> Self {
        Self { console }
    }

    pub fn console(&self) -> &Arc<dyn Console> {
        &self.console
    }

    /// Prints a call result.
    ///
    /// * Failures print a single `Error: ` line and leave the prompt alone.
    /// * Replies print a blank line, the reply as JSON indented by two spaces, then redraw the
    ///   prompt.
    pub fn print_reply(&self, result: Result<serde_json::Value, RemoteCallError>) {
        match result {
            Err(err) => self.console.print(&format!("Error: {err}")),
            Ok(reply) => {
                let text =
                    serde_json::to_string_pretty(&reply).unwrap_or_else(|_| reply.to_string());
                self.console.print(&format!("\n{text}"));
                self.console.display_prompt();
            }
        }
    }
}

impl std::fmt::Debug for ReplyPrinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyPrinter").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records everything written to it.
    #[derive(Default)]
    pub(crate) struct RecordingConsole {
        pub(crate) output: Mutex<String>,
        pub(crate) redraws: Mutex<usize>,
    }

    impl RecordingConsole {
        pub(crate) fn output(&self) -> String {
            self.output.lock().unwrap().clone()
        }

        pub(crate) fn redraws(&self) -> usize {
            *self.redraws.lock().unwrap()
        }
    }

    impl Console for RecordingConsole {
        fn print(&self, text: &str) {
            let mut output = self.output.lock().unwrap();
            output.push_str(text);
            output.push('\n');
        }

        fn display_prompt(&self) {
            *self.redraws.lock().unwrap() += 1;
        }
    }

    #[test]
    fn replies_are_pretty_printed_and_redraw_the_prompt() {
        let console = Arc::new(RecordingConsole::default());
        let printer = ReplyPrinter::new(console.clone());

        printer.print_reply(Ok(serde_json::json!({ "id": 1 })));

        assert_eq!(console.output(), "\n{\n  \"id\": 1\n}\n");
        assert_eq!(console.redraws(), 1);
    }

    #[test]
    fn failures_are_labelled_and_leave_the_prompt_alone() {
        let console = Arc::new(RecordingConsole::default());
        let printer = ReplyPrinter::new(console.clone());

        printer.print_reply(Err(RemoteCallError::Status(tonic::Status::unavailable(
            "connection refused",
        ))));

        let output = console.output();
        assert!(output.starts_with("Error: "), "got {output:?}");
        assert!(output.contains("connection refused"));
        assert_eq!(console.redraws(), 0);
    }

    #[test]
    fn nested_replies_keep_two_space_indentation() {
        let console = Arc::new(RecordingConsole::default());
        let printer = ReplyPrinter::new(console.clone());

        printer.print_reply(Ok(serde_json::json!({ "user": { "tags": ["a"] } })));

        assert!(
            console
                .output()
                .contains("{\n  \"user\": {\n    \"tags\": [\n      \"a\"\n    ]\n  }\n}")
        );
    }
}
