//! # Interactive Session
//!
//! The read-evaluate loop behind the session prompt.
//!
//! A dedicated thread owns the `rustyline` editor and reads one line each time the loop asks
//! for one. Lines are evaluated on the tokio runtime, and every call is spawned as its own task,
//! so the prompt comes back immediately and replies are printed whenever they complete.
use crate::eval::{self, Command, ParseError};
use colored::*;
use gresh_core::{
    reply::Console,
    session::{Binding, IDENTIFIERS, SessionContext},
    tonic::client::GrpcService,
};
use http_body::Body as HttpBody;
use rustyline::{DefaultEditor, ExternalPrinter, error::ReadlineError};
use std::{
    io::Write,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum ReplError {
    #[error("Failed to start the line editor: {0}")]
    Editor(#[from] ReadlineError),
    #[error("Failed to spawn the input thread: {0}")]
    Thread(#[source] std::io::Error),
    #[error("The input thread exited before the session started")]
    ReaderGone,
}

#[derive(Debug, thiserror::Error)]
enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{0} is not defined (available: {available})", available = IDENTIFIERS.join(", "))]
    Undefined(String),
    #[error("{target}.{operation} is not a function")]
    NotAFunction { target: String, operation: String },
    #[error("{0} cannot be used as a callback, pass printReply or pr")]
    NotACallback(String),
}

/// What the loop should do after a line was evaluated.
#[derive(Debug)]
pub enum Outcome {
    Continue,
    /// A call was issued; its reply is printed by the task.
    Pending(JoinHandle<()>),
    Exit,
}

enum Input {
    Line(String),
    Interrupted,
    Eof,
    Failed(ReadlineError),
}

/// Pulls lines from the input thread, one per request.
pub struct LineReader {
    requests: std::sync::mpsc::Sender<()>,
    lines: mpsc::UnboundedReceiver<Input>,
}

impl LineReader {
    async fn next(&mut self) -> Input {
        if self.requests.send(()).is_err() {
            return Input::Eof;
        }
        self.lines.recv().await.unwrap_or(Input::Eof)
    }
}

/// Starts the input thread and returns the console replies are printed on.
///
/// The thread only reads once [`run`] asks for a line, so anything printed before that (the
/// banner) appears above the first prompt.
pub async fn spawn_reader(prompt: String) -> Result<(Arc<dyn Console>, LineReader), ReplError> {
    let (ready_tx, ready_rx) = oneshot::channel::<Result<Arc<dyn Console>, ReadlineError>>();
    let (requests_tx, requests_rx) = std::sync::mpsc::channel::<()>();
    let (lines_tx, lines_rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("gresh-input".to_string())
        .spawn(move || {
            let mut editor = match DefaultEditor::new() {
                Ok(editor) => editor,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            let console: Arc<dyn Console> = match editor.create_external_printer() {
                Ok(printer) => Arc::new(ExternalPrinterConsole::new(printer)),
                Err(err) => {
                    tracing::debug!(%err, "external printer unavailable, falling back to stdout");
                    Arc::new(StdoutConsole::new(prompt.clone()))
                }
            };

            if ready_tx.send(Ok(console)).is_err() {
                return;
            }

            while requests_rx.recv().is_ok() {
                let input = match editor.readline(&prompt) {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            let _ = editor.add_history_entry(line.as_str());
                        }
                        Input::Line(line)
                    }
                    Err(ReadlineError::Interrupted) => Input::Interrupted,
                    Err(ReadlineError::Eof) => Input::Eof,
                    Err(err) => Input::Failed(err),
                };

                let last = matches!(input, Input::Eof | Input::Failed(_));
                if lines_tx.send(input).is_err() || last {
                    break;
                }
            }
        })
        .map_err(ReplError::Thread)?;

    let console = ready_rx.await.map_err(|_| ReplError::ReaderGone)??;

    Ok((
        console,
        LineReader {
            requests: requests_tx,
            lines: lines_rx,
        },
    ))
}

/// Reads and evaluates lines until the user leaves the session with Ctrl-D or `.exit`.
///
/// Ctrl-C only discards the line being typed. Calls still outstanding when the loop ends are
/// abandoned.
pub async fn run<S>(session: &SessionContext<S>, mut reader: LineReader)
where
    S: GrpcService<gresh_core::tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = gresh_core::tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    loop {
        match reader.next().await {
            Input::Line(line) => {
                if let Outcome::Exit = evaluate(session, &line) {
                    break;
                }
            }
            Input::Interrupted => session
                .printer()
                .console()
                .print("(To exit, press Ctrl+D or type .exit)"),
            Input::Eof => break,
            Input::Failed(err) => {
                tracing::error!(%err, "reading input failed");
                break;
            }
        }
    }
}

/// Evaluates one line against the session.
pub fn evaluate<S>(session: &SessionContext<S>, line: &str) -> Outcome
where
    S: GrpcService<gresh_core::tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = gresh_core::tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    let console = session.printer().console();

    let result = match eval::parse(line) {
        Ok(Command::Empty) => Ok(Outcome::Continue),
        Ok(Command::Exit) => Ok(Outcome::Exit),
        Ok(Command::Help) => {
            console.print(&session.usage());
            Ok(Outcome::Continue)
        }
        Ok(Command::Inspect(identifier)) => inspect(session, identifier).map(|text| {
            console.print(&text);
            Outcome::Continue
        }),
        Ok(Command::Call {
            target,
            operation,
            body,
            callback,
        }) => call(session, target, operation, body, callback).map(Outcome::Pending),
        Err(err) => Err(err.into()),
    };

    result.unwrap_or_else(|err| {
        tracing::debug!(%err, line, "evaluation failed");
        console.print(&format!("{} {err}", "Evaluation Error:".red().bold()));
        Outcome::Continue
    })
}

fn inspect<S>(session: &SessionContext<S>, identifier: &str) -> Result<String, EvalError> {
    match session.lookup(identifier) {
        Some(Binding::Client(_)) => Ok(session
            .operation_usage()
            .iter()
            .map(|line| format!("  {line}"))
            .collect::<Vec<_>>()
            .join("\n")),
        Some(Binding::PrintReply(_)) => Ok("[Function: printReply]".to_string()),
        None => Err(EvalError::Undefined(identifier.to_string())),
    }
}

fn call<S>(
    session: &SessionContext<S>,
    target: &str,
    operation: &str,
    body: serde_json::Value,
    callback: &str,
) -> Result<JoinHandle<()>, EvalError>
where
    S: GrpcService<gresh_core::tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = gresh_core::tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    let not_a_function = || EvalError::NotAFunction {
        target: target.to_string(),
        operation: operation.to_string(),
    };

    let client = match session.lookup(target) {
        Some(Binding::Client(client)) => client,
        Some(Binding::PrintReply(_)) => return Err(not_a_function()),
        None => return Err(EvalError::Undefined(target.to_string())),
    };

    if client.service().operation(operation).is_none() {
        return Err(not_a_function());
    }

    let printer = match session.lookup(callback) {
        Some(Binding::PrintReply(printer)) => printer.clone(),
        Some(Binding::Client(_)) => return Err(EvalError::NotACallback(callback.to_string())),
        None => return Err(EvalError::Undefined(callback.to_string())),
    };

    Ok(client.call(operation, body, move |result| printer.print_reply(result)))
}

/// Prints through rustyline, which clears the prompt line, prints, and repaints the prompt with
/// whatever the user had typed so far.
struct ExternalPrinterConsole<P> {
    printer: Mutex<P>,
}

impl<P> ExternalPrinterConsole<P> {
    fn new(printer: P) -> Self {
        Self {
            printer: Mutex::new(printer),
        }
    }
}

impl<P: ExternalPrinter + Send> Console for ExternalPrinterConsole<P> {
    fn print(&self, text: &str) {
        let mut printer = self.printer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = printer.print(format!("{text}\n")) {
            tracing::warn!(%err, "failed to print to the terminal");
        }
    }

    // The editor repaints its own prompt after every external print.
    fn display_prompt(&self) {}
}

/// Used when the terminal does not support external printing (e.g. input is not a tty).
struct StdoutConsole {
    prompt: String,
    out: Mutex<()>,
}

impl StdoutConsole {
    fn new(prompt: String) -> Self {
        Self {
            prompt,
            out: Mutex::new(()),
        }
    }
}

impl Console for StdoutConsole {
    fn print(&self, text: &str) {
        let _guard = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        println!("{text}");
    }

    fn display_prompt(&self) {
        let _guard = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "{}", self.prompt);
        let _ = stdout.flush();
    }
}
