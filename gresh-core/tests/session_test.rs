use echo_service::{EchoServiceImpl, EchoServiceServer, PROTO_DIR};
use gresh_core::client::ServiceClient;
use gresh_core::reply::Console;
use gresh_core::selector::{Choice, ChoiceKind, Chooser, PromptError};
use gresh_core::session::{Binding, SessionContext};
use gresh_core::{PrepareError, prepare};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Answers every prompt with the first option, recording what it was asked.
#[derive(Default)]
struct FirstOption {
    asked: Vec<ChoiceKind>,
}

impl Chooser for FirstOption {
    fn choose(&mut self, choice: Choice<'_>) -> Result<usize, PromptError> {
        self.asked.push(choice.kind);
        Ok(0)
    }
}

struct NeverAsked;

impl Chooser for NeverAsked {
    fn choose(&mut self, choice: Choice<'_>) -> Result<usize, PromptError> {
        panic!("no prompt expected, got '{}'", choice.message);
    }
}

#[derive(Default)]
struct BufferConsole {
    output: Mutex<String>,
    redraws: Mutex<usize>,
}

impl Console for BufferConsole {
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
fn test_empty_address_fails_before_any_prompt() {
    let err = prepare(
        Path::new("echo.proto"),
        Path::new(PROTO_DIR),
        "",
        &mut NeverAsked,
    )
    .unwrap_err();

    assert!(matches!(err, PrepareError::InvalidAddress(_)));
}

#[test]
fn test_empty_address_wins_over_a_missing_definition() {
    let err = prepare(
        Path::new("does-not-exist.proto"),
        Path::new(PROTO_DIR),
        "",
        &mut NeverAsked,
    )
    .unwrap_err();

    assert!(matches!(err, PrepareError::InvalidAddress(_)));
}

#[test]
fn test_missing_definition_is_a_load_error() {
    let err = prepare(
        Path::new("does-not-exist.proto"),
        Path::new(PROTO_DIR),
        "localhost:50051",
        &mut NeverAsked,
    )
    .unwrap_err();

    assert!(matches!(err, PrepareError::Load(_)));
}

#[test]
fn test_prepare_selects_the_echo_service() {
    let mut chooser = FirstOption::default();

    let selection = prepare(
        Path::new("echo.proto"),
        Path::new(PROTO_DIR),
        "localhost:50051",
        &mut chooser,
    )
    .unwrap();

    assert_eq!(selection.package, "echo");
    assert_eq!(selection.service_name, "EchoService");
    assert_eq!(chooser.asked, vec![ChoiceKind::Package, ChoiceKind::Service]);
}

#[tokio::test]
async fn test_session_routes_replies_to_its_console() {
    let selection = prepare(
        Path::new("echo.proto"),
        Path::new(PROTO_DIR),
        "localhost:50051",
        &mut FirstOption::default(),
    )
    .unwrap();

    let console = Arc::new(BufferConsole::default());
    let client = ServiceClient::new(selection.service, EchoServiceServer::new(EchoServiceImpl));
    let session = SessionContext::new(
        &selection.service_name,
        "localhost:50051",
        client,
        console.clone(),
    );

    let Some(Binding::Client(client)) = session.lookup("client") else {
        panic!("client should be bound");
    };
    let Some(Binding::PrintReply(printer)) = session.lookup("pr") else {
        panic!("pr should be bound");
    };

    let printer = printer.clone();
    client
        .call(
            "unaryEcho",
            serde_json::json!({ "message": "routed" }),
            move |result| printer.print_reply(result),
        )
        .await
        .unwrap();

    assert_eq!(
        *console.output.lock().unwrap(),
        "\n{\n  \"message\": \"routed\"\n}\n"
    );
    assert_eq!(*console.redraws.lock().unwrap(), 1);
    assert_eq!(session.prompt(), "EchoService@localhost:50051> ");
}
