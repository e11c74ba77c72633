//! # Line Parser
//!
//! Turns one line typed at the session prompt into a [`Command`].
//!
//! ```text
//! client.getUser({"id": 1}, pr)    call an operation, reply handed to `pr`
//! client.listUsers(, printReply)   empty request body, same as {}
//! client                           inspect an identifier
//! .help | help                     banner
//! .exit | exit                     end the session
//! ```
//!
//! Parsing never looks at the session. Whether identifiers resolve, and to what, is decided by
//! the evaluator in [`crate::repl`].
use serde_json::Value;

#[derive(Debug, PartialEq)]
pub enum Command<'a> {
    Empty,
    Help,
    Exit,
    /// A bare identifier.
    Inspect(&'a str),
    /// `<target>.<operation>(<body>, <callback>)`
    Call {
        target: &'a str,
        operation: &'a str,
        body: Value,
        callback: &'a str,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unexpected input '{0}'")]
    Syntax(String),
    #[error("Missing callback: pass printReply (or pr) as the last argument")]
    MissingCallback,
    #[error("Invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

pub fn parse(line: &str) -> Result<Command<'_>, ParseError> {
    let line = line.trim();
    let line = line.strip_suffix(';').unwrap_or(line).trim_end();

    match line {
        "" => return Ok(Command::Empty),
        ".help" | "help" => return Ok(Command::Help),
        ".exit" | "exit" => return Ok(Command::Exit),
        _ => {}
    }

    if is_identifier(line) {
        return Ok(Command::Inspect(line));
    }

    let syntax = || ParseError::Syntax(line.to_string());

    let (target, rest) = line.split_once('.').ok_or_else(syntax)?;
    let (operation, args) = rest.split_once('(').ok_or_else(syntax)?;
    let args = args.strip_suffix(')').ok_or_else(syntax)?;

    let (target, operation) = (target.trim(), operation.trim());
    if !is_identifier(target) || !is_identifier(operation) {
        return Err(syntax());
    }

    let (body, callback) = args
        .rsplit_once(',')
        .map(|(body, callback)| (body, callback.trim()))
        .filter(|(_, callback)| is_identifier(callback))
        .ok_or(ParseError::MissingCallback)?;

    let body = match body.trim() {
        "" => Value::Object(Default::default()),
        json => serde_json::from_str(json).map_err(ParseError::InvalidBody)?,
    };

    Ok(Command::Call {
        target,
        operation,
        body,
        callback,
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn calls_with_a_body_and_a_callback() {
        let command = parse(r#"client.getUser({"id": 1, "tags": ["a", "b"]}, pr)"#).unwrap();

        assert_eq!(
            command,
            Command::Call {
                target: "client",
                operation: "getUser",
                body: json!({ "id": 1, "tags": ["a", "b"] }),
                callback: "pr",
            }
        );
    }

    #[test]
    fn empty_bodies_are_empty_objects() {
        let command = parse("client.listUsers(, printReply);").unwrap();

        assert_eq!(
            command,
            Command::Call {
                target: "client",
                operation: "listUsers",
                body: json!({}),
                callback: "printReply",
            }
        );
    }

    #[test]
    fn array_bodies_are_kept() {
        let Command::Call { body, .. } =
            parse(r#"client.chat([{"m": "a"}, {"m": "b"}], pr)"#).unwrap()
        else {
            panic!("expected a call");
        };
        assert_eq!(body, json!([{ "m": "a" }, { "m": "b" }]));
    }

    #[test]
    fn the_callback_is_mandatory() {
        assert!(matches!(
            parse(r#"client.getUser({"id": 1})"#),
            Err(ParseError::MissingCallback)
        ));
        assert!(matches!(
            parse(r#"client.getUser({"a": 1, "b": 2})"#),
            Err(ParseError::MissingCallback)
        ));
    }

    #[test]
    fn bodies_must_be_json() {
        assert!(matches!(
            parse("client.getUser({id: 1}, pr)"),
            Err(ParseError::InvalidBody(_))
        ));
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(parse("   ").unwrap(), Command::Empty);
        assert_eq!(parse(".help").unwrap(), Command::Help);
        assert_eq!(parse("help").unwrap(), Command::Help);
        assert_eq!(parse(".exit").unwrap(), Command::Exit);
        assert_eq!(parse("exit").unwrap(), Command::Exit);
        assert_eq!(parse("client").unwrap(), Command::Inspect("client"));
        assert_eq!(parse(" pr ").unwrap(), Command::Inspect("pr"));
    }

    #[test]
    fn everything_else_is_a_syntax_error() {
        for line in ["1 + 1", "client.getUser", "client.(1, pr)", "client.getUser(1, pr"] {
            assert!(
                matches!(parse(line), Err(ParseError::Syntax(_))),
                "{line} should not parse"
            );
        }
    }
}
