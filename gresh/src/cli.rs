//! # CLI
//!
//! This module defines the command-line interface of `gresh` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring headers are `key:value`);
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gresh", version, about = "Interactive gRPC shell")]
pub struct Cli {
    /// The service definition to load (.proto, or a compiled descriptor set)
    pub proto_file: PathBuf,

    /// The server address (e.g. localhost:50051)
    pub address: String,

    /// Directory the definition and its imports are resolved against
    #[arg(short = 'd', long = "directory", default_value = ".")]
    pub directory: PathBuf,

    /// Use a plaintext connection instead of TLS
    #[arg(long)]
    pub insecure: bool,

    /// Answer the package prompts up front (dotted names descend, e.g. acme.billing.v1)
    #[arg(long)]
    pub package: Option<String>,

    /// Answer the service prompt up front
    #[arg(long)]
    pub service: Option<String>,

    /// Metadata sent with every call
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_arguments_and_defaults() {
        let cli = Cli::try_parse_from(["gresh", "users.proto", "localhost:50051"]).unwrap();

        assert_eq!(cli.proto_file, PathBuf::from("users.proto"));
        assert_eq!(cli.address, "localhost:50051");
        assert_eq!(cli.directory, PathBuf::from("."));
        assert!(!cli.insecure);
        assert!(cli.package.is_none());
        assert!(cli.service.is_none());
        assert!(cli.headers.is_empty());
    }

    #[test]
    fn every_option() {
        let cli = Cli::try_parse_from([
            "gresh",
            "users.proto",
            "localhost:50051",
            "-d",
            "protos",
            "--insecure",
            "--package",
            "users",
            "--service",
            "UserService",
            "-H",
            "authorization: Bearer abc",
            "--header",
            "x-trace:1",
        ])
        .unwrap();

        assert_eq!(cli.directory, PathBuf::from("protos"));
        assert!(cli.insecure);
        assert_eq!(cli.package.as_deref(), Some("users"));
        assert_eq!(cli.service.as_deref(), Some("UserService"));
        assert_eq!(
            cli.headers,
            vec![
                ("authorization".to_string(), "Bearer abc".to_string()),
                ("x-trace".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn address_is_required() {
        assert!(Cli::try_parse_from(["gresh", "users.proto"]).is_err());
    }

    #[test]
    fn headers_need_a_separator() {
        assert!(parse_header("no-separator").is_err());
        assert_eq!(
            parse_header("k : v").unwrap(),
            ("k".to_string(), "v".to_string())
        );
    }
}
