//! # Session Binder
//!
//! Connects the selected service to an address and builds the [`SessionContext`] the
//! interactive evaluator works against.
//!
//! The context exposes three identifiers to the user:
//!
//! * `client`: the [`ServiceClient`] for the selected service.
//! * `printReply` and its alias `pr`: the [`ReplyPrinter`] bound to this session's console,
//!   meant to be passed as the callback of a call.
//!
//! Binding never touches the network. The channel connects lazily, so an unreachable server
//! only shows up as a failed reply on the first call.
use crate::{
    client::ServiceClient,
    definition::{OperationDefinition, ServiceDefinition},
    reply::{Console, ReplyPrinter},
};
use std::{fmt::Write, sync::Arc};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};

/// Identifiers bound in every session, in the order they are documented in the banner.
pub const IDENTIFIERS: [&str; 3] = ["client", "printReply", "pr"];

/// Options recognised by the binder.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Use a plaintext connection instead of TLS.
    pub insecure: bool,
    /// Metadata attached to every call of the session.
    pub headers: Vec<(String, String)>,
}

/// Transport security of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credentials {
    /// Unauthenticated, unencrypted HTTP/2.
    Insecure,
    /// TLS, verified against the platform's native roots.
    Tls,
}

impl Credentials {
    pub fn for_options(options: &SessionOptions) -> Self {
        if options.insecure {
            Credentials::Insecure
        } else {
            Credentials::Tls
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            Credentials::Insecure => "http",
            Credentials::Tls => "https",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Address should be valid")]
pub struct InvalidAddressError;

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddressError),
    #[error("Invalid endpoint '{0}': {1}")]
    InvalidEndpoint(String, #[source] tonic::transport::Error),
    #[error("Failed to configure TLS for '{0}': {1}")]
    Tls(String, #[source] tonic::transport::Error),
}

/// Rejects empty and blank addresses.
pub fn validate_address(address: &str) -> Result<(), InvalidAddressError> {
    if address.trim().is_empty() {
        return Err(InvalidAddressError);
    }
    Ok(())
}

/// Builds the endpoint for `address`.
///
/// A bare `host:port` gets the scheme matching `credentials`; an address that already carries a
/// scheme is used as is.
pub fn endpoint(address: &str, credentials: Credentials) -> Result<Endpoint, BindError> {
    let uri = if address.contains("://") {
        address.to_string()
    } else {
        format!("{}://{}", credentials.scheme(), address)
    };

    let endpoint = Endpoint::from_shared(uri.clone())
        .map_err(|e| BindError::InvalidEndpoint(uri.clone(), e))?;

    match credentials {
        Credentials::Insecure => Ok(endpoint),
        Credentials::Tls => endpoint
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| BindError::Tls(uri, e)),
    }
}

/// Builds a session for `service` at `address`.
///
/// Must be called from within a tokio runtime, which drives the lazily connected channel.
pub fn bind(
    service_name: &str,
    service: ServiceDefinition,
    address: &str,
    options: &SessionOptions,
    console: Arc<dyn Console>,
) -> Result<SessionContext, BindError> {
    validate_address(address)?;

    let credentials = Credentials::for_options(options);
    let channel = endpoint(address, credentials)?.connect_lazy();

    tracing::info!(
        service = service.full_name(),
        address,
        ?credentials,
        "session bound"
    );

    let client = ServiceClient::new(service, channel).with_headers(options.headers.clone());

    Ok(SessionContext::new(service_name, address, client, console))
}

/// What an identifier of the session resolves to.
#[derive(Debug)]
pub enum Binding<'a, S> {
    Client(&'a ServiceClient<S>),
    PrintReply(&'a ReplyPrinter),
}

/// Everything the interactive evaluator can reach.
#[derive(Debug, Clone)]
pub struct SessionContext<S = Channel> {
    service_name: String,
    address: String,
    client: ServiceClient<S>,
    printer: ReplyPrinter,
}

impl<S> SessionContext<S> {
    pub fn new(
        service_name: &str,
        address: &str,
        client: ServiceClient<S>,
        console: Arc<dyn Console>,
    ) -> Self {
        Self {
            service_name: service_name.to_string(),
            address: address.to_string(),
            client,
            printer: ReplyPrinter::new(console),
        }
    }

    pub fn printer(&self) -> &ReplyPrinter {
        &self.printer
    }

    /// Resolves a session identifier (`client`, `printReply` or `pr`).
    pub fn lookup(&self, identifier: &str) -> Option<Binding<'_, S>> {
        match identifier {
            "client" => Some(Binding::Client(&self.client)),
            "printReply" | "pr" => Some(Binding::PrintReply(&self.printer)),
            _ => None,
        }
    }

    pub fn prompt(&self) -> String {
        prompt(&self.service_name, &self.address)
    }

    /// One usage line per operation of the service.
    pub fn operation_usage(&self) -> Vec<String> {
        self.client
            .service()
            .operations()
            .iter()
            .map(usage_line)
            .collect()
    }

    /// The banner shown before the first prompt.
    pub fn usage(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "\nConnecting to {} on {}. Available globals:\n",
            self.service_name, self.address
        );
        let _ = writeln!(
            out,
            "  client - the client connection to {}",
            self.service_name
        );
        for line in self.operation_usage() {
            let _ = writeln!(out, "    {line}");
        }
        let _ = writeln!(
            out,
            "\n  printReply - function to easily print a server reply (alias: pr)"
        );
        out
    }
}

/// The interactive prompt, `<service>@<address>> `.
pub fn prompt(service_name: &str, address: &str) -> String {
    format!("{service_name}@{address}> ")
}

/// `getUser (UserRequest, callback) returns UserReply`
pub fn usage_line(operation: &OperationDefinition) -> String {
    format!(
        "{} ({}, callback) returns {}",
        operation.display_name(),
        operation.request_type,
        operation.response_type
    )
}
