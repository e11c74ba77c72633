//! # Service Client
//!
//! The `client` object of an interactive session: a live handle on one service of the loaded
//! definition.
//!
//! Operations are resolved by name at call time and dispatched according to their streaming
//! kind:
//!
//! | Operation kind          | Request body     | Reply                      |
//! |-------------------------|------------------|----------------------------|
//! | Unary                   | JSON object      | JSON object                |
//! | Server streaming        | JSON object      | JSON array of every reply  |
//! | Client streaming        | JSON array       | JSON object                |
//! | Bidirectional streaming | JSON array       | JSON array of every reply  |
//!
//! The client is cheap to clone and every clone shares the same transport, so any number of
//! calls can be outstanding at once.
use crate::{
    BoxError,
    definition::ServiceDefinition,
    grpc::client::{GrpcClient, GrpcRequestError, ReplyStream},
};
use futures_util::{Stream, TryStreamExt};
use http_body::Body as HttpBody;
use serde_json::Value;
use tonic::{client::GrpcService, transport::Channel};

/// A failed call. Reported through the reply printer, never fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    #[error("Operation '{operation}' not found in service '{service}'")]
    OperationNotFound { service: String, operation: String },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("gRPC client request error: '{0}'")]
    Request(#[from] GrpcRequestError),
    #[error("code={:?} message={:?}", .0.code(), .0.message())]
    Status(tonic::Status),
}

#[derive(Clone, Debug)]
pub struct ServiceClient<S = Channel> {
    service: ServiceDefinition,
    grpc: GrpcClient<S>,
}

impl<S> ServiceClient<S> {
    /// Binds `service` to a transport, e.g. a lazily connected `Channel`.
    pub fn new(service: ServiceDefinition, transport: S) -> Self {
        Self {
            service,
            grpc: GrpcClient::new(transport),
        }
    }

    /// Metadata sent with every call.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.grpc = self.grpc.with_headers(headers);
        self
    }

    pub fn service(&self) -> &ServiceDefinition {
        &self.service
    }
}

impl<S> ServiceClient<S>
where
    S: GrpcService<tonic::body::Body> + Clone + Send + Sync + 'static,
    S::Future: Send,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Calls `operation` with `request` and waits for its reply.
    ///
    /// `operation` may be the declared name (`GetUser`) or the display name (`getUser`).
    pub async fn invoke(&self, operation: &str, request: Value) -> Result<Value, RemoteCallError> {
        let op = self.service.operation(operation).ok_or_else(|| {
            RemoteCallError::OperationNotFound {
                service: self.service.full_name().to_string(),
                operation: operation.to_string(),
            }
        })?;
        let method = op.method();

        tracing::debug!(
            service = self.service.full_name(),
            operation = %op.name,
            client_streaming = op.client_streaming,
            server_streaming = op.server_streaming,
            "invoking operation"
        );

        match (op.client_streaming, op.server_streaming) {
            (false, false) => self
                .grpc
                .unary(method, request)
                .await?
                .map_err(RemoteCallError::Status),
            (false, true) => {
                let replies = self
                    .grpc
                    .server_streaming(method, request)
                    .await?
                    .map_err(RemoteCallError::Status)?;
                collect_replies(replies).await
            }
            (true, false) => {
                let requests = json_array_to_stream(request)?;
                self.grpc
                    .client_streaming(method, requests)
                    .await?
                    .map_err(RemoteCallError::Status)
            }
            (true, true) => {
                let requests = json_array_to_stream(request)?;
                let replies = self
                    .grpc
                    .bidirectional_streaming(method, requests)
                    .await?
                    .map_err(RemoteCallError::Status)?;
                collect_replies(replies).await
            }
        }
    }

    /// Issues a call in the background and hands its result to `handler` exactly once.
    ///
    /// Must be called from within a tokio runtime. There is no way to cancel the call: if the
    /// server never answers, `handler` never runs.
    pub fn call<F>(&self, operation: &str, request: Value, handler: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(Result<Value, RemoteCallError>) + Send + 'static,
    {
        let client = self.clone();
        let operation = operation.to_string();

        tokio::spawn(async move {
            let result = client.invoke(&operation, request).await;
            handler(result);
        })
    }
}

async fn collect_replies(replies: ReplyStream) -> Result<Value, RemoteCallError> {
    let replies: Vec<Value> = replies
        .try_collect()
        .await
        .map_err(RemoteCallError::Status)?;
    Ok(Value::Array(replies))
}

fn json_array_to_stream(
    json: Value,
) -> Result<impl Stream<Item = Value> + Send + 'static, RemoteCallError> {
    match json {
        Value::Array(items) => Ok(tokio_stream::iter(items)),
        _ => Err(RemoteCallError::InvalidInput(
            "Client streaming requires a JSON Array body".to_string(),
        )),
    }
}
