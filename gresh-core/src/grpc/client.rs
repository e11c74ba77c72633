//! # Generic gRPC Client
//!
//! A thin wrapper around `tonic::client::Grpc` that knows nothing about the messages it carries.
//!
//! Every call builds its HTTP/2 path (`/package.Service/Method`) from the `MethodDescriptor`,
//! attaches the session headers as metadata and hands the JSON payload to
//! [`super::codec::JsonCodec`].
//!
//! The client only holds a cloneable transport (usually a lazily connected `Channel`), and each
//! call clones it into its own `Grpc` instance. This lets many calls be in flight at once from
//! a shared `&GrpcClient`.
use super::codec::JsonCodec;
use crate::BoxError;
use futures_util::Stream;
use http_body::Body as HttpBody;
use prost_reflect::MethodDescriptor;
use std::str::FromStr;
use tonic::{
    Request, Response,
    client::{Grpc, GrpcService},
    metadata::{
        MetadataKey, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::Channel,
};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
}

/// JSON messages streamed back by the server.
pub type ReplyStream = tonic::Streaming<serde_json::Value>;

/// A gRPC client that dispatches calls described by `prost-reflect` descriptors.
///
/// It can wrap any service `S` implementing `GrpcService`, such as a
/// `tonic::transport::Channel` or, in tests, a generated server.
#[derive(Clone, Debug)]
pub struct GrpcClient<S = Channel> {
    service: S,
    headers: Vec<(String, String)>,
}

impl<S> GrpcClient<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            headers: Vec::new(),
        }
    }

    /// Metadata attached to every request sent through this client.
    pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = headers;
        self
    }
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// # Returns
    /// * `Ok(Ok(Value))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send the request.
    pub async fn unary(
        &self,
        method: &MethodDescriptor,
        payload: serde_json::Value,
    ) -> Result<Result<serde_json::Value, tonic::Status>, GrpcRequestError> {
        let mut client = self.ready_client().await?;
        let request = self.build_request(payload)?;

        Ok(client
            .unary(request, http_path(method), codec_for(method))
            .await
            .map(Response::into_inner))
    }

    /// Performs a Server Streaming gRPC call (Single Request -> Stream of Responses).
    pub async fn server_streaming(
        &self,
        method: &MethodDescriptor,
        payload: serde_json::Value,
    ) -> Result<Result<ReplyStream, tonic::Status>, GrpcRequestError> {
        let mut client = self.ready_client().await?;
        let request = self.build_request(payload)?;

        Ok(client
            .server_streaming(request, http_path(method), codec_for(method))
            .await
            .map(Response::into_inner))
    }

    /// Performs a Client Streaming gRPC call (Stream of Requests -> Single Response).
    pub async fn client_streaming(
        &self,
        method: &MethodDescriptor,
        payload_stream: impl Stream<Item = serde_json::Value> + Send + 'static,
    ) -> Result<Result<serde_json::Value, tonic::Status>, GrpcRequestError> {
        let mut client = self.ready_client().await?;
        let request = self.build_request(payload_stream)?;

        Ok(client
            .client_streaming(request, http_path(method), codec_for(method))
            .await
            .map(Response::into_inner))
    }

    /// Performs a Bidirectional Streaming gRPC call (Stream of Requests -> Stream of Responses).
    pub async fn bidirectional_streaming(
        &self,
        method: &MethodDescriptor,
        payload_stream: impl Stream<Item = serde_json::Value> + Send + 'static,
    ) -> Result<Result<ReplyStream, tonic::Status>, GrpcRequestError> {
        let mut client = self.ready_client().await?;
        let request = self.build_request(payload_stream)?;

        Ok(client
            .streaming(request, http_path(method), codec_for(method))
            .await
            .map(Response::into_inner))
    }

    async fn ready_client(&self) -> Result<Grpc<S>, GrpcRequestError> {
        let mut client = Grpc::new(self.service.clone());
        client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))?;
        Ok(client)
    }

    fn build_request<T>(&self, payload: T) -> Result<Request<T>, GrpcRequestError> {
        let mut request = Request::new(payload);
        for (k, v) in &self.headers {
            let key =
                MetadataKey::from_str(k).map_err(|source| GrpcRequestError::InvalidMetadataKey {
                    key: k.clone(),
                    source,
                })?;
            let val = MetadataValue::from_str(v).map_err(|source| {
                GrpcRequestError::InvalidMetadataValue {
                    key: k.clone(),
                    source,
                }
            })?;
            request.metadata_mut().insert(key, val);
        }
        Ok(request)
    }
}

fn codec_for(method: &MethodDescriptor) -> JsonCodec {
    JsonCodec::new(method.input(), method.output())
}

fn http_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}
