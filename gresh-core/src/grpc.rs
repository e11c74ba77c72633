//! # Dynamic gRPC Transport
//!
//! Low-level building blocks for performing gRPC calls against a service whose schema is only
//! known at runtime.
//!
//! Instead of generated Rust types, the components here exchange `serde_json::Value`s and
//! transcode them to the Protobuf wire format using the `MethodDescriptor`s of the loaded
//! definition.
pub mod client;
pub mod codec;
