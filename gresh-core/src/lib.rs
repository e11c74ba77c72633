//! # Gresh Core
//!
//! `gresh-core` is the library behind the `gresh` interactive gRPC shell. It loads a service
//! definition at runtime, lets a user pick one of its services, and binds a live client for that
//! service into an interactive session, without any code generated ahead of time.
//!
//! ## Key Components
//!
//! * **[`definition`]:** Loads `.proto` files (through `protox`) or compiled descriptor sets and
//!   normalises them into a [`definition::DefinitionTree`] of packages, services and operations.
//! * **[`selector`]:** The package-then-service selection protocol, driven by any
//!   [`selector::Chooser`].
//! * **[`session`]:** Binds the selected service to an address and exposes it, together with the
//!   reply printer, as a [`session::SessionContext`].
//! * **[`client`]:** [`client::ServiceClient`], which invokes operations by name with JSON
//!   requests and JSON replies.
//! * **[`reply`]:** [`reply::ReplyPrinter`], the completion handler that prints replies on a
//!   [`reply::Console`].
//!
//! ## Transport
//!
//! * **[`grpc::client::GrpcClient`]:** A dynamic gRPC client using a custom JSON codec.
//! * **[`grpc::codec::JsonCodec`]:** An implementation of `tonic::codec::Codec` that transcodes
//!   JSON to Protobuf bytes (and back) on the fly.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost-reflect` and `tonic` so consumers use compatible versions of the
//! underlying dependencies.
pub mod client;
pub mod definition;
pub mod grpc;
pub mod reply;
pub mod selector;
pub mod session;

// Re-exports
pub use prost_reflect;
pub use tonic;

use definition::LoadError;
use selector::{Chooser, SelectError, Selection};
use session::InvalidAddressError;
use std::path::Path;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddressError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Select(#[from] SelectError),
}

/// Everything that happens before a session can be bound.
///
/// 1. Rejects an empty `address`, before anything is read or asked.
/// 2. Loads the definition at `definition` against `search_root`.
/// 3. Runs the package and service prompts on `chooser`.
pub fn prepare<C>(
    definition: &Path,
    search_root: &Path,
    address: &str,
    chooser: &mut C,
) -> Result<Selection, PrepareError>
where
    C: Chooser + ?Sized,
{
    session::validate_address(address)?;
    let tree = definition::load(definition, search_root)?;
    Ok(selector::select(&tree, definition, chooser)?)
}
