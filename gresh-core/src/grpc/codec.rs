//! # JSON <-> Protobuf Codec
//!
//! Implements `tonic::codec::Codec` so `tonic` can carry `serde_json::Value` directly.
//!
//! * **Encoder**: checks the JSON value against the request `MessageDescriptor` through
//!   `prost_reflect::DynamicMessage` and writes the resulting message to the wire.
//! * **Decoder**: decodes wire bytes into a `DynamicMessage` of the response type and turns it
//!   back into JSON for the reply printer.
//!
//! A request that does not match its schema never leaves the process: the encoder fails with
//! `Status::invalid_argument`, which reaches the user as a regular call failure.
use prost::{Message, bytes::Buf};
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// Bridges `serde_json::Value` and the Protobuf binary format for a single method.
pub struct JsonCodec {
    request: MessageDescriptor,
    response: MessageDescriptor,
}

impl JsonCodec {
    pub fn new(request: MessageDescriptor, response: MessageDescriptor) -> Self {
        Self { request, response }
    }
}

impl Codec for JsonCodec {
    type Encode = serde_json::Value;
    type Decode = serde_json::Value;

    type Encoder = JsonEncoder;
    type Decoder = JsonDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        JsonEncoder(self.request.clone())
    }

    fn decoder(&mut self) -> Self::Decoder {
        JsonDecoder(self.response.clone())
    }
}

pub struct JsonEncoder(MessageDescriptor);

impl Encoder for JsonEncoder {
    type Item = serde_json::Value;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        to_message(&self.0, item)?
            .encode(dst)
            .map_err(|e| Status::internal(format!("Failed to encode Protobuf message: {e}")))
    }
}

pub struct JsonDecoder(MessageDescriptor);

impl Decoder for JsonDecoder {
    type Item = serde_json::Value;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        to_json(&self.0, src).map(Some)
    }
}

/// Checks `json` against `desc`. `serde_json::Value` is its own deserializer, so it feeds
/// `DynamicMessage` directly.
fn to_message(desc: &MessageDescriptor, json: serde_json::Value) -> Result<DynamicMessage, Status> {
    DynamicMessage::deserialize(desc.clone(), json).map_err(|e| {
        Status::invalid_argument(format!(
            "request does not match message '{}': {e}",
            desc.full_name()
        ))
    })
}

fn to_json(desc: &MessageDescriptor, src: impl Buf) -> Result<serde_json::Value, Status> {
    let mut msg = DynamicMessage::new(desc.clone());
    msg.merge(src)
        .map_err(|e| Status::internal(format!("Failed to decode Protobuf bytes: {e}")))?;

    serde_json::to_value(&msg)
        .map_err(|e| Status::internal(format!("Failed to map reply to JSON: {e}")))
}
