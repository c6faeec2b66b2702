//! Framed codecs for stream transports.
//!
//! Both codecs use a 4-byte length prefix (LengthDelimitedCodec) so the host
//! end can be any process that speaks length-prefixed JSON over a pipe or socket.
//! - [`JsonCodec`]: typed frames (serde_json on both sides)
//! - [`PayloadCodec`]: already-encoded JSON strings, as handed over by `Transport`

use std::io;
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

const LARGE_FRAME_BYTES: usize = 100_000;

fn length_delimited() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .new_codec()
}

/// Codec that frames messages with a length prefix and serializes with JSON.
pub struct JsonCodec<T> {
    inner: LengthDelimitedCodec,
    _phantom: PhantomData<T>,
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            inner: length_delimited(),
            _phantom: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Decoder for JsonCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(bytes) => {
                let item = serde_json::from_slice(&bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec<T> {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json =
            serde_json::to_vec(&item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        trace_frame(json.len());
        self.inner.encode(Bytes::from(json), dst)
    }
}

/// Codec for payloads that are already JSON text.
///
/// Encoding does not re-serialize; decoding only checks UTF-8.
pub struct PayloadCodec {
    inner: LengthDelimitedCodec,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCodec {
    pub fn new() -> Self {
        Self {
            inner: length_delimited(),
        }
    }
}

impl Decoder for PayloadCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(bytes) => String::from_utf8(bytes.to_vec())
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }
}

impl Encoder<String> for PayloadCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        trace_frame(item.len());
        self.inner.encode(Bytes::from(item), dst)
    }
}

fn trace_frame(len: usize) {
    tracing::trace!(json_size_bytes = len, "Encoding frame");
    if len > LARGE_FRAME_BYTES {
        tracing::debug!(
            json_size_bytes = len,
            json_size_kb = len / 1024,
            "Large frame being encoded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::{CorrelationId, Envelope, Inbound, Notification};
    use serde_json::json;

    #[test]
    fn json_codec_carries_inbound_outcome() {
        let mut codec = JsonCodec::<Inbound>::new();
        let mut buf = BytesMut::new();

        let msg = Inbound::outcome(CorrelationId::from("req_1"), Notification::success(json!(42)));
        codec.encode(msg.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(decoded, msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn payload_frames_decode_as_envelopes() {
        let env = Envelope::command("sum", vec![json!(1), json!(2)], CorrelationId::from("req_9"));

        let mut buf = BytesMut::new();
        PayloadCodec::new()
            .encode(env.to_json().unwrap(), &mut buf)
            .unwrap();

        let decoded = JsonCodec::<Envelope>::new().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, env);
    }

    #[test]
    fn partial_frame_waits_for_more_bytes() {
        let mut buf = BytesMut::new();
        PayloadCodec::new()
            .encode(r#"{"kind":"event","event":"x","args":[]}"#.to_string(), &mut buf)
            .unwrap();

        let mut partial = buf.split_to(buf.len() - 3);
        let mut codec = PayloadCodec::new();
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.unsplit(buf);
        let decoded = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(decoded, r#"{"kind":"event","event":"x","args":[]}"#);
    }

    #[test]
    fn malformed_json_is_invalid_data() {
        let mut buf = BytesMut::new();
        PayloadCodec::new()
            .encode("{not json".to_string(), &mut buf)
            .unwrap();

        let err = JsonCodec::<Inbound>::new().decode(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
