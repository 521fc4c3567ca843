//! Native messaging framing.
//!
//! The native host speaks the host environment's native messaging
//! convention over its stdio: each record is a 4-byte little-endian
//! length prefix followed by a JSON body. The relay never interprets
//! the body beyond parsing it as JSON.

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Upper bound on one framed record, matching the 1 MiB limit of the
/// native messaging convention.
pub const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Codec for length-prefixed JSON records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeMessageCodec;

impl<'a> Encoder<&'a Value> for NativeMessageCodec {
    type Error = io::Error;

    fn encode(&mut self, record: &'a Value, dst: &mut BytesMut) -> io::Result<()> {
        let body = serde_json::to_vec(record)?;
        if body.len() > MAX_RECORD_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("record of {} bytes exceeds the frame limit", body.len()),
            ));
        }
        dst.reserve(4 + body.len());
        dst.put_u32_le(body.len() as u32);
        dst.put_slice(&body);
        Ok(())
    }
}

impl Decoder for NativeMessageCodec {
    type Item = Value;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<Value>> {
        if src.len() < 4 {
            return Ok(None);
        }

        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&src[..4]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_RECORD_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame of {len} bytes exceeds the frame limit"),
            ));
        }

        if src.len() < 4 + len {
            src.reserve(4 + len - src.len());
            return Ok(None);
        }

        src.advance(4);
        let body = src.split_to(len);
        Ok(Some(serde_json::from_slice(&body)?))
    }
}
