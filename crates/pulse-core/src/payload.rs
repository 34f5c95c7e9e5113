//! The fixed JSON body returned by every successful request.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{PulseError, Result};

/// `{"message": "..."}`, constant for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn success() -> Self {
        Self { message: "success".to_string() }
    }

    /// Encode as a JSON line: the document followed by `\n`, the way a
    /// streaming JSON encoder writes it.
    pub fn to_json_line(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(32).writer();
        serde_json::to_writer(&mut buf, self)
            .map_err(|e| PulseError::Internal(format!("encode payload failed: {e}")))?;
        let mut buf = buf.into_inner();
        buf.put_u8(b'\n');
        Ok(buf.freeze())
    }
}
