//! Text encodings accepted by [`SegmentChain::append_str_with_encoding`](crate::SegmentChain::append_str_with_encoding).

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How text is turned into bytes before it is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// UTF-16, little-endian, no byte order mark.
    Utf16Le,
    /// UTF-16, big-endian, no byte order mark.
    Utf16Be,
}

impl TextEncoding {
    /// Encodes `text` using this encoding.
    pub fn encode(self, text: &str) -> Bytes {
        match self {
            TextEncoding::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
            TextEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            TextEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
        }
    }
}
