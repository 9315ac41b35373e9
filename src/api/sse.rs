//! Server-sent-event framing for the streaming endpoint

use bytes::Bytes;

use super::response::StreamChunk;

/// Formats a stream chunk as an SSE data frame: `data: {json}\n\n`.
pub fn format_sse_chunk(chunk: &StreamChunk) -> Bytes {
    let json = serde_json::to_string(chunk).expect("StreamChunk should always serialize");
    Bytes::from(format!("data: {}\n\n", json))
}

/// The terminal SSE frame every well-formed stream ends with.
pub fn format_sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}
