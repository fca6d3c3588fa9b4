//! Plain-text streaming of upstream chunks.
//!
//! Converts a provider chunk stream into the raw byte stream sent to the
//! caller: only the first choice's incremental text is forwarded, with no
//! framing, so concatenating the body reconstructs the full message.

use std::convert::Infallible;

use async_stream::stream;
use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use tracing::{debug, warn};

use crate::provider::ChunkStream;

/// Convert upstream chunks into body frames.
///
/// The body is already committed when a mid-stream error arrives, so the
/// error is logged and the stream ends after the text relayed so far.
pub fn chunks_to_text_stream(
    mut chunks: ChunkStream,
    request_id: String,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    stream! {
        let mut fragments = 0usize;

        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    if let Some(text) = chunk.delta_text() {
                        fragments += 1;
                        yield Ok(Bytes::copy_from_slice(text.as_bytes()));
                    }
                }
                Err(e) => {
                    warn!(
                        request_id = %request_id,
                        fragments,
                        error = %e,
                        "Upstream stream failed mid-response, closing body"
                    );
                    return;
                }
            }
        }

        debug!(request_id = %request_id, fragments, "Upstream stream complete");
    }
}
