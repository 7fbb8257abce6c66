// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The abstract byte source handed from resolvers to loaders.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::format::FormatTag;

/// An owned, readable byte stream.
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// A disposable source of bytes for one resolution attempt.
///
/// A handle is produced fresh by a resolver, consumed by loaders, and disposed
/// exactly once by the registry. It is never cached or shared between requests.
///
/// Implementations must keep [`peek`](Self::peek) idempotent: repeated calls
/// return the same bytes, and a stream opened afterwards still starts at offset
/// zero.
#[async_trait]
pub trait SourceHandle: Send {
    /// The format the resolver detected, or [`FormatTag::unknown`].
    fn format_hint(&self) -> FormatTag;

    /// Returns up to `count` bytes from the start of the source.
    async fn peek(&mut self, count: usize, cancel: &CancellationToken) -> anyhow::Result<Vec<u8>>;

    /// Opens the full content from offset zero. `None` for procedural sources.
    async fn open_stream(&mut self, cancel: &CancellationToken)
        -> anyhow::Result<Option<ByteStream>>;

    /// Opens a named side channel, such as the `.bin` buffer next to a `.gltf`.
    async fn open_sidecar(
        &mut self,
        extension: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<ByteStream>> {
        let _ = (extension, cancel);
        Ok(None)
    }

    /// A file path that loaders may read directly instead of streaming.
    fn local_path(&self) -> Option<&Path> {
        None
    }

    /// Releases the underlying resources.
    fn dispose(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Reads `handle`'s whole stream into memory.
///
/// Returns `None` when the handle has no stream. Cancellation is checked before
/// and after the read.
pub async fn read_all(
    handle: &mut dyn SourceHandle,
    cancel: &CancellationToken,
) -> anyhow::Result<Option<Vec<u8>>> {
    if cancel.is_cancelled() {
        anyhow::bail!("read cancelled");
    }
    let Some(mut stream) = handle.open_stream(cancel).await? else {
        return Ok(None);
    };

    let mut bytes = Vec::new();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => anyhow::bail!("read cancelled"),
        read = stream.read_to_end(&mut bytes) => { read?; }
    }
    Ok(Some(bytes))
}
