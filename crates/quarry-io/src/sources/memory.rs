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

use std::io::Cursor;
use std::sync::Arc;

use ahash::AHashMap;
use async_trait::async_trait;
use quarry_core::{ByteStream, FormatTag, SourceHandle};
use tokio_util::sync::CancellationToken;

/// A handle over bytes already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
    format: FormatTag,
    sidecars: AHashMap<String, Arc<[u8]>>,
}

impl MemorySource {
    /// Wraps `bytes`, reporting `format` as the format hint.
    pub fn new(bytes: impl Into<Arc<[u8]>>, format: FormatTag) -> Self {
        Self {
            bytes: bytes.into(),
            format,
            sidecars: AHashMap::new(),
        }
    }

    /// Attaches a side channel reachable through `open_sidecar(extension)`.
    pub fn with_sidecar(mut self, extension: &str, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.sidecars
            .insert(FormatTag::new(extension).as_str().to_string(), bytes.into());
        self
    }

    /// The full content.
    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }
}

fn stream(bytes: &Arc<[u8]>) -> ByteStream {
    Box::pin(Cursor::new(ArcBytes(bytes.clone())))
}

struct ArcBytes(Arc<[u8]>);

impl AsRef<[u8]> for ArcBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[async_trait]
impl SourceHandle for MemorySource {
    fn format_hint(&self) -> FormatTag {
        self.format.clone()
    }

    async fn peek(&mut self, count: usize, _: &CancellationToken) -> anyhow::Result<Vec<u8>> {
        let end = count.min(self.bytes.len());
        Ok(self.bytes[..end].to_vec())
    }

    async fn open_stream(&mut self, _: &CancellationToken) -> anyhow::Result<Option<ByteStream>> {
        Ok(Some(stream(&self.bytes)))
    }

    async fn open_sidecar(
        &mut self,
        extension: &str,
        _: &CancellationToken,
    ) -> anyhow::Result<Option<ByteStream>> {
        let key = FormatTag::new(extension);
        Ok(self.sidecars.get(key.as_str()).map(stream))
    }
}
