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

use async_trait::async_trait;
use quarry_core::{ByteStream, FormatTag, SourceHandle};
use tokio_util::sync::CancellationToken;

/// A handle with no bytes, for assets that loaders build from the identifier
/// alone.
#[derive(Debug, Clone, Default)]
pub struct ProceduralSource {
    format: FormatTag,
}

impl ProceduralSource {
    /// A procedural handle tagged with `format`.
    pub fn new(format: FormatTag) -> Self {
        Self { format }
    }
}

#[async_trait]
impl SourceHandle for ProceduralSource {
    fn format_hint(&self) -> FormatTag {
        self.format.clone()
    }

    async fn peek(&mut self, _: usize, _: &CancellationToken) -> anyhow::Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn open_stream(&mut self, _: &CancellationToken) -> anyhow::Result<Option<ByteStream>> {
        Ok(None)
    }
}
