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
use quarry_core::{source::read_all, AssetRef, AssetType, FormatTag, SourceHandle};
use tokio_util::sync::CancellationToken;

use crate::context::ResolveContext;
use crate::plugin::AssetLoader;

/// Raw bytes together with the format they were detected as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// The handle's format hint at load time.
    pub format: FormatTag,
    /// The full content.
    pub bytes: Vec<u8>,
}

/// Loads any handle that has a byte stream into a [`Blob`].
#[derive(Debug, Default, Clone, Copy)]
pub struct BlobLoader;

#[async_trait]
impl AssetLoader for BlobLoader {
    fn name(&self) -> &str {
        "blob"
    }

    fn output_type(&self) -> AssetType {
        AssetType::of::<Blob>()
    }

    fn can_load(&self, _: &dyn SourceHandle) -> bool {
        true
    }

    async fn load(
        &self,
        handle: &mut dyn SourceHandle,
        _: &ResolveContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<AssetRef>> {
        let format = handle.format_hint();
        Ok(read_all(handle, cancel)
            .await?
            .map(|bytes| AssetRef::new(Blob { format, bytes })))
    }
}
