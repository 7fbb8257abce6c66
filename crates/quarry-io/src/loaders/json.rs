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

use anyhow::Context;
use async_trait::async_trait;
use quarry_core::{source::read_all, AssetRef, AssetType, SourceHandle};
use tokio_util::sync::CancellationToken;

use crate::context::ResolveContext;
use crate::plugin::AssetLoader;

/// A parsed JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonDocument(pub serde_json::Value);

/// Parses `json` and `gltf` handles into a [`JsonDocument`].
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLoader;

#[async_trait]
impl AssetLoader for JsonLoader {
    fn name(&self) -> &str {
        "json"
    }

    fn output_type(&self) -> AssetType {
        AssetType::of::<JsonDocument>()
    }

    fn can_load(&self, handle: &dyn SourceHandle) -> bool {
        matches!(handle.format_hint().as_str(), "json" | "gltf")
    }

    async fn load(
        &self,
        handle: &mut dyn SourceHandle,
        _: &ResolveContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<AssetRef>> {
        let Some(bytes) = read_all(handle, cancel).await? else {
            return Ok(None);
        };
        let value = serde_json::from_slice(&bytes).context("Malformed JSON document")?;
        Ok(Some(AssetRef::new(JsonDocument(value))))
    }
}
