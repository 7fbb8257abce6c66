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
use quarry_core::{source::read_all, AssetRef, AssetType, FormatTag, SourceHandle};
use tokio_util::sync::CancellationToken;

use crate::context::ResolveContext;
use crate::plugin::AssetLoader;

/// Formats whose content is UTF-8 text.
const TEXT_FORMATS: &[&str] = &["txt", "json", "toml", "ron", "gltf", "obj", "csv", "md"];

/// A UTF-8 document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextAsset {
    /// The handle's format hint at load time.
    pub format: FormatTag,
    /// The decoded content.
    pub text: String,
}

/// Decodes text formats into a [`TextAsset`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextLoader;

#[async_trait]
impl AssetLoader for TextLoader {
    fn name(&self) -> &str {
        "text"
    }

    fn output_type(&self) -> AssetType {
        AssetType::of::<TextAsset>()
    }

    fn can_load(&self, handle: &dyn SourceHandle) -> bool {
        TEXT_FORMATS.contains(&handle.format_hint().as_str())
    }

    async fn load(
        &self,
        handle: &mut dyn SourceHandle,
        _: &ResolveContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<AssetRef>> {
        let format = handle.format_hint();
        let Some(bytes) = read_all(handle, cancel).await? else {
            return Ok(None);
        };
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{format} content is not valid UTF-8"))?;
        Ok(Some(AssetRef::new(TextAsset { format, text })))
    }
}
