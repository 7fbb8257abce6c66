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

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use quarry_core::{
    plugin::Plugin, AssetType, FormatSniffer, Identifier, PluginDescriptor, SourceHandle,
};
use tokio_util::sync::CancellationToken;

use super::format_from_identifier;
use crate::context::ResolveContext;
use crate::plugin::AssetResolver;
use crate::sources::FileSource;

/// Resolves `<namespace>::<relative path>` against an ordered list of root
/// directories. The first root containing the file wins.
pub struct FileSystemResolver {
    descriptor: PluginDescriptor,
    namespace: String,
    roots: Vec<PathBuf>,
    formats: Arc<FormatSniffer>,
}

impl FileSystemResolver {
    /// A resolver serving `namespace` from `roots`.
    pub fn new(
        descriptor: PluginDescriptor,
        namespace: impl Into<String>,
        roots: Vec<PathBuf>,
        formats: Arc<FormatSniffer>,
    ) -> Self {
        Self {
            descriptor,
            namespace: namespace.into(),
            roots,
            formats,
        }
    }

    /// The directories searched, in order.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Accepts only relative paths made of plain components.
fn is_contained(path: &Path) -> bool {
    let mut components = path.components().peekable();
    components.peek().is_some()
        && components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl Plugin for FileSystemResolver {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl AssetResolver for FileSystemResolver {
    fn can_resolve(&self, id: &Identifier, _: AssetType) -> bool {
        id.namespace() == self.namespace && is_contained(Path::new(id.path()))
    }

    async fn resolve(
        &self,
        id: &Identifier,
        _: AssetType,
        _: &ResolveContext,
        cancel: &CancellationToken,
    ) -> anyhow::Result<Option<Box<dyn SourceHandle>>> {
        let relative = Path::new(id.path());
        if !is_contained(relative) {
            debug!("Rejecting '{id}': path escapes the asset roots");
            return Ok(None);
        }

        for root in &self.roots {
            let candidate = root.join(relative);
            let is_file = tokio::fs::metadata(&candidate)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }

            let mut source = FileSource::new(&candidate, format_from_identifier(&self.formats, id));
            if source.format_hint().is_unknown() {
                let header = source.peek(self.formats.peek_len(), cancel).await?;
                source.set_format(self.formats.by_bytes(&header));
            }
            debug!("Found '{id}' at '{}'", candidate.display());
            return Ok(Some(Box::new(source)));
        }
        Ok(None)
    }
}
