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

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use async_trait::async_trait;
use quarry_core::{
    plugin::Plugin, AssetType, FormatSniffer, Identifier, PluginDescriptor, SourceHandle,
};
use tokio_util::sync::CancellationToken;

use super::format_from_identifier;
use crate::context::ResolveContext;
use crate::plugin::AssetResolver;
use crate::sources::MemorySource;

/// Resolves `<namespace>::<path>` against byte buffers inserted at runtime.
pub struct MemoryResolver {
    descriptor: PluginDescriptor,
    namespace: String,
    formats: Arc<FormatSniffer>,
    entries: RwLock<AHashMap<String, Arc<[u8]>>>,
}

impl MemoryResolver {
    /// An empty resolver serving `namespace`.
    pub fn new(
        descriptor: PluginDescriptor,
        namespace: impl Into<String>,
        formats: Arc<FormatSniffer>,
    ) -> Self {
        Self {
            descriptor,
            namespace: namespace.into(),
            formats,
            entries: RwLock::new(AHashMap::new()),
        }
    }

    /// Makes `bytes` available under `path`, replacing any previous buffer.
    pub fn insert(&self, path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into(), bytes.into());
    }

    /// Removes the buffer under `path`.
    pub fn remove(&self, path: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path)
            .is_some()
    }

    fn lookup(&self, path: &str) -> Option<Arc<[u8]>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }
}

impl Plugin for MemoryResolver {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl AssetResolver for MemoryResolver {
    fn can_resolve(&self, id: &Identifier, _: AssetType) -> bool {
        id.namespace() == self.namespace && self.lookup(id.path()).is_some()
    }

    async fn resolve(
        &self,
        id: &Identifier,
        _: AssetType,
        _: &ResolveContext,
        _: &CancellationToken,
    ) -> anyhow::Result<Option<Box<dyn SourceHandle>>> {
        let Some(bytes) = self.lookup(id.path()) else {
            return Ok(None);
        };
        let mut format = format_from_identifier(&self.formats, id);
        if format.is_unknown() {
            format = self.formats.by_bytes(&bytes);
        }
        Ok(Some(Box::new(MemorySource::new(bytes, format))))
    }
}
