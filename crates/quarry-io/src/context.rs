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

//! Per-request resolution context.

use std::any::Any;
use std::sync::Arc;

use quarry_core::{AssetRef, AssetType};
use tokio_util::sync::CancellationToken;

use crate::error::ResolveError;
use crate::registry::AssetRegistry;

#[derive(Debug)]
struct ChainLink {
    id: String,
    parent: Option<Arc<ChainLink>>,
}

/// The identifiers currently being resolved along one logical call chain.
///
/// A fresh context is created for every top-level request. Resolvers and
/// loaders that need other assets must request them through the context they
/// were given: a nested request for an identifier already on the chain returns
/// `Ok(None)` instead of waiting on itself.
#[derive(Clone)]
pub struct ResolveContext {
    registry: AssetRegistry,
    chain: Option<Arc<ChainLink>>,
}

impl ResolveContext {
    /// An empty chain for a new top-level request.
    pub fn root(registry: &AssetRegistry) -> Self {
        Self {
            registry: registry.clone(),
            chain: None,
        }
    }

    /// A child context with `id` appended to the chain.
    pub fn extend(&self, id: &str) -> Self {
        Self {
            registry: self.registry.clone(),
            chain: Some(Arc::new(ChainLink {
                id: id.to_string(),
                parent: self.chain.clone(),
            })),
        }
    }

    /// Whether `id` is being resolved somewhere up this chain.
    pub fn contains(&self, id: &str) -> bool {
        self.links().any(|link| link.id == id)
    }

    /// The number of identifiers on the chain.
    pub fn depth(&self) -> usize {
        self.links().count()
    }

    /// The chain from the innermost identifier outwards.
    pub fn chain(&self) -> impl Iterator<Item = &str> {
        self.links().map(|link| link.id.as_str())
    }

    /// The registry this context resolves against.
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Requests another asset as part of this chain.
    pub async fn request(
        &self,
        id: &str,
        requested: AssetType,
        cancel: &CancellationToken,
    ) -> Result<Option<AssetRef>, ResolveError> {
        self.registry
            .get_async_within(self, id, requested, cancel)
            .await
    }

    /// Typed form of [`request`](Self::request).
    pub async fn request_typed<T: Any + Send + Sync>(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<T>>, ResolveError> {
        let asset = self.request(id, AssetType::of::<T>(), cancel).await?;
        Ok(asset.and_then(|asset| asset.downcast::<T>()))
    }

    fn links(&self) -> impl Iterator<Item = &ChainLink> {
        std::iter::successors(self.chain.as_deref(), |link| link.parent.as_deref())
    }
}

impl std::fmt::Debug for ResolveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.chain()).finish()
    }
}
