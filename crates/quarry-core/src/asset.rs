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

//! Runtime type descriptors and type-erased, shareable asset values.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A runtime description of an asset type.
///
/// Equality and hashing only consider the [`TypeId`]; the name is kept for
/// diagnostics.
#[derive(Clone, Copy)]
pub struct AssetType {
    id: TypeId,
    name: &'static str,
}

impl AssetType {
    /// The descriptor for `T`. Trait objects such as `dyn Texture` are allowed.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The universal type every asset is assignable to.
    pub fn any() -> Self {
        Self::of::<dyn Any + Send + Sync>()
    }

    /// Whether this is [`AssetType::any`].
    pub fn is_any(&self) -> bool {
        *self == Self::any()
    }

    /// The underlying [`TypeId`].
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The Rust type name, for logging.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for AssetType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AssetType {}

impl Hash for AssetType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Explicitly registered subtype relationships between [`AssetType`]s.
///
/// Rust has no runtime subtyping, so a concrete type is only assignable to
/// itself, to [`AssetType::any`], or to a type reachable through
/// [`register_supertype`](Self::register_supertype) edges.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    supertypes: HashMap<AssetType, Vec<AssetType>>,
}

impl TypeTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that values of `sub` may be handed out as `sup`.
    pub fn register_supertype(&mut self, sub: AssetType, sup: AssetType) {
        let entry = self.supertypes.entry(sub).or_default();
        if !entry.contains(&sup) {
            entry.push(sup);
        }
    }

    /// Whether a value of type `provided` satisfies a request for `requested`.
    pub fn is_assignable(&self, requested: AssetType, provided: AssetType) -> bool {
        if requested == provided || requested.is_any() {
            return true;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([provided]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            for &sup in self.supertypes.get(&current).into_iter().flatten() {
                if sup == requested {
                    return true;
                }
                queue.push_back(sup);
            }
        }
        false
    }
}

/// Identity of a live asset, derived from its allocation address.
///
/// Only meaningful while the [`AssetRef`] it was taken from is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetKey(usize);

/// A cheaply clonable, type-erased handle to a loaded asset.
#[derive(Clone)]
pub struct AssetRef {
    value: Arc<dyn Any + Send + Sync>,
    ty: AssetType,
}

impl AssetRef {
    /// Wraps `value`, tagging it with its concrete type.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an existing `Arc`, keeping its identity.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            ty: AssetType::of::<T>(),
        }
    }

    /// The concrete type of the wrapped value.
    pub fn asset_type(&self) -> AssetType {
        self.ty
    }

    /// Recovers the typed `Arc`, sharing the same allocation.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Borrows the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Whether both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &AssetRef) -> bool {
        self.key() == other.key()
    }

    /// The identity key of this allocation.
    pub fn key(&self) -> AssetKey {
        AssetKey(Arc::as_ptr(&self.value) as *const () as usize)
    }
}

impl fmt::Debug for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetRef")
            .field("type", &self.ty)
            .field("key", &self.key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Texture: Send + Sync {}

    struct Png;
    impl Texture for Png {}

    struct Mesh;

    #[test]
    fn test_identity_and_downcast() {
        let asset = AssetRef::new(42u32);
        let clone = asset.clone();
        assert!(asset.ptr_eq(&clone));
        assert_eq!(asset.asset_type(), AssetType::of::<u32>());
        assert_eq!(asset.downcast_ref::<u32>(), Some(&42));
        assert!(asset.downcast::<u64>().is_none());

        let typed = asset.downcast::<u32>().unwrap();
        assert!(AssetRef::from_arc(typed).ptr_eq(&asset));
        assert!(!asset.ptr_eq(&AssetRef::new(42u32)));
    }

    #[test]
    fn test_any_accepts_everything() {
        let table = TypeTable::new();
        assert!(table.is_assignable(AssetType::any(), AssetType::of::<Mesh>()));
        assert!(table.is_assignable(AssetType::of::<Mesh>(), AssetType::of::<Mesh>()));
        assert!(!table.is_assignable(AssetType::of::<Mesh>(), AssetType::of::<Png>()));
    }

    #[test]
    fn test_registered_supertypes_are_transitive() {
        struct Resource;
        let mut table = TypeTable::new();
        table.register_supertype(AssetType::of::<Png>(), AssetType::of::<dyn Texture>());
        table.register_supertype(AssetType::of::<dyn Texture>(), AssetType::of::<Resource>());

        assert!(table.is_assignable(AssetType::of::<dyn Texture>(), AssetType::of::<Png>()));
        assert!(table.is_assignable(AssetType::of::<Resource>(), AssetType::of::<Png>()));
        assert!(!table.is_assignable(AssetType::of::<Png>(), AssetType::of::<dyn Texture>()));
    }

    #[test]
    fn test_supertype_cycle_terminates() {
        let mut table = TypeTable::new();
        table.register_supertype(AssetType::of::<Png>(), AssetType::of::<Mesh>());
        table.register_supertype(AssetType::of::<Mesh>(), AssetType::of::<Png>());
        assert!(!table.is_assignable(AssetType::of::<u8>(), AssetType::of::<Png>()));
    }
}
