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

//! # Quarry Core
//!
//! Foundational crate containing the value types and interface contracts shared
//! by every part of the asset resolution pipeline: identifiers, format tags,
//! byte sources, runtime asset types and the plugin ordering algorithm.
//!
//! It has no knowledge of how requests are scheduled, cached or deduplicated;
//! that lives in `quarry-io`.

#![warn(missing_docs)]

pub mod asset;
pub mod format;
pub mod graph;
pub mod identifier;
pub mod plugin;
pub mod source;

pub use asset::{AssetKey, AssetRef, AssetType, TypeTable};
pub use format::{FormatSniffer, FormatTag, Signature};
pub use identifier::{Identifier, IdentifierError};
pub use plugin::{Plugin, PluginDescriptor};
pub use source::{ByteStream, SourceHandle};
