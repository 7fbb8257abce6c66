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

//! Built-in resolvers.

mod filesystem;
mod memory;

pub use filesystem::FileSystemResolver;
pub use memory::MemoryResolver;

use quarry_core::{FormatSniffer, FormatTag, Identifier};

/// Picks a format for `id` from its extension, then from a `format` query
/// parameter. Returns the unknown tag when neither is recognized.
pub(crate) fn format_from_identifier(formats: &FormatSniffer, id: &Identifier) -> FormatTag {
    let from_extension = id
        .extension()
        .map(|ext| formats.by_extension(ext))
        .unwrap_or_default();
    if !from_extension.is_unknown() {
        return from_extension;
    }
    id.query_value("format").map(FormatTag::new).unwrap_or_default()
}
