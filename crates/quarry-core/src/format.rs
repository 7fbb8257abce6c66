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

//! Format tags and the sniffer that maps extensions, MIME types and byte
//! signatures onto them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A normalized, case-insensitive format name such as `png` or `gltf`.
///
/// The unknown format is a distinct value rather than an absent one, so it can
/// be compared and stored like any other tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatTag(Cow<'static, str>);

impl FormatTag {
    /// Creates a tag, trimming whitespace and a leading `.` and lowercasing.
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        let name = name.strip_prefix('.').unwrap_or(name);
        Self(Cow::Owned(name.to_ascii_lowercase()))
    }

    /// The tag for an unrecognized format.
    pub const fn unknown() -> Self {
        Self(Cow::Borrowed(""))
    }

    /// Whether this is [`FormatTag::unknown`].
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }

    /// The normalized name. Empty for the unknown tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FormatTag {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            f.write_str("<unknown>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for FormatTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A magic byte sequence expected at a fixed offset in a file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Byte offset at which `magic` must appear.
    pub offset: usize,
    /// The bytes to match.
    pub magic: Vec<u8>,
    /// The format reported on a match.
    pub tag: FormatTag,
}

impl Signature {
    /// Creates a signature.
    pub fn new(offset: usize, magic: impl Into<Vec<u8>>, tag: impl Into<FormatTag>) -> Self {
        Self {
            offset,
            magic: magic.into(),
            tag: tag.into(),
        }
    }

    /// Whether `header` is long enough and carries `magic` at `offset`.
    pub fn matches(&self, header: &[u8]) -> bool {
        header
            .get(self.offset..self.offset + self.magic.len())
            .is_some_and(|window| window == self.magic.as_slice())
    }

    fn end(&self) -> usize {
        self.offset + self.magic.len()
    }
}

#[derive(Debug, Default)]
struct Tables {
    extensions: HashMap<String, FormatTag>,
    mime_subtypes: HashMap<String, FormatTag>,
    signatures: Vec<Signature>,
}

/// Maps extensions, MIME types and header bytes to [`FormatTag`]s.
///
/// All three tables can be extended at runtime from any thread. Extension and
/// MIME registrations overwrite earlier ones; signatures only accumulate and are
/// tried newest first.
#[derive(Debug, Default)]
pub struct FormatSniffer {
    tables: RwLock<Tables>,
}

impl FormatSniffer {
    /// A sniffer with no registrations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A sniffer seeded with common image, model, audio and text formats.
    pub fn new() -> Self {
        let sniffer = Self::empty();

        for (ext, tag) in [
            ("png", "png"),
            ("jpg", "jpg"),
            ("jpeg", "jpg"),
            ("gif", "gif"),
            ("bmp", "bmp"),
            ("tga", "tga"),
            ("webp", "webp"),
            ("ktx2", "ktx2"),
            ("dds", "dds"),
            ("hdr", "hdr"),
            ("exr", "exr"),
            ("gltf", "gltf"),
            ("glb", "glb"),
            ("obj", "obj"),
            ("fbx", "fbx"),
            ("wav", "wav"),
            ("ogg", "ogg"),
            ("mp3", "mp3"),
            ("flac", "flac"),
            ("txt", "txt"),
            ("text", "txt"),
            ("json", "json"),
            ("toml", "toml"),
            ("ron", "ron"),
            ("bin", "bin"),
        ] {
            sniffer.register_extension(ext, tag);
        }

        for (subtype, tag) in [
            ("png", "png"),
            ("jpeg", "jpg"),
            ("gif", "gif"),
            ("bmp", "bmp"),
            ("webp", "webp"),
            ("ktx2", "ktx2"),
            ("gltf+json", "gltf"),
            ("gltf-binary", "glb"),
            ("wav", "wav"),
            ("x-wav", "wav"),
            ("ogg", "ogg"),
            ("mpeg", "mp3"),
            ("flac", "flac"),
            ("plain", "txt"),
            ("json", "json"),
            ("toml", "toml"),
            ("octet-stream", "bin"),
        ] {
            sniffer.register_mime(subtype, tag);
        }

        for signature in [
            Signature::new(0, *b"\x89PNG\r\n\x1a\n", "png"),
            Signature::new(0, [0xFF_u8, 0xD8, 0xFF], "jpg"),
            Signature::new(0, *b"GIF8", "gif"),
            Signature::new(0, *b"BM", "bmp"),
            Signature::new(0, *b"glTF", "glb"),
            Signature::new(0, *b"OggS", "ogg"),
            Signature::new(0, *b"fLaC", "flac"),
            Signature::new(8, *b"WEBP", "webp"),
            Signature::new(8, *b"WAVE", "wav"),
            Signature::new(0, *b"DDS ", "dds"),
            Signature::new(0, *b"\xABKTX 20\xBB\r\n\x1a\n", "ktx2"),
        ] {
            sniffer.register_signature(signature);
        }

        sniffer
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Maps `extension` (with or without the leading dot) to `tag`.
    pub fn register_extension(&self, extension: &str, tag: impl Into<FormatTag>) {
        let key = FormatTag::new(extension).as_str().to_string();
        self.write().extensions.insert(key, tag.into());
    }

    /// Maps a MIME type or bare subtype to `tag`. Only the subtype is kept.
    pub fn register_mime(&self, mime: &str, tag: impl Into<FormatTag>) {
        let key = mime_subtype(mime);
        self.write().mime_subtypes.insert(key, tag.into());
    }

    /// Adds a header signature that takes priority over all earlier ones.
    pub fn register_signature(&self, signature: Signature) {
        self.write().signatures.push(signature);
    }

    /// Looks up a file extension.
    pub fn by_extension(&self, extension: &str) -> FormatTag {
        let key = FormatTag::new(extension);
        if key.is_unknown() {
            return FormatTag::unknown();
        }
        self.read()
            .extensions
            .get(key.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Looks up the extension of `path`.
    pub fn by_path(&self, path: &Path) -> FormatTag {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.by_extension(ext))
            .unwrap_or_default()
    }

    /// Looks up a MIME type such as `image/png; charset=binary`.
    ///
    /// An unregistered subtype made only of ASCII letters and digits is used as
    /// the tag itself.
    pub fn by_mime(&self, mime: &str) -> FormatTag {
        let subtype = mime_subtype(mime);
        if subtype.is_empty() {
            return FormatTag::unknown();
        }
        if let Some(tag) = self.read().mime_subtypes.get(&subtype) {
            return tag.clone();
        }
        if subtype.chars().all(|c| c.is_ascii_alphanumeric()) {
            FormatTag::new(subtype)
        } else {
            FormatTag::unknown()
        }
    }

    /// Matches `header` against the signatures, newest registration first.
    pub fn by_bytes(&self, header: &[u8]) -> FormatTag {
        self.read()
            .signatures
            .iter()
            .rev()
            .find(|signature| signature.matches(header))
            .map(|signature| signature.tag.clone())
            .unwrap_or_default()
    }

    /// The number of header bytes needed to evaluate every signature.
    pub fn peek_len(&self) -> usize {
        self.read()
            .signatures
            .iter()
            .map(Signature::end)
            .max()
            .unwrap_or(0)
    }
}

fn mime_subtype(mime: &str) -> String {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    let subtype = essence
        .split_once('/')
        .map_or(essence, |(_, subtype)| subtype);
    subtype.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_normalization() {
        assert_eq!(FormatTag::new(" .PNG "), FormatTag::new("png"));
        assert!(FormatTag::new("").is_unknown());
        assert_eq!(FormatTag::unknown().to_string(), "<unknown>");
        assert_eq!(FormatTag::default(), FormatTag::unknown());
    }

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        let sniffer = FormatSniffer::new();
        assert_eq!(sniffer.by_extension("JPEG"), FormatTag::new("jpg"));
        assert_eq!(sniffer.by_extension(".gltf"), FormatTag::new("gltf"));
        assert!(sniffer.by_extension("xyz").is_unknown());
        assert!(sniffer.by_extension("").is_unknown());
        assert_eq!(
            sniffer.by_path(Path::new("a/b/Model.GLB")),
            FormatTag::new("glb")
        );
    }

    #[test]
    fn test_extension_registration_overwrites() {
        let sniffer = FormatSniffer::new();
        sniffer.register_extension("bin", "glb");
        assert_eq!(sniffer.by_extension("bin"), FormatTag::new("glb"));
    }

    #[test]
    fn test_mime_lookup() {
        let sniffer = FormatSniffer::new();
        assert_eq!(sniffer.by_mime("image/jpeg"), FormatTag::new("jpg"));
        assert_eq!(
            sniffer.by_mime("text/plain; charset=utf-8"),
            FormatTag::new("txt")
        );
        assert_eq!(
            sniffer.by_mime("model/gltf-binary"),
            FormatTag::new("glb")
        );
        // Unregistered alphanumeric subtype falls back structurally.
        assert_eq!(sniffer.by_mime("image/avif"), FormatTag::new("avif"));
        assert!(sniffer.by_mime("application/vnd.foo+xml").is_unknown());
        assert!(sniffer.by_mime("").is_unknown());
    }

    #[test]
    fn test_signature_sniffing() {
        let sniffer = FormatSniffer::new();
        assert_eq!(
            sniffer.by_bytes(b"\x89PNG\r\n\x1a\n\0\0"),
            FormatTag::new("png")
        );
        assert_eq!(sniffer.by_bytes(b"RIFF\0\0\0\0WEBPVP8 "), FormatTag::new("webp"));
        assert_eq!(sniffer.by_bytes(b"RIFF\0\0\0\0WAVEfmt "), FormatTag::new("wav"));
        assert!(sniffer.by_bytes(b"RIFF").is_unknown());
        assert!(sniffer.by_bytes(&[]).is_unknown());
        assert!(sniffer.peek_len() >= 12);
    }

    #[test]
    fn test_newest_signature_wins() {
        let sniffer = FormatSniffer::empty();
        sniffer.register_signature(Signature::new(0, *b"AB", "old"));
        sniffer.register_signature(Signature::new(0, *b"ABC", "new"));
        assert_eq!(sniffer.by_bytes(b"ABCD"), FormatTag::new("new"));
        assert_eq!(sniffer.by_bytes(b"ABX"), FormatTag::new("old"));
        assert_eq!(sniffer.peek_len(), 3);
    }
}
