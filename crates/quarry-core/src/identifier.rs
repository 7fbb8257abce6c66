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

//! Structured asset identifiers of the form `namespace::path?key=value&flag`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const NAMESPACE_SEPARATOR: &str = "::";

/// The reasons a string cannot be read as a structured [`Identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierError {
    /// The string has no `::` separator; callers should treat it as opaque.
    MissingSeparator,
    /// Nothing precedes the `::` separator.
    EmptyNamespace,
    /// Nothing follows the `::` separator (before any `?`).
    EmptyPath,
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierError::MissingSeparator => {
                write!(f, "Identifier has no '{NAMESPACE_SEPARATOR}' separator")
            }
            IdentifierError::EmptyNamespace => write!(f, "Identifier namespace is empty"),
            IdentifierError::EmptyPath => write!(f, "Identifier path is empty"),
        }
    }
}

impl std::error::Error for IdentifierError {}

/// A parsed asset identifier.
///
/// The query map is order-irrelevant: two identifiers that differ only in the
/// order of their query tokens compare equal. A bare `flag` token is stored
/// with no value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    namespace: String,
    path: String,
    query: BTreeMap<String, Option<String>>,
}

impl Identifier {
    /// Builds an identifier without a query.
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    /// Adds or replaces a query parameter. `None` records a bare flag.
    pub fn with_query(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.query.insert(key.into(), value);
        self
    }

    /// Parses `namespace::path[?query]`.
    ///
    /// The first `::` splits namespace from the rest, and the first `?` after it
    /// starts the query. Query tokens are separated by `&`; the last occurrence
    /// of a duplicated key wins. Empty tokens and tokens with an empty key are
    /// skipped.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let (namespace, rest) = input
            .split_once(NAMESPACE_SEPARATOR)
            .ok_or(IdentifierError::MissingSeparator)?;
        if namespace.is_empty() {
            return Err(IdentifierError::EmptyNamespace);
        }

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        if path.is_empty() {
            return Err(IdentifierError::EmptyPath);
        }

        let mut parsed = BTreeMap::new();
        for token in query.into_iter().flat_map(|q| q.split('&')) {
            let (key, value) = match token.split_once('=') {
                Some((key, value)) => (key, Some(value.to_string())),
                None => (token, None),
            };
            if key.is_empty() {
                continue;
            }
            parsed.insert(key.to_string(), value);
        }

        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
            query: parsed,
        })
    }

    /// The part before `::`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The part between `::` and `?`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All query parameters, sorted by key.
    pub fn query(&self) -> &BTreeMap<String, Option<String>> {
        &self.query
    }

    /// The value of `key`, if it was given as `key=value`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).and_then(|v| v.as_deref())
    }

    /// Whether `key` is set as a bare flag or with a truthy value (`true`, `1`).
    pub fn has_flag(&self, key: &str) -> bool {
        match self.query.get(key) {
            Some(None) => true,
            Some(Some(value)) => value.eq_ignore_ascii_case("true") || value == "1",
            None => false,
        }
    }

    /// The extension of the last path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.path.rsplit(['/', '\\']).next()?;
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{NAMESPACE_SEPARATOR}{}", self.namespace, self.path)?;
        for (index, (key, value)) in self.query.iter().enumerate() {
            f.write_str(if index == 0 { "?" } else { "&" })?;
            match value {
                Some(value) => write!(f, "{key}={value}")?,
                None => f.write_str(key)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespace_and_path() {
        let id = Identifier::parse("file::textures/grass.png").unwrap();
        assert_eq!(id.namespace(), "file");
        assert_eq!(id.path(), "textures/grass.png");
        assert!(id.query().is_empty());
        assert_eq!(id.extension(), Some("png"));
    }

    #[test]
    fn test_first_separator_wins() {
        let id = Identifier::parse("a::b::c").unwrap();
        assert_eq!(id.namespace(), "a");
        assert_eq!(id.path(), "b::c");
    }

    #[test]
    fn test_query_values_and_flags() {
        let id: Identifier = "res::model.glb?lod=2&srgb&lod=3&&=x".parse().unwrap();
        assert_eq!(id.path(), "model.glb");
        assert_eq!(id.query_value("lod"), Some("3"));
        assert!(id.has_flag("srgb"));
        assert_eq!(id.query_value("srgb"), None);
        assert!(!id.has_flag("missing"));
        assert_eq!(id.query().len(), 2);
    }

    #[test]
    fn test_truthy_flag_values() {
        let id = Identifier::parse("a::b?x=true&y=1&z=no").unwrap();
        assert!(id.has_flag("x"));
        assert!(id.has_flag("y"));
        assert!(!id.has_flag("z"));
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(
            Identifier::parse("plain-string"),
            Err(IdentifierError::MissingSeparator)
        );
        assert_eq!(
            Identifier::parse("::path"),
            Err(IdentifierError::EmptyNamespace)
        );
        assert_eq!(Identifier::parse("ns::"), Err(IdentifierError::EmptyPath));
        assert_eq!(Identifier::parse("ns::?a=1"), Err(IdentifierError::EmptyPath));
    }

    #[test]
    fn test_query_order_is_irrelevant() {
        let a = Identifier::parse("ns::p?b=2&a=1").unwrap();
        let b = Identifier::parse("ns::p?a=1&b=2").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "ns::p?a=1&b=2");
        assert_ne!(a, Identifier::parse("ns::p").unwrap());
    }

    #[test]
    fn test_display_round_trips_flags() {
        let id = Identifier::new("mem", "blob").with_query("raw", None);
        assert_eq!(id.to_string(), "mem::blob?raw");
        assert_eq!(Identifier::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_extension_edge_cases() {
        assert_eq!(Identifier::new("f", "dir.d/noext").extension(), None);
        assert_eq!(Identifier::new("f", ".hidden").extension(), None);
        assert_eq!(Identifier::new("f", "a/b.tar.gz").extension(), Some("gz"));
    }
}
