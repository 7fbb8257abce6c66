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

//! Ordering metadata shared by every orderable plugin kind.

use crate::graph::DependencyNode;

/// Identifies a plugin and declares how it must be ordered relative to others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Unique identifier, referenced by other plugins' constraints.
    pub id: String,
    /// Plugins this one must run before.
    pub before: Vec<String>,
    /// Plugins this one must run after.
    pub after: Vec<String>,
    /// Plugins that are disabled whenever this one is registered.
    pub blacklist: Vec<String>,
}

impl PluginDescriptor {
    /// A descriptor with no constraints.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            before: Vec::new(),
            after: Vec::new(),
            blacklist: Vec::new(),
        }
    }

    /// Adds a `before` constraint.
    pub fn runs_before(mut self, id: impl Into<String>) -> Self {
        self.before.push(id.into());
        self
    }

    /// Adds an `after` constraint.
    pub fn runs_after(mut self, id: impl Into<String>) -> Self {
        self.after.push(id.into());
        self
    }

    /// Adds a blacklist entry.
    pub fn blacklisting(mut self, id: impl Into<String>) -> Self {
        self.blacklist.push(id.into());
        self
    }
}

impl DependencyNode for PluginDescriptor {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn before(&self) -> &[String] {
        &self.before
    }

    fn after(&self) -> &[String] {
        &self.after
    }

    fn blacklist(&self) -> &[String] {
        &self.blacklist
    }
}

/// Base trait for plugins whose registration order is computed by
/// [`order_plugins`](crate::graph::order_plugins).
pub trait Plugin: Send + Sync {
    /// This plugin's identity and ordering constraints.
    fn descriptor(&self) -> &PluginDescriptor;
}

/// Implements [`DependencyNode`] for a `dyn` plugin trait by forwarding to its
/// [`Plugin::descriptor`].
#[macro_export]
macro_rules! impl_dependency_node {
    ($plugin:ty) => {
        impl $crate::graph::DependencyNode for $plugin {
            fn node_id(&self) -> &str {
                &$crate::plugin::Plugin::descriptor(self).id
            }

            fn before(&self) -> &[String] {
                &$crate::plugin::Plugin::descriptor(self).before
            }

            fn after(&self) -> &[String] {
                &$crate::plugin::Plugin::descriptor(self).after
            }

            fn blacklist(&self) -> &[String] {
                &$crate::plugin::Plugin::descriptor(self).blacklist
            }
        }
    };
}

impl_dependency_node!(dyn Plugin);
