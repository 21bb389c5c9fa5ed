//! In-process module table for hosts whose importable modules are known up front.

use crate::host::{ModuleResolver, ResolveError, VersionQuery};
use std::collections::HashMap;

type Loader<V> = Box<dyn Fn() -> V>;

/// A value produced by [`StaticRegistry`], tagged with the module it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticValue<V> {
    module: String,
    value: V,
}

impl<V> StaticValue<V> {
    /// Module path this value was resolved from.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }
}

/// Statically registered module loaders plus an installed-version table.
pub struct StaticRegistry<V> {
    loaders: HashMap<String, Loader<V>>,
    attrs: HashMap<String, HashMap<String, V>>,
    versions: HashMap<String, String>,
}

impl<V> Default for StaticRegistry<V> {
    fn default() -> Self {
        Self {
            loaders: HashMap::new(),
            attrs: HashMap::new(),
            versions: HashMap::new(),
        }
    }
}

impl<V: Clone + 'static> StaticRegistry<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader run each time `module` is resolved.
    pub fn add_loader(&mut self, module: &str, loader: impl Fn() -> V + 'static) -> &mut Self {
        self.loaders.insert(module.to_string(), Box::new(loader));
        self
    }

    /// Register a module that always resolves to `value`.
    pub fn add_module(&mut self, module: &str, value: V) -> &mut Self {
        self.add_loader(module, move || value.clone())
    }

    /// Register an attribute on `module`.
    pub fn add_attr(&mut self, module: &str, attr: &str, value: V) -> &mut Self {
        self.attrs
            .entry(module.to_string())
            .or_default()
            .insert(attr.to_string(), value);
        self
    }

    /// Record the installed version of distribution `name`.
    pub fn add_version(&mut self, name: &str, version: &str) -> &mut Self {
        self.versions
            .insert(canonical_name(name), version.to_string());
        self
    }
}

impl<V: Clone + 'static> ModuleResolver for StaticRegistry<V> {
    type Value = StaticValue<V>;

    fn resolve_module(&self, path: &str) -> Result<Self::Value, ResolveError> {
        let loader = self
            .loaders
            .get(path)
            .ok_or_else(|| ResolveError::ModuleNotFound {
                module: path.to_string(),
            })?;

        Ok(StaticValue {
            module: path.to_string(),
            value: loader(),
        })
    }

    fn resolve_attr(&self, module: &Self::Value, attr: &str) -> Result<Self::Value, ResolveError> {
        self.attrs
            .get(&module.module)
            .and_then(|attrs| attrs.get(attr))
            .map(|value| StaticValue {
                module: module.module.clone(),
                value: value.clone(),
            })
            .ok_or_else(|| ResolveError::AttributeNotFound {
                module: module.module.clone(),
                attr: attr.to_string(),
            })
    }

    fn invalidate_caches(&self) {}
}

impl<V> VersionQuery for StaticRegistry<V> {
    fn installed_version(&self, name: &str) -> crate::Result<Option<String>> {
        Ok(self.versions.get(&canonical_name(name)).cloned())
    }
}

/// Distribution name comparison form: lowercase, runs of `-`, `_`, `.` as `-`.
pub(crate) fn canonical_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(c.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}
