use rustc_hash::FxHashMap;

use crate::animation::values::PropertyValue;
use crate::errors::{Result, SkeinError};

/// Per-tree-instance parameter storage.
///
/// Keys are instance-qualified paths (`parameters/<node path>/<name>`), so a
/// node asset shared by several trees (or instantiated twice inside one
/// graph) never collides with itself. Defaults are declared by walking the
/// graph whenever the root node is assigned.
#[derive(Debug, Default)]
pub struct ParameterStore {
    values: FxHashMap<String, PropertyValue>,
}

impl ParameterStore {
    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }

    /// Registers a parameter with its default value, resetting any previous
    /// value (a fresh root assignment starts from a clean slate).
    pub(crate) fn declare(&mut self, path: String, default: PropertyValue) {
        self.values.insert(path, default);
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&PropertyValue> {
        self.values.get(path)
    }

    /// Sets a declared parameter. The variant must match the declared type.
    pub fn set(&mut self, path: &str, value: PropertyValue) -> Result<()> {
        let Some(slot) = self.values.get_mut(path) else {
            return Err(SkeinError::UnknownParameter(path.to_string()));
        };
        if std::mem::discriminant(slot) != std::mem::discriminant(&value) {
            return Err(SkeinError::ParameterTypeMismatch {
                path: path.to_string(),
                expected: slot.type_name(),
            });
        }
        *slot = value;
        Ok(())
    }

    /// Unchecked write used by the evaluator for internal cursors.
    pub(crate) fn set_internal(&mut self, path: &str, value: PropertyValue) {
        self.values.insert(path.to_string(), value);
    }

    #[must_use]
    pub(crate) fn get_float(&self, path: &str) -> f32 {
        self.values.get(path).and_then(PropertyValue::as_float).unwrap_or(0.0)
    }

    #[must_use]
    pub(crate) fn get_bool(&self, path: &str) -> bool {
        self.values.get(path).and_then(PropertyValue::as_bool).unwrap_or(false)
    }

    /// Declared parameter paths, for introspection.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
