//! Ordered tap storage shared by both pipeline flavors.

use crate::error::ConfigError;

/// Options controlling where and how a tap is registered.
#[derive(Debug, Clone, Default)]
pub struct TapOptions {
    /// Insert immediately before the named tap. Fatal if the name is absent.
    pub before: Option<String>,

    /// Insert immediately after the named tap. Fatal if the name is absent.
    pub after: Option<String>,

    /// Numeric ordering key; lower runs earlier. Ignored when an anchor is
    /// given. Ties keep insertion order.
    pub priority: i32,

    /// Deregister this tap after the call in which it fires.
    pub once: bool,

    /// Overwrite a same-named existing tap instead of failing.
    pub replace: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct TapMeta {
    pub name: String,
    pub priority: i32,
    pub once: bool,
}

/// Ordered list of named callbacks. Generic over the callback type so the
/// sync and async pipelines share insertion and removal semantics.
pub(crate) struct TapRegistry<F> {
    entries: Vec<(TapMeta, F)>,
}

impl<F> Default for TapRegistry<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F> TapRegistry<F> {
    pub fn insert(&mut self, name: &str, callback: F, options: &TapOptions) -> Result<(), ConfigError> {
        if let Some(existing) = self.position(name) {
            if !options.replace {
                return Err(ConfigError::DuplicateTap(name.to_string()));
            }
            // A plain replacement keeps the replaced tap's position; explicit
            // ordering options reorder instead.
            if options.before.is_none() && options.after.is_none() {
                let priority = self.entries[existing].0.priority;
                self.entries[existing] = (
                    TapMeta {
                        name: name.to_string(),
                        priority,
                        once: options.once,
                    },
                    callback,
                );
                return Ok(());
            }
            self.entries.remove(existing);
        }

        let index = if let Some(anchor) = &options.before {
            self.position(anchor)
                .ok_or_else(|| ConfigError::UnknownTap(anchor.clone()))?
        } else if let Some(anchor) = &options.after {
            self.position(anchor)
                .ok_or_else(|| ConfigError::UnknownTap(anchor.clone()))?
                + 1
        } else {
            self.entries
                .iter()
                .rposition(|(meta, _)| meta.priority <= options.priority)
                .map_or(0, |i| i + 1)
        };

        let meta = TapMeta {
            name: name.to_string(),
            priority: options.priority,
            once: options.once,
        };
        self.entries.insert(index, (meta, callback));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(meta, _)| meta.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn meta(&self, index: usize) -> &TapMeta {
        &self.entries[index].0
    }

    pub fn callback(&self, index: usize) -> &F {
        &self.entries[index].1
    }

    #[cfg(test)]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(meta, _)| meta.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> TapOptions {
        TapOptions::default()
    }

    #[test]
    fn test_priority_ordering_is_stable() {
        let mut registry: TapRegistry<u8> = TapRegistry::default();
        registry.insert("b", 0, &TapOptions { priority: 10, ..opts() }).unwrap();
        registry.insert("a", 0, &TapOptions { priority: -5, ..opts() }).unwrap();
        registry.insert("c", 0, &TapOptions { priority: 10, ..opts() }).unwrap();
        assert_eq!(registry.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_before_after_anchors() {
        let mut registry: TapRegistry<u8> = TapRegistry::default();
        registry.insert("first", 0, &opts()).unwrap();
        registry.insert("last", 0, &opts()).unwrap();
        registry
            .insert("middle", 0, &TapOptions { before: Some("last".into()), ..opts() })
            .unwrap();
        registry
            .insert("second", 0, &TapOptions { after: Some("first".into()), ..opts() })
            .unwrap();
        assert_eq!(registry.names(), vec!["first", "second", "middle", "last"]);
    }

    #[test]
    fn test_unknown_anchor_is_fatal() {
        let mut registry: TapRegistry<u8> = TapRegistry::default();
        let err = registry
            .insert("x", 0, &TapOptions { before: Some("ghost".into()), ..opts() })
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTap(name) if name == "ghost"));
    }

    #[test]
    fn test_duplicate_requires_replace() {
        let mut registry: TapRegistry<u8> = TapRegistry::default();
        registry.insert("x", 1, &opts()).unwrap();
        let err = registry.insert("x", 2, &opts()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateTap(_)));

        registry.insert("y", 3, &opts()).unwrap();
        registry
            .insert("x", 9, &TapOptions { replace: true, ..opts() })
            .unwrap();
        // Replacement kept x's original position.
        assert_eq!(registry.names(), vec!["x", "y"]);
        assert_eq!(*registry.callback(0), 9);
    }
}
