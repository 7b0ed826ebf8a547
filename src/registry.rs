//! Script registry: validated, ordered set of descriptors keyed by id.
//!
//! Runtime registrations ("dynamic") are kept apart from statically declared
//! entries (a bundled manifest) and merged when the UI is built.

use crate::error::RegistrationError;
use crate::script::{ScriptDescriptor, SettingKind};

#[derive(Default)]
pub struct ScriptRegistry {
    dynamic: Vec<ScriptDescriptor>,
    statics: Vec<ScriptDescriptor>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with statically declared scripts.
    pub fn with_static(statics: Vec<ScriptDescriptor>) -> Self {
        Self {
            dynamic: Vec::new(),
            statics,
        }
    }

    /// Check a descriptor without inserting it.
    pub fn validate(&self, descriptor: &ScriptDescriptor) -> Result<(), RegistrationError> {
        if descriptor.id.trim().is_empty() {
            return Err(RegistrationError::MissingField("id"));
        }
        if descriptor.name.trim().is_empty() {
            return Err(RegistrationError::MissingField("name"));
        }
        if self.contains(&descriptor.id) {
            return Err(RegistrationError::DuplicateId(descriptor.id.clone()));
        }
        for (key, spec) in descriptor.settings.iter() {
            if let SettingKind::Select { options } = &spec.kind
                && options.is_empty()
            {
                return Err(RegistrationError::EmptySelectOptions {
                    script: descriptor.id.clone(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Validate and append. The registry is unchanged on error.
    pub fn insert(&mut self, descriptor: ScriptDescriptor) -> Result<(), RegistrationError> {
        self.validate(&descriptor)?;
        self.dynamic.push(descriptor);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dynamic.iter().any(|d| d.id == id)
    }

    /// Runtime-registered descriptor by id.
    pub fn get(&self, id: &str) -> Option<&ScriptDescriptor> {
        self.dynamic.iter().find(|d| d.id == id)
    }

    /// Statically declared descriptor by id (the first one, if repeated).
    pub fn static_entry(&self, id: &str) -> Option<&ScriptDescriptor> {
        self.statics.iter().find(|d| d.id == id)
    }

    /// Runtime-registered descriptors in registration order.
    pub fn scripts(&self) -> &[ScriptDescriptor] {
        &self.dynamic
    }

    pub fn len(&self) -> usize {
        self.dynamic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dynamic.is_empty()
    }

    /// Static and dynamic entries de-duplicated by id. Order is first-seen
    /// (statics first); on an id clash the dynamic entry wins.
    pub fn merged(&self) -> Vec<ScriptDescriptor> {
        let mut merged: Vec<ScriptDescriptor> = Vec::new();
        for descriptor in self.statics.iter().chain(self.dynamic.iter()) {
            if merged.iter().any(|d| d.id == descriptor.id) {
                continue;
            }
            merged.push(self.get(&descriptor.id).unwrap_or(descriptor).clone());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::SettingSpec;

    fn ids(scripts: &[ScriptDescriptor]) -> Vec<&str> {
        scripts.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn insert_preserves_registration_order() {
        let mut registry = ScriptRegistry::new();
        for id in ["c", "a", "b"] {
            registry.insert(ScriptDescriptor::new(id, id.to_uppercase())).unwrap();
        }
        assert_eq!(ids(registry.scripts()), vec!["c", "a", "b"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn rejects_missing_id_and_name() {
        let mut registry = ScriptRegistry::new();
        assert_eq!(
            registry.insert(ScriptDescriptor::new("", "Nameless")),
            Err(RegistrationError::MissingField("id"))
        );
        assert_eq!(
            registry.insert(ScriptDescriptor::new("x", "  ")),
            Err(RegistrationError::MissingField("name"))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_id_keeps_first_entry() {
        let mut registry = ScriptRegistry::new();
        registry
            .insert(ScriptDescriptor::new("a", "First").version("1.0.0"))
            .unwrap();
        let err = registry
            .insert(ScriptDescriptor::new("a", "Second").version("2.0.0"))
            .unwrap_err();

        assert_eq!(err, RegistrationError::DuplicateId("a".into()));
        assert_eq!(registry.len(), 1);
        let kept = registry.get("a").unwrap();
        assert_eq!(kept.name, "First");
        assert_eq!(kept.version, "1.0.0");
    }

    #[test]
    fn rejects_select_without_options() {
        let mut registry = ScriptRegistry::new();
        let d = ScriptDescriptor::new("a", "A")
            .setting("mode", SettingSpec::select(Vec::<String>::new(), ""));
        assert!(matches!(
            registry.insert(d),
            Err(RegistrationError::EmptySelectOptions { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn merged_dynamic_wins_and_keeps_first_seen_order() {
        let statics = vec![
            ScriptDescriptor::new("s1", "Static One"),
            ScriptDescriptor::new("shared", "Static Shared"),
            ScriptDescriptor::new("s2", "Static Two"),
        ];
        let mut registry = ScriptRegistry::with_static(statics);
        registry.insert(ScriptDescriptor::new("d1", "Dynamic One")).unwrap();
        registry.insert(ScriptDescriptor::new("shared", "Dynamic Shared")).unwrap();

        let merged = registry.merged();
        assert_eq!(ids(&merged), vec!["s1", "shared", "s2", "d1"]);
        assert_eq!(merged[1].name, "Dynamic Shared");
    }

    #[test]
    fn merged_drops_duplicate_statics() {
        let statics = vec![
            ScriptDescriptor::new("a", "First"),
            ScriptDescriptor::new("a", "Second"),
        ];
        let registry = ScriptRegistry::with_static(statics);
        let merged = registry.merged();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "First");
    }

    #[test]
    fn static_entries_do_not_block_registration() {
        let mut registry = ScriptRegistry::with_static(vec![ScriptDescriptor::new("a", "Static")]);
        assert!(registry.insert(ScriptDescriptor::new("a", "Dynamic")).is_ok());
        assert_eq!(registry.merged()[0].name, "Dynamic");
    }
}
