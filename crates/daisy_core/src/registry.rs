//! Model slug → constructor table.
//!
//! Built once by the host and passed to whatever needs to create modules;
//! there is no process-wide registry.

use std::collections::HashMap;

use crate::dsp;
use crate::error::SpawnError;
use crate::types::{Module, ModuleConstructor, ModuleSchema, RackModule};

pub struct ModuleRegistry {
    constructors: HashMap<String, ModuleConstructor>,
    schemas: HashMap<String, ModuleSchema>,
}

impl ModuleRegistry {
    /// Every module this crate ships.
    pub fn builtin() -> Self {
        let schemas = dsp::schema()
            .into_iter()
            .map(|schema| (schema.name.clone(), schema))
            .collect();
        Self {
            constructors: dsp::get_constructors(),
            schemas,
        }
    }

    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
            schemas: HashMap::new(),
        }
    }

    pub fn register<M: Module>(&mut self) {
        M::install_constructor(&mut self.constructors);
        let schema = M::get_schema();
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn contains(&self, model: &str) -> bool {
        self.constructors.contains_key(model)
    }

    pub fn create(&self, model: &str) -> Result<Box<dyn RackModule>, SpawnError> {
        self.constructors
            .get(model)
            .map(|constructor| constructor())
            .ok_or_else(|| SpawnError::UnknownModel(model.to_string()))
    }

    pub fn schema(&self, model: &str) -> Option<&ModuleSchema> {
        self.schemas.get(model)
    }

    /// Schemas sorted by model name.
    pub fn schemas(&self) -> Vec<&ModuleSchema> {
        let mut schemas: Vec<_> = self.schemas.values().collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn width_of(&self, model: &str) -> Option<u32> {
        self.schemas.get(model).map(|s| s.width_hp)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::mixer::Separator;

    #[test]
    fn test_builtin_creates_every_schema() {
        let registry = ModuleRegistry::builtin();
        for schema in registry.schemas() {
            let module = registry.create(&schema.name).unwrap();
            assert_eq!(module.model(), schema.name);
            assert_eq!(module.width_hp(), schema.width_hp);
            assert_eq!(module.participant(), schema.participant);
        }
    }

    #[test]
    fn test_unknown_model() {
        let registry = ModuleRegistry::builtin();
        match registry.create("nope") {
            Err(SpawnError::UnknownModel(model)) => assert_eq!(model, "nope"),
            _ => panic!("expected UnknownModel"),
        }
    }

    #[test]
    fn test_register_into_empty() {
        let mut registry = ModuleRegistry::empty();
        assert!(!registry.contains("separator"));
        registry.register::<Separator>();
        assert!(registry.contains("separator"));
        assert_eq!(registry.width_of("separator"), Some(1));
        assert_eq!(registry.schemas().len(), 1);
    }

    #[test]
    fn test_state_keys_are_published() {
        let registry = ModuleRegistry::builtin();
        let mut keys = registry.schema("channelStrip").unwrap().state_keys.clone();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "aux1_send_amt",
                "aux2_send_amt",
                "direct_outs_prefader",
                "level_slew",
                "muted",
                "solo",
            ]
        );
        assert_eq!(
            registry.schema("auxSendGroup").unwrap().state_keys,
            vec!["group".to_string()]
        );
    }
}
