//! Name generators for handles created without an explicit suffix

use crate::error::{EngineError, EngineResult};
use handle_types::HandleName;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Produces a candidate handle name under a prefix
pub trait NameGenerator: Send + Sync {
    fn generate_name(&self, prefix: &str) -> HandleName;
}

/// `prefix/<uuid-v4>`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl NameGenerator for UuidGenerator {
    fn generate_name(&self, prefix: &str) -> HandleName {
        HandleName::from_parts(prefix, &Uuid::new_v4().to_string())
    }
}

/// `prefix/<n>` with a process-wide sequence
#[derive(Debug, Default)]
pub struct CounterGenerator {
    next: AtomicU64,
}

impl CounterGenerator {
    pub fn starting_at(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl NameGenerator for CounterGenerator {
    fn generate_name(&self, prefix: &str) -> HandleName {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        HandleName::from_parts(prefix, &n.to_string())
    }
}

/// Generators by configuration key
#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn NameGenerator>>,
    default_key: String,
}

impl GeneratorRegistry {
    pub const UUID: &'static str = "uuid";
    pub const COUNTER: &'static str = "counter";

    /// Registry holding `uuid` and `counter`
    pub fn with_builtins(counter_start: u64, default_key: impl Into<String>) -> Self {
        let mut registry = Self {
            generators: HashMap::new(),
            default_key: default_key.into(),
        };
        registry.register(Self::UUID, Arc::new(UuidGenerator));
        registry.register(
            Self::COUNTER,
            Arc::new(CounterGenerator::starting_at(counter_start)),
        );
        registry
    }

    pub fn register(&mut self, key: impl Into<String>, generator: Arc<dyn NameGenerator>) {
        self.generators.insert(key.into(), generator);
    }

    /// Look up a generator; `None` or an empty key selects the default.
    pub fn resolve(&self, key: Option<&str>) -> EngineResult<Arc<dyn NameGenerator>> {
        let key = match key {
            Some(k) if !k.is_empty() => k,
            _ => self.default_key.as_str(),
        };
        self.generators
            .get(key)
            .cloned()
            .ok_or_else(|| EngineError::UnknownGenerator(key.to_string()))
    }

    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.generators.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn default_key(&self) -> &str {
        &self.default_key
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtins(1, Self::UUID)
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("keys", &self.keys())
            .field("default_key", &self.default_key)
            .finish()
    }
}
