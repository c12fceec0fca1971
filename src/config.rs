//! Persistence configuration.

/// Name the persistence hook set registers under by default.
pub const DEFAULT_HOOK_NAME: &str = "extensions:persistence";

/// Actor recorded when a save names no user.
pub const DEFAULT_ACTOR: &str = "anonymous";

/// Persistence configuration.
#[derive(Clone, Debug)]
pub struct PersistenceConfig {
    /// Registry name of the persistence hook set.
    pub hook_name: String,

    /// Actor recorded as `created_by` when none is given.
    pub default_actor: String,

    /// Logical name of the snapshot collection.
    pub collection_name: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            hook_name: DEFAULT_HOOK_NAME.to_string(),
            default_actor: DEFAULT_ACTOR.to_string(),
            collection_name: "process_snapshots".to_string(),
        }
    }
}

impl PersistenceConfig {
    pub fn with_hook_name(mut self, name: impl Into<String>) -> Self {
        self.hook_name = name.into();
        self
    }

    pub fn with_default_actor(mut self, actor: impl Into<String>) -> Self {
        self.default_actor = actor.into();
        self
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }
}
