pub mod config;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{
    AspectConfig, AssemblyMode, CollectionParams, CompanionConfig, CompanionHeuristic, CookEntry,
    DerivedRoleConfig, EvaluatorKind, FallbackConfig, FieldPathConfig, FullTextPreference,
    PublicationConfig, SchemaConfig, SchemaDefinition, SchemaKind, TypeBranchConfig,
    TypeRuleConfig, ValidationConfig,
};
pub use error::{BiblionError, Result};
pub use models::*;

pub use storage::{DirectoryStore, MemoryStore, ResourceStore};
