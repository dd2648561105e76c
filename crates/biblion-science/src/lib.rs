//! Biblion Science: article assembly, metadata extraction, cooking and
//! registry validation.

pub mod assembler;
pub mod consolidate;
pub mod cook;
pub mod emit;
pub mod error;
pub mod extract;
pub mod identifiers;
pub mod matcher;
pub mod pipeline;
pub mod presets;
pub mod schema;
pub mod template;
pub mod validate;
pub mod xml;

pub use assembler::{ArticleAssembler, AssemblyRules};
pub use consolidate::Consolidator;
pub use cook::{RecordType, TypeRule, cook};
pub use emit::{CollectingSink, CompanionResolver, JsonLinesSink, MetadataSink};
pub use error::{Result, ScienceError};
pub use matcher::{Classification, PatternMatcher};
pub use pipeline::{Outcome, PassReport, Pipeline};
pub use schema::Schema;
pub use validate::{RegistryValidator, Verdict};
