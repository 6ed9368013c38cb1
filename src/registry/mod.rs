//! Metadata registry interface.
//!
//! The registry is the single source of truth for tree topology
//! (Index → Pillar → Category → Indicator → Dataset), goalpost bounds, dataset
//! source descriptors and country groups. The engine only reads it.
//!
//! `StaticRegistry` is a JSON-backed implementation used by the `pix` binary
//! and in tests; any other backend can implement `MetadataRegistry`.

use serde_json::{Map, Value};

use crate::domain::Goalposts;
use crate::error::EngineError;

pub mod tree;

pub use tree::*;

/// Opaque source descriptor (`OrganizationCode`, `QueryCode`, ...).
pub type SourceInfo = Map<String, Value>;

/// Read-only view of the metadata tree.
///
/// Implementations must be snapshot-consistent for the duration of a pipeline
/// run; `Sync` lets independent indicator pipelines share one handle.
pub trait MetadataRegistry: Send + Sync {
    /// Goalposts for an indicator or dataset code.
    fn goalposts(&self, item_code: &str) -> Result<Goalposts, EngineError>;

    /// Source descriptor for a dataset code.
    fn source_info(&self, dataset_code: &str) -> Result<SourceInfo, EngineError>;

    /// Dataset codes an item depends on, resolved transitively through the tree,
    /// first-seen order, without duplicates.
    fn dataset_dependencies(&self, item_code: &str) -> Result<Vec<String>, EngineError>;

    /// Members of a named country group.
    fn country_group(&self, name: &str) -> Result<Vec<String>, EngineError>;

    fn indicator_codes(&self) -> Vec<String>;
    fn category_codes(&self) -> Vec<String>;
    fn pillar_codes(&self) -> Vec<String>;

    /// Whether two datasets are pulled from the same provider query.
    fn shares_source(&self, a: &str, b: &str) -> Result<bool, EngineError> {
        Ok(self.source_info(a)? == self.source_info(b)?)
    }
}
