//! Patch integrators.
//!
//! Each integrator applies every contribution of one patch kind to one baseline:
//!
//! - [`json`]: JSON-Patch operation lists on a text document
//! - [`data_table`]: row operations on a data table document
//! - [`actor`]: component additions on a structural actor document
//! - [`asset_copy`]: self reference rewriting for a duplicated structural document
//!
//! Integrators never read or write storage; the overlay builder feeds them baselines
//! and collects their output.

pub mod actor;
pub mod asset_copy;
pub mod data_table;
pub mod json;

pub use json::ApplyStats;
