//! Module repository seam for the Girder build tool.
//!
//! Defines the async `Repository` trait the resolution engine consumes,
//! the XML module-descriptor format repositories serve, bill-of-materials
//! imports, and an in-memory repository used for fixtures and
//! project-local modules. The wire protocol and the download cache live
//! behind the trait, outside this workspace.

pub mod bom;
pub mod descriptor;
pub mod memory;
pub mod repository;
