//! Core data types for the Girder build tool.
//!
//! This crate defines the dependency model: coordinates, structured
//! versions and ranges, the scope inheritance graph, the ordered
//! `DependencySet` with positional-hint mutation, managed versions with
//! `${token}` interpolation, and the `Girder.toml` build description.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod coordinate;
pub mod dependency;
pub mod interpolate;
pub mod manifest;
pub mod provider;
pub mod scope;
pub mod version;
