//! Package resolution with an I/O abstraction.
//!
//! This module is split into:
//! - `lookup`: The `PackageLookup` trait and `NodeModulesLookup`, the default
//!   implementation that walks `node_modules` trees
//! - `resolver`: Batches every requested package name into one lookup and
//!   builds the `PackageTable` the inliner works from

mod lookup;
mod resolver;

pub use lookup::*;
pub use resolver::*;
