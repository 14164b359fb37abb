// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publisher configuration loaders.
//!
//! # Example
//!
//! ```rust,ignore
//! use bld::loaders::YamlLoader;
//! use bld::PublisherRegistry;
//!
//! let doc = YamlLoader::load_from_file("bld.yaml")?;
//! let registry = PublisherRegistry::new();
//! YamlLoader::apply(&doc, &registry)?;
//! ```

#[cfg(feature = "config-loaders")]
pub mod yaml;

#[cfg(feature = "config-loaders")]
pub use yaml::{YamlBldDocument, YamlInstance, YamlLoader, YamlPvList};
