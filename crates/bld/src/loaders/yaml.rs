// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML publisher instance loader.
//!
//! `ttl` applies to the transports of a registry made by
//! [`YamlLoader::build_registry`]; `apply` leaves the factory of an existing
//! registry as it is.
//!
//! # Example YAML
//!
//! ```yaml
//! # bld.yaml
//! ttl: 4
//! instances:
//!   0:
//!     address: 239.255.24.2
//!     port: 10148
//!     max_payload: 80
//!     interface: eth1
//!     physical_id: 2
//!     data_type: 14
//!     post_trigger: GDET:FEE1:ENRC
//!     fiducial_pv: EVR:FIDUCIAL
//!     pvs: [GDET:FEE1:241:ENRC, GDET:FEE1:242:ENRC]
//!   1:
//!     address: 239.255.24.3
//!     port: 10148
//!     max_payload: 32
//!     physical_id: 1
//!     data_type: 16
//!     pvs: "PHASE:CAV1 PHASE:CAV2;PHASE:CAV3"
//! ```

use crate::config::MAX_INSTANCES;
use crate::error::{Error, Result};
use crate::publisher::{split_pv_list, PublisherConfig, PublisherRegistry};
use crate::transport::{InterfaceSpec, MulticastFactory, SinkFactory, TtlConfig};
use crate::wire::PayloadRegistry;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// YAML instance loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Deserialize, Default)]
pub struct YamlBldDocument {
    /// Instance configurations keyed by instance id.
    #[serde(default)]
    pub instances: BTreeMap<usize, YamlInstance>,

    /// Multicast TTL for every transport (optional).
    #[serde(default)]
    pub ttl: Option<u8>,
}

/// One publisher instance in YAML format.
#[derive(Debug, Deserialize)]
pub struct YamlInstance {
    pub address: String,
    pub port: u16,
    pub max_payload: usize,

    /// Egress interface, by address or name
    #[serde(default)]
    pub interface: Option<String>,

    pub physical_id: u32,
    pub data_type: u32,

    #[serde(default)]
    pub pre_trigger: Option<String>,
    #[serde(default)]
    pub post_trigger: Option<String>,
    #[serde(default)]
    pub fiducial_pv: Option<String>,

    /// Values sent each cycle: a list, or one separated string
    #[serde(default)]
    pub pvs: YamlPvList,
}

/// PV list given either as a YAML sequence or as a single string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum YamlPvList {
    List(Vec<String>),
    Text(String),
}

impl Default for YamlPvList {
    fn default() -> Self {
        YamlPvList::List(Vec::new())
    }
}

impl YamlPvList {
    fn names(&self) -> Vec<String> {
        match self {
            YamlPvList::List(names) => names
                .iter()
                .flat_map(|name| split_pv_list(name))
                .collect(),
            YamlPvList::Text(text) => split_pv_list(text),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl YamlLoader {
    /// Load instance configurations from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<YamlBldDocument> {
        let path = path.as_ref();
        log::debug!("[BLD] loading instance file {}", path.display());
        let yaml_content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read YAML file: {}", e)))?;
        Self::parse_yaml(&yaml_content)
    }

    /// Parse YAML content.
    pub fn parse_yaml(yaml_content: &str) -> Result<YamlBldDocument> {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Convert one YAML instance to a publisher configuration.
    pub fn instance_to_config(instance: &YamlInstance) -> PublisherConfig {
        PublisherConfig {
            address: instance.address.trim().to_string(),
            port: instance.port,
            max_payload: instance.max_payload,
            interface: instance
                .interface
                .as_deref()
                .and_then(InterfaceSpec::parse_optional),
            physical_id: instance.physical_id,
            data_type: instance.data_type,
            pre_trigger: non_empty(&instance.pre_trigger),
            post_trigger: non_empty(&instance.post_trigger),
            fiducial_pv: non_empty(&instance.fiducial_pv),
            pv_names: instance.pvs.names(),
        }
    }

    /// Configuration of instance `id`.
    pub fn instance_config(doc: &YamlBldDocument, id: usize) -> Result<PublisherConfig> {
        let instance = doc
            .instances
            .get(&id)
            .ok_or_else(|| Error::Config(format!("Instance {} not found", id)))?;
        Ok(Self::instance_to_config(instance))
    }

    /// TTL from the document, or the environment default.
    pub fn ttl_config(doc: &YamlBldDocument) -> TtlConfig {
        doc.ttl.map_or_else(TtlConfig::from_env, TtlConfig::custom)
    }

    /// Configure every instance the document names.
    ///
    /// Stops at the first instance that fails validation; instances
    /// configured before it keep their new configuration.
    pub fn apply<F: SinkFactory>(
        doc: &YamlBldDocument,
        registry: &PublisherRegistry<F>,
    ) -> Result<usize> {
        for (&id, instance) in &doc.instances {
            let config = Self::instance_to_config(instance);
            registry.with_instance(id, |p| p.configure(config))??;
        }
        log::info!("[BLD] {} instance(s) configured from YAML", doc.instances.len());
        Ok(doc.instances.len())
    }

    /// Multicast registry whose transports use the document's TTL, with
    /// every instance of the document configured.
    pub fn build_registry(
        doc: &YamlBldDocument,
        payloads: Arc<PayloadRegistry>,
    ) -> Result<PublisherRegistry> {
        let factory = MulticastFactory::new(Self::ttl_config(doc));
        let registry = PublisherRegistry::with_factory(MAX_INSTANCES, factory, payloads);
        Self::apply(doc, &registry)?;
        Ok(registry)
    }

    /// Validate every instance without applying it.
    pub fn validate(doc: &YamlBldDocument, payloads: &PayloadRegistry) -> Result<()> {
        for (&id, instance) in &doc.instances {
            Self::instance_to_config(instance)
                .validate(payloads)
                .map_err(|e| Error::Config(format!("instance {}: {}", id, e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{data_type, physical_id};

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
instances:
  0:
    address: 239.255.0.1
    port: 50000
    max_payload: 32
    physical_id: 1
    data_type: 16
"#;
        let doc = YamlLoader::parse_yaml(yaml).expect("Failed to parse minimal YAML");
        let cfg = YamlLoader::instance_config(&doc, 0).expect("Instance 0 should exist");
        assert_eq!(cfg.port, 50000);
        assert_eq!(cfg.physical_id, physical_id::PHASE_CAVITY);
        assert_eq!(cfg.data_type, data_type::ID_PHASE_CAVITY);
        assert!(cfg.pv_names.is_empty());
        assert_eq!(cfg.fiducial_pv, None);
        assert!(doc.ttl.is_none());
    }

    #[test]
    fn test_pv_list_forms() {
        let yaml = r#"
ttl: 4
instances:
  0:
    address: 239.255.0.1
    port: 50000
    max_payload: 32
    physical_id: 2
    data_type: 14
    interface: "127.0.0.1"
    pre_trigger: ""
    pvs: [A, "B C"]
  3:
    address: 239.255.0.2
    port: 50001
    max_payload: 32
    physical_id: 2
    data_type: 14
    pvs: "A,B;C"
"#;
        let doc = YamlLoader::parse_yaml(yaml).expect("Failed to parse YAML");
        assert_eq!(YamlLoader::ttl_config(&doc).multicast, 4);

        let first = YamlLoader::instance_config(&doc, 0).expect("Instance 0 should exist");
        assert_eq!(first.pv_names, ["A", "B", "C"]);
        assert_eq!(first.pre_trigger, None);
        assert_eq!(
            first.interface,
            Some(InterfaceSpec::Address("127.0.0.1".parse().expect("literal")))
        );

        let second = YamlLoader::instance_config(&doc, 3).expect("Instance 3 should exist");
        assert_eq!(second.pv_names, ["A", "B", "C"]);
    }

    #[test]
    fn test_empty_document() {
        let doc = YamlLoader::parse_yaml("{}").expect("Failed to parse empty document");
        assert!(doc.instances.is_empty());
        assert!(YamlLoader::instance_config(&doc, 0).is_err());
    }

    #[test]
    fn test_missing_required_field() {
        let yaml = r#"
instances:
  0:
    address: 239.255.0.1
    max_payload: 32
    physical_id: 1
    data_type: 16
"#;
        let err = YamlLoader::parse_yaml(yaml).expect_err("port is required");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_reports_instance() {
        let yaml = r#"
instances:
  7:
    address: not-an-address
    port: 50000
    max_payload: 32
    physical_id: 1
    data_type: 16
"#;
        let doc = YamlLoader::parse_yaml(yaml).expect("Failed to parse YAML");
        let err = YamlLoader::validate(&doc, &PayloadRegistry::with_builtins())
            .expect_err("bad address");
        assert!(err.to_string().contains("instance 7"), "{}", err);
    }
}
