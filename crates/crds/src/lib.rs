//! DCops CCE CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the cloud container-engine
//! cluster operator.

pub mod cluster_config;

pub use cluster_config::*;
