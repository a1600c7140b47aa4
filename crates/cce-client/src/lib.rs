//! Cloud Container Engine API Client
//!
//! A Rust client library for the cloud APIs the CCE operator drives:
//! managed Kubernetes clusters, node pools and nodes on the container
//! engine, plus the VPC, subnet, elastic IP, NAT gateway, DNS and VPC
//! endpoint services used to provision cluster networking.
//!
//! # Example
//!
//! ```no_run
//! use cce_client::{ClientAuth, CloudClient, CloudClientTrait, Credentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = ClientAuth::new(
//!     "ap-southeast-1",
//!     Credentials {
//!         access_key: "AK".to_string(),
//!         secret_key: "SK".to_string(),
//!         project_id: "project-id".to_string(),
//!     },
//! )?;
//! let client = CloudClient::new(auth)?;
//!
//! for cluster in client.list_clusters().await? {
//!     println!("{:?}", cluster.metadata.map(|m| m.name));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Request signing**: AK/SK `SDK-HMAC-SHA256` on every request
//! - **Structured errors**: status, request id and provider error code kept
//!   on every failed call
//! - **Mocking**: `test-util` enables an in-memory [`MockCloudClient`]

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod cloud_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use auth::{ClientAuth, Credentials};
pub use client::{CloudClient, Endpoints};
pub use common::HttpClient;
pub use error::{CloudError, ProviderError};
pub use models::*;
pub use cloud_trait::CloudClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockCloudClient;
