//! Azure Resource Manager backend for imagesmith.
//!
//! [`ArmClient`] implements every client trait from `imagesmith_core::client`
//! over the ARM REST API:
//! - Resource groups and user-assigned identities
//! - Role definitions and role assignments
//! - Compute galleries and image definitions
//! - Image builder templates

pub mod authorization;
pub mod client;
pub mod compute;
pub mod credential;
mod error;
pub mod identities;
pub mod image_builder;
mod operation;
pub mod resource_groups;

pub use client::{ArmClient, DEFAULT_ENDPOINT};
pub use credential::{
    AccessToken, EnvironmentCredential, StaticTokenCredential, TokenCredential,
    credential_from_env,
};
