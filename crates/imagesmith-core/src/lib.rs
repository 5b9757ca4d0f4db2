//! Core domain types and traits for imagesmith.
//!
//! This crate contains:
//! - Resource identifiers and the error taxonomy
//! - Resource models for each management API surface
//! - Client traits for those surfaces and the long-running operation trait
//! - The image-builder template model

pub mod client;
pub mod error;
pub mod id;
pub mod operation;
pub mod resource;
pub mod template;

pub use client::Clients;
pub use error::{Error, Result};
pub use id::ResourceId;
pub use operation::{LongRunningOperation, Operation, OperationStatus};
pub use resource::ResourceKind;
