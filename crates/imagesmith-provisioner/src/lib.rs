//! Idempotent provisioning for image builds.
//!
//! Ensures, in dependency order, every resource an image build needs: resource
//! group, identity, role definition and assignment, gallery, image definition
//! and finally the image template. Each stage probes first and creates only
//! what is missing, so a failed run is recovered by running it again.

pub mod ensure;
pub mod pipeline;
pub mod poller;
pub mod retry;
pub mod run;
pub mod stages;
pub mod template;

#[cfg(test)]
mod fake;

pub use ensure::{Ensure, Ensured, ensure};
pub use pipeline::{PipelineState, ProvisionError, ProvisionRequest, Provisioner, Stage};
pub use poller::{Deadline, wait_for_completion};
pub use retry::{RetryPolicy, with_retry};
pub use run::run_template;
pub use template::{TemplateSettings, assemble_template, export_template};
