//! Triggering a build from an existing template.

use imagesmith_core::Result;
use imagesmith_core::client::ImageTemplateClient;
use tracing::info;

use crate::poller::{Deadline, wait_for_completion};

/// Look the template up by name, start a build, and wait for it to finish.
///
/// A missing template surfaces as [`imagesmith_core::Error::NotFound`]; no run
/// is attempted. There is no local deadline on the build itself.
pub async fn run_template(
    client: &dyn ImageTemplateClient,
    resource_group: &str,
    name: &str,
) -> Result<()> {
    let template = client.get(resource_group, name).await?;
    info!(
        template = name,
        resource_group,
        id = template.id.as_ref().map(|id| id.as_str()).unwrap_or_default(),
        "Starting image build"
    );

    let operation = client.run(resource_group, name).await?;
    wait_for_completion(operation, Deadline::Unbounded).await?;

    info!(template = name, "Image build finished");
    Ok(())
}
