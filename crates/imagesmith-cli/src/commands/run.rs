//! Triggering a build from an existing template.

use anyhow::{Context, Result};
use clap::Args;
use imagesmith_provisioner::run_template;

use super::AzureArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub azure: AzureArgs,

    /// Resource group holding the template
    #[arg(long, short = 'g')]
    pub resource_group: String,

    /// Name of the image template to run
    #[arg(long)]
    pub template_name: String,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let client = args.azure.client()?;

    println!("Running image template: {}", args.template_name);
    run_template(&client, &args.resource_group, &args.template_name)
        .await
        .with_context(|| format!("Failed to run image template {}", args.template_name))?;
    println!("Image build finished");

    Ok(())
}
