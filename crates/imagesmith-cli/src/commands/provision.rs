//! Full provisioning: every resource plus the image template.

use anyhow::{Context, Result};
use clap::Args;
use imagesmith_config::{DocumentPaths, ProvisionDocuments};
use imagesmith_core::Clients;
use imagesmith_provisioner::pipeline::{DEFAULT_IDENTITY_NAME, DEFAULT_IMAGE_NAME};
use imagesmith_provisioner::template::{DEFAULT_EXPORT_PATH, DEFAULT_RUN_OUTPUT_NAME};
use imagesmith_provisioner::{ProvisionRequest, Provisioner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::AzureArgs;

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub azure: AzureArgs,

    /// Resource group to create resources in
    #[arg(long, short = 'g')]
    pub resource_group: String,

    /// Location in which to deploy resources
    #[arg(long, short = 'l')]
    pub location: String,

    /// Name of the image template to create
    #[arg(long)]
    pub template_name: String,

    /// Name of the image gallery to create
    #[arg(long)]
    pub gallery_name: String,

    /// Name of the image definition to create
    #[arg(long, default_value = DEFAULT_IMAGE_NAME)]
    pub image_name: String,

    /// Name of the user-assigned identity the build runs as
    #[arg(long, default_value = DEFAULT_IDENTITY_NAME)]
    pub identity_name: String,

    /// Image Builder run output name
    #[arg(long, default_value = DEFAULT_RUN_OUTPUT_NAME)]
    pub run_output_name: String,

    /// Region to replicate the produced image to (repeatable)
    #[arg(long = "target-region", short = 'r', required = true)]
    pub target_regions: Vec<String>,

    /// Build timeout in minutes
    #[arg(long)]
    pub build_timeout: Option<u32>,

    /// Size of the build VM
    #[arg(long)]
    pub vm_size: Option<String>,

    /// Path to the role permissions file
    #[arg(long, default_value = "./config/aibRolePermissions.json")]
    pub role_permissions: PathBuf,

    /// Path to the image definition properties file
    #[arg(long, default_value = "./config/imageDefinitionProperties.json")]
    pub image_properties: PathBuf,

    /// Path to the template customizations file
    #[arg(long, default_value = "./config/customizations.json")]
    pub customizations: PathBuf,

    /// Write the assembled template to --export-path
    #[arg(long)]
    pub export_template: bool,

    /// Where to write the template when exporting
    #[arg(long, default_value = DEFAULT_EXPORT_PATH)]
    pub export_path: PathBuf,

    /// Start a build once the template exists
    #[arg(long)]
    pub run: bool,
}

impl ProvisionArgs {
    pub fn document_paths(&self) -> DocumentPaths {
        DocumentPaths {
            role_permissions: self.role_permissions.clone(),
            image_properties: self.image_properties.clone(),
            customizations: self.customizations.clone(),
        }
    }

    pub fn request(&self) -> ProvisionRequest {
        let mut request = ProvisionRequest::new(
            &self.resource_group,
            &self.location,
            &self.gallery_name,
            &self.template_name,
            self.target_regions.clone(),
        );
        request.identity_name = self.identity_name.clone();
        request.image_name = self.image_name.clone();
        request.template.run_output_name = self.run_output_name.clone();
        request.template.build_timeout_in_minutes = self.build_timeout;
        request.template.vm_size = self.vm_size.clone();
        request.export_path = self.export_template.then(|| self.export_path.clone());
        request.run_after_create = self.run;
        request
    }
}

pub async fn provision(args: ProvisionArgs) -> Result<()> {
    let paths = args.document_paths();
    let documents = ProvisionDocuments::load(&paths).context("Failed to load configuration")?;
    info!(
        customizations = documents.customizations.len(),
        "Loaded configuration documents"
    );

    let client = Arc::new(args.azure.client()?);
    let provisioner = Provisioner::new(Clients::from_backend(client), documents);

    let request = args.request();
    println!("Provisioning image template: {}", request.template_name);
    let state = provisioner.run(&request).await?;

    if let Some(id) = &state.resource_group_id {
        println!("Resource group:   {}", id);
    }
    if let Some(id) = &state.identity_id {
        println!("Identity:         {}", id);
    }
    if let Some(id) = &state.role_definition_id {
        println!("Role definition:  {}", id);
    }
    if let Some(id) = &state.image_definition_id {
        println!("Image definition: {}", id);
    }
    if let Some(id) = &state.template_id {
        println!("Image template:   {}", id);
    }
    if let Some(path) = &request.export_path {
        println!("Template exported to {}", path.display());
    }

    Ok(())
}
