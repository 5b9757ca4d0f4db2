//! The provisioning pipeline: ordered stages threading identifiers forward.

use imagesmith_config::ProvisionDocuments;
use imagesmith_core::resource::GalleryImageSpec;
use imagesmith_core::template::ImageTemplate;
use imagesmith_core::{Clients, Error, ResourceId, Result};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

use crate::ensure::ensure;
use crate::retry::RetryPolicy;
use crate::run::run_template;
use crate::stages::*;
use crate::template::{TemplateSettings, assemble_template, export_template};

pub const DEFAULT_IDENTITY_NAME: &str = "aibUserIdentity";
pub const DEFAULT_ROLE_NAME: &str = "AIB Role Definition";
pub const DEFAULT_ROLE_DESCRIPTION: &str =
    "Role to give Azure Image Builder access to the necessary resources.";
pub const DEFAULT_IMAGE_NAME: &str = "aibDemoImage";

/// A step of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    ResourceGroup,
    Identity,
    RoleDefinition,
    RoleAssignment,
    Gallery,
    ImageDefinition,
    TemplateAssembled,
    TemplateEnsured,
    TemplateRun,
}

impl Stage {
    /// Every stage a run without `run_after_create` goes through.
    pub const PROVISION: [Stage; 8] = [
        Stage::ResourceGroup,
        Stage::Identity,
        Stage::RoleDefinition,
        Stage::RoleAssignment,
        Stage::Gallery,
        Stage::ImageDefinition,
        Stage::TemplateAssembled,
        Stage::TemplateEnsured,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ResourceGroup => "resource group",
            Stage::Identity => "identity",
            Stage::RoleDefinition => "role definition",
            Stage::RoleAssignment => "role assignment",
            Stage::Gallery => "gallery",
            Stage::ImageDefinition => "image definition",
            Stage::TemplateAssembled => "template assembly",
            Stage::TemplateEnsured => "image template",
            Stage::TemplateRun => "template run",
        };
        f.write_str(name)
    }
}

/// A pipeline failure, tagged with the stage that produced it.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct ProvisionError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

/// Names and settings for one provisioning run.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub resource_group: String,
    pub location: String,
    pub identity_name: String,
    pub role_name: String,
    pub role_description: String,
    pub gallery_name: String,
    pub image_name: String,
    pub template_name: String,
    pub template: TemplateSettings,
    /// Where to write the assembled template, if anywhere.
    pub export_path: Option<PathBuf>,
    /// Trigger a build once the template exists.
    pub run_after_create: bool,
    pub role_assignment_retry: RetryPolicy,
}

impl ProvisionRequest {
    pub fn new(
        resource_group: impl Into<String>,
        location: impl Into<String>,
        gallery_name: impl Into<String>,
        template_name: impl Into<String>,
        target_regions: Vec<String>,
    ) -> Self {
        let location = location.into();
        Self {
            resource_group: resource_group.into(),
            identity_name: DEFAULT_IDENTITY_NAME.to_string(),
            role_name: DEFAULT_ROLE_NAME.to_string(),
            role_description: DEFAULT_ROLE_DESCRIPTION.to_string(),
            gallery_name: gallery_name.into(),
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            template_name: template_name.into(),
            template: TemplateSettings::new(location.clone(), target_regions),
            location,
            export_path: None,
            run_after_create: false,
            role_assignment_retry: RetryPolicy::default(),
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = Stage::PROVISION.to_vec();
        if self.run_after_create {
            stages.push(Stage::TemplateRun);
        }
        stages
    }
}

/// Identifiers accumulated by a run. A field is set once its stage succeeds.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub resource_group_id: Option<ResourceId>,
    pub identity_id: Option<ResourceId>,
    pub principal_id: Option<String>,
    pub role_definition_id: Option<ResourceId>,
    pub role_assignment_id: Option<ResourceId>,
    pub gallery_id: Option<ResourceId>,
    pub image_definition_id: Option<ResourceId>,
    pub template: Option<ImageTemplate>,
    pub template_id: Option<ResourceId>,
    pub completed: Vec<Stage>,
}

fn require<'a, T>(value: &'a Option<T>, what: &str) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| Error::Internal(format!("{what} is not available yet")))
}

/// Runs the pipeline against a set of clients with pre-loaded documents.
pub struct Provisioner {
    clients: Clients,
    documents: ProvisionDocuments,
}

impl Provisioner {
    pub fn new(clients: Clients, documents: ProvisionDocuments) -> Self {
        Self { clients, documents }
    }

    /// Run every stage in order, stopping at the first failure.
    ///
    /// Nothing created by earlier stages is removed on failure; running again
    /// picks up where the previous run stopped.
    pub async fn run(&self, request: &ProvisionRequest) -> std::result::Result<PipelineState, ProvisionError> {
        let mut state = PipelineState::default();

        for stage in request.stages() {
            info!(stage = %stage, "Starting stage");
            if let Err(source) = self.advance(stage, request, &mut state).await {
                error!(stage = %stage, error = %source, "Stage failed");
                return Err(ProvisionError { stage, source });
            }
            state.completed.push(stage);
        }

        info!(
            resource_group = %request.resource_group,
            template = %request.template_name,
            "Provisioning complete"
        );
        Ok(state)
    }

    async fn advance(&self, stage: Stage, request: &ProvisionRequest, state: &mut PipelineState) -> Result<()> {
        match stage {
            Stage::ResourceGroup => {
                let group = ensure(&ResourceGroupTarget {
                    client: self.clients.resource_groups.clone(),
                    name: request.resource_group.clone(),
                    location: request.location.clone(),
                })
                .await?
                .resource;
                state.resource_group_id = Some(group.id);
            }
            Stage::Identity => {
                let identity = ensure(&IdentityTarget {
                    client: self.clients.identities.clone(),
                    resource_group: request.resource_group.clone(),
                    name: request.identity_name.clone(),
                    location: request.location.clone(),
                })
                .await?
                .resource;
                info!(identity = %identity.id, principal = identity.principal_id(), "Identity ready");
                state.principal_id = Some(identity.principal_id().to_string());
                state.identity_id = Some(identity.id);
            }
            Stage::RoleDefinition => {
                let scope = require(&state.resource_group_id, "resource group id")?;
                let definition = ensure(&RoleDefinitionTarget {
                    client: self.clients.role_definitions.clone(),
                    scope: scope.clone(),
                    role_name: request.role_name.clone(),
                    description: request.role_description.clone(),
                    permission: self.documents.role_permissions.clone(),
                })
                .await?
                .resource;
                state.role_definition_id = Some(definition.id);
            }
            Stage::RoleAssignment => {
                let target = RoleAssignmentTarget::new(
                    self.clients.role_assignments.clone(),
                    require(&state.resource_group_id, "resource group id")?.clone(),
                    require(&state.principal_id, "identity principal")?.clone(),
                    require(&state.role_definition_id, "role definition id")?.clone(),
                    request.role_assignment_retry,
                );
                let assignment = ensure(&target).await?.resource;
                state.role_assignment_id = Some(assignment.id);
            }
            Stage::Gallery => {
                let gallery = ensure(&GalleryTarget {
                    client: self.clients.galleries.clone(),
                    resource_group: request.resource_group.clone(),
                    name: request.gallery_name.clone(),
                    location: request.location.clone(),
                })
                .await?
                .resource;
                state.gallery_id = Some(gallery.id);
            }
            Stage::ImageDefinition => {
                let image = ensure(&GalleryImageTarget {
                    client: self.clients.gallery_images.clone(),
                    resource_group: request.resource_group.clone(),
                    gallery: request.gallery_name.clone(),
                    name: request.image_name.clone(),
                    spec: GalleryImageSpec {
                        location: request.location.clone(),
                        properties: self.documents.image_properties.clone(),
                    },
                })
                .await?
                .resource;
                state.image_definition_id = Some(image.id);
            }
            Stage::TemplateAssembled => {
                let template = assemble_template(
                    require(&state.identity_id, "identity id")?,
                    require(&state.image_definition_id, "image definition id")?,
                    &self.documents.image_properties.identifier,
                    self.documents.customizations.clone(),
                    &request.template,
                );
                if let Some(path) = &request.export_path {
                    export_template(&template, path)?;
                }
                state.template = Some(template);
            }
            Stage::TemplateEnsured => {
                let template = ensure(&ImageTemplateTarget {
                    client: self.clients.image_templates.clone(),
                    resource_group: request.resource_group.clone(),
                    name: request.template_name.clone(),
                    template: require(&state.template, "assembled template")?.clone(),
                })
                .await?
                .resource;
                let id = template.id.ok_or_else(|| {
                    Error::InvalidResponse(format!(
                        "image template {} has no id",
                        request.template_name
                    ))
                })?;
                state.template_id = Some(id);
            }
            Stage::TemplateRun => {
                run_template(
                    self.clients.image_templates.as_ref(),
                    &request.resource_group,
                    &request.template_name,
                )
                .await?;
            }
        }
        Ok(())
    }
}
