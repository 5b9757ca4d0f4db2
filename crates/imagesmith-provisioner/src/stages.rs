//! One [`Ensure`] implementation per resource kind.

use async_trait::async_trait;
use imagesmith_core::client::{
    GalleryClient, GalleryImageClient, IdentityClient, ImageTemplateClient, ResourceGroupClient,
    RoleAssignmentClient, RoleDefinitionClient,
};
use imagesmith_core::id::new_guid_name;
use imagesmith_core::resource::*;
use imagesmith_core::template::ImageTemplate;
use imagesmith_core::{ResourceId, ResourceKind, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::ensure::{Ensure, find_listed};
use crate::poller::{Deadline, wait_for_completion};
use crate::retry::{RetryPolicy, with_retry};

/// How long gallery and image-definition creation may take.
pub const GALLERY_DEADLINE: Deadline = Deadline::Within(Duration::from_secs(5 * 60));

pub struct ResourceGroupTarget {
    pub client: Arc<dyn ResourceGroupClient>,
    pub name: String,
    pub location: String,
}

#[async_trait]
impl Ensure for ResourceGroupTarget {
    type Resource = ResourceGroup;

    fn kind(&self) -> ResourceKind {
        ResourceKind::ResourceGroup
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<ResourceGroup> {
        self.client.get(&self.name).await
    }

    async fn create(&self) -> Result<ResourceGroup> {
        let spec = ResourceGroupSpec {
            location: self.location.clone(),
            tags: BTreeMap::new(),
        };
        let operation = self.client.create_or_update(&self.name, &spec).await?;
        wait_for_completion(operation, Deadline::Immediate).await
    }
}

pub struct IdentityTarget {
    pub client: Arc<dyn IdentityClient>,
    pub resource_group: String,
    pub name: String,
    pub location: String,
}

#[async_trait]
impl Ensure for IdentityTarget {
    type Resource = UserAssignedIdentity;

    fn kind(&self) -> ResourceKind {
        ResourceKind::UserAssignedIdentity
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<UserAssignedIdentity> {
        self.client.get(&self.resource_group, &self.name).await
    }

    async fn create(&self) -> Result<UserAssignedIdentity> {
        let spec = IdentitySpec {
            location: self.location.clone(),
        };
        let operation = self
            .client
            .create_or_update(&self.resource_group, &self.name, &spec)
            .await?;
        wait_for_completion(operation, Deadline::Immediate).await
    }
}

/// A custom role found by its display name among the definitions at `scope`.
///
/// Created under a fresh GUID, assignable only at `scope`.
pub struct RoleDefinitionTarget {
    pub client: Arc<dyn RoleDefinitionClient>,
    pub scope: ResourceId,
    pub role_name: String,
    pub description: String,
    pub permission: Permission,
}

#[async_trait]
impl Ensure for RoleDefinitionTarget {
    type Resource = RoleDefinition;

    fn kind(&self) -> ResourceKind {
        ResourceKind::RoleDefinition
    }

    fn name(&self) -> &str {
        &self.role_name
    }

    async fn probe(&self) -> Result<RoleDefinition> {
        find_listed(
            self.client.list(&self.scope),
            &format!("role definition {} at {}", self.role_name, self.scope),
            |definition: &RoleDefinition| definition.properties.role_name == self.role_name,
        )
        .await
    }

    async fn create(&self) -> Result<RoleDefinition> {
        let spec = RoleDefinitionSpec {
            properties: RoleDefinitionProperties {
                role_name: self.role_name.clone(),
                description: Some(self.description.clone()),
                role_type: None,
                permissions: vec![self.permission.clone()],
                assignable_scopes: vec![self.scope.to_string()],
            },
        };
        let operation = self
            .client
            .create_or_update(&self.scope, &new_guid_name(), &spec)
            .await?;
        wait_for_completion(operation, Deadline::Immediate).await
    }
}

/// A binding of `principal_id` to `role_definition_id` at `scope`.
///
/// Creation is retried under `retry`, since a just-created principal may not
/// yet be visible to the authorization service.
pub struct RoleAssignmentTarget {
    pub client: Arc<dyn RoleAssignmentClient>,
    pub scope: ResourceId,
    pub principal_id: String,
    pub role_definition_id: ResourceId,
    pub retry: RetryPolicy,
    description: String,
}

impl RoleAssignmentTarget {
    pub fn new(
        client: Arc<dyn RoleAssignmentClient>,
        scope: ResourceId,
        principal_id: String,
        role_definition_id: ResourceId,
        retry: RetryPolicy,
    ) -> Self {
        let description = format!("{principal_id} as {role_definition_id}");
        Self {
            client,
            scope,
            principal_id,
            role_definition_id,
            retry,
            description,
        }
    }
}

#[async_trait]
impl Ensure for RoleAssignmentTarget {
    type Resource = RoleAssignment;

    fn kind(&self) -> ResourceKind {
        ResourceKind::RoleAssignment
    }

    fn name(&self) -> &str {
        &self.description
    }

    async fn probe(&self) -> Result<RoleAssignment> {
        find_listed(
            self.client.list(&self.scope),
            &format!("role assignment {} at {}", self.description, self.scope),
            |assignment: &RoleAssignment| {
                assignment.binds(&self.principal_id, self.role_definition_id.as_str())
            },
        )
        .await
    }

    async fn create(&self) -> Result<RoleAssignment> {
        let spec = RoleAssignmentSpec {
            properties: RoleAssignmentProperties {
                role_definition_id: self.role_definition_id.to_string(),
                principal_id: self.principal_id.clone(),
                scope: None,
            },
        };
        let client = &self.client;
        let scope = &self.scope;
        let spec = &spec;

        with_retry(
            self.retry,
            &format!("assign role {}", self.description),
            || async move {
                let operation = client.create(scope, &new_guid_name(), spec).await?;
                wait_for_completion(operation, Deadline::Immediate).await
            },
        )
        .await
    }
}

pub struct GalleryTarget {
    pub client: Arc<dyn GalleryClient>,
    pub resource_group: String,
    pub name: String,
    pub location: String,
}

#[async_trait]
impl Ensure for GalleryTarget {
    type Resource = Gallery;

    fn kind(&self) -> ResourceKind {
        ResourceKind::Gallery
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<Gallery> {
        self.client.get(&self.resource_group, &self.name).await
    }

    async fn create(&self) -> Result<Gallery> {
        let spec = GallerySpec {
            location: self.location.clone(),
        };
        let operation = self
            .client
            .create_or_update(&self.resource_group, &self.name, &spec)
            .await?;
        wait_for_completion(operation, GALLERY_DEADLINE).await
    }
}

pub struct GalleryImageTarget {
    pub client: Arc<dyn GalleryImageClient>,
    pub resource_group: String,
    pub gallery: String,
    pub name: String,
    pub spec: GalleryImageSpec,
}

#[async_trait]
impl Ensure for GalleryImageTarget {
    type Resource = GalleryImage;

    fn kind(&self) -> ResourceKind {
        ResourceKind::GalleryImage
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<GalleryImage> {
        self.client
            .get(&self.resource_group, &self.gallery, &self.name)
            .await
    }

    async fn create(&self) -> Result<GalleryImage> {
        let operation = self
            .client
            .create_or_update(&self.resource_group, &self.gallery, &self.name, &self.spec)
            .await?;
        wait_for_completion(operation, GALLERY_DEADLINE).await
    }
}

pub struct ImageTemplateTarget {
    pub client: Arc<dyn ImageTemplateClient>,
    pub resource_group: String,
    pub name: String,
    pub template: ImageTemplate,
}

#[async_trait]
impl Ensure for ImageTemplateTarget {
    type Resource = ImageTemplate;

    fn kind(&self) -> ResourceKind {
        ResourceKind::ImageTemplate
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> Result<ImageTemplate> {
        self.client.get(&self.resource_group, &self.name).await
    }

    async fn create(&self) -> Result<ImageTemplate> {
        let operation = self
            .client
            .create_or_update(&self.resource_group, &self.name, &self.template)
            .await?;
        wait_for_completion(operation, Deadline::Unbounded).await
    }
}
