//! Remote resource client traits.
//!
//! Each trait is a capability-typed handle to one management API surface.
//! Absence is always reported as [`Error::NotFound`](crate::Error::NotFound) so
//! callers never infer it from status codes.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;

use crate::operation::Operation;
use crate::resource::*;
use crate::template::ImageTemplate;
use crate::{ResourceId, Result};

/// One page of a list response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

impl<T> Page<T> {
    pub fn last(value: Vec<T>) -> Self {
        Self {
            value,
            next_link: None,
        }
    }
}

/// Turn a page fetcher into a lazy stream of items.
///
/// `fetch` receives `None` for the first page and the previous page's
/// continuation link afterwards. Pages are only requested as the stream is
/// consumed, so a caller that stops early never fetches the rest.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> BoxStream<'a, Result<T>>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T>>> + Send + 'a,
{
    enum Cursor {
        Start,
        Next(String),
        Done,
    }

    stream::try_unfold((fetch, Cursor::Start), |(mut fetch, cursor)| async move {
        let continuation = match cursor {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(link) => Some(link),
        };
        let page = fetch(continuation).await?;
        let next = match page.next_link {
            Some(link) if !link.is_empty() => Cursor::Next(link),
            _ => Cursor::Done,
        };
        Ok(Some((page.value, (fetch, next))))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok)))
    .try_flatten()
    .boxed()
}

#[async_trait]
pub trait ResourceGroupClient: Send + Sync {
    async fn get(&self, name: &str) -> Result<ResourceGroup>;

    async fn create_or_update(
        &self,
        name: &str,
        spec: &ResourceGroupSpec,
    ) -> Result<Operation<ResourceGroup>>;
}

#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str) -> Result<UserAssignedIdentity>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        spec: &IdentitySpec,
    ) -> Result<Operation<UserAssignedIdentity>>;
}

/// Role definitions are not addressable by their display name, so lookup is
/// by enumeration over a scope.
#[async_trait]
pub trait RoleDefinitionClient: Send + Sync {
    async fn list_page(
        &self,
        scope: &ResourceId,
        continuation: Option<String>,
    ) -> Result<Page<RoleDefinition>>;

    async fn create_or_update(
        &self,
        scope: &ResourceId,
        name: &str,
        spec: &RoleDefinitionSpec,
    ) -> Result<Operation<RoleDefinition>>;

    /// All definitions visible at `scope`, fetched page by page.
    fn list<'a>(&'a self, scope: &'a ResourceId) -> BoxStream<'a, Result<RoleDefinition>> {
        paginate(move |continuation| self.list_page(scope, continuation))
    }
}

#[async_trait]
pub trait RoleAssignmentClient: Send + Sync {
    async fn list_page(
        &self,
        scope: &ResourceId,
        continuation: Option<String>,
    ) -> Result<Page<RoleAssignment>>;

    async fn create(
        &self,
        scope: &ResourceId,
        name: &str,
        spec: &RoleAssignmentSpec,
    ) -> Result<Operation<RoleAssignment>>;

    /// All assignments at `scope`, fetched page by page.
    fn list<'a>(&'a self, scope: &'a ResourceId) -> BoxStream<'a, Result<RoleAssignment>> {
        paginate(move |continuation| self.list_page(scope, continuation))
    }
}

#[async_trait]
pub trait GalleryClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str) -> Result<Gallery>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        spec: &GallerySpec,
    ) -> Result<Operation<Gallery>>;
}

#[async_trait]
pub trait GalleryImageClient: Send + Sync {
    async fn get(&self, resource_group: &str, gallery: &str, name: &str) -> Result<GalleryImage>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        gallery: &str,
        name: &str,
        spec: &GalleryImageSpec,
    ) -> Result<Operation<GalleryImage>>;
}

#[async_trait]
pub trait ImageTemplateClient: Send + Sync {
    async fn get(&self, resource_group: &str, name: &str) -> Result<ImageTemplate>;

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        template: &ImageTemplate,
    ) -> Result<Operation<ImageTemplate>>;

    /// Start a build from an existing template.
    async fn run(&self, resource_group: &str, name: &str) -> Result<Operation<()>>;
}

/// The set of client handles a provisioning run needs.
#[derive(Clone)]
pub struct Clients {
    pub resource_groups: Arc<dyn ResourceGroupClient>,
    pub identities: Arc<dyn IdentityClient>,
    pub role_definitions: Arc<dyn RoleDefinitionClient>,
    pub role_assignments: Arc<dyn RoleAssignmentClient>,
    pub galleries: Arc<dyn GalleryClient>,
    pub gallery_images: Arc<dyn GalleryImageClient>,
    pub image_templates: Arc<dyn ImageTemplateClient>,
}

impl Clients {
    /// Use one backend for every surface.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ResourceGroupClient
            + IdentityClient
            + RoleDefinitionClient
            + RoleAssignmentClient
            + GalleryClient
            + GalleryImageClient
            + ImageTemplateClient
            + 'static,
    {
        Self {
            resource_groups: backend.clone(),
            identities: backend.clone(),
            role_definitions: backend.clone(),
            role_assignments: backend.clone(),
            galleries: backend.clone(),
            gallery_images: backend.clone(),
            image_templates: backend,
        }
    }
}
