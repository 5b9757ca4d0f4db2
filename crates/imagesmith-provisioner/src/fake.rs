//! In-memory management API for tests.

use async_trait::async_trait;
use imagesmith_core::client::*;
use imagesmith_core::operation::{Completed, LongRunningOperation, Operation, OperationStatus};
use imagesmith_core::resource::*;
use imagesmith_core::template::ImageTemplate;
use imagesmith_core::{Error, ResourceId, ResourceKind, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
const PAGE_SIZE: usize = 2;

/// Shared call counter that survives moving the owner into a box.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// An operation that reports `InProgress` a fixed number of times (or forever).
pub struct ScriptedOperation<T> {
    description: String,
    remaining: Option<usize>,
    outcome: Option<Result<T>>,
    polls: Counter,
}

impl<T: Send + 'static> ScriptedOperation<T> {
    pub fn never_finishing(description: &str) -> (Operation<T>, Counter) {
        let polls = Counter::default();
        let operation = Self {
            description: description.to_string(),
            remaining: None,
            outcome: None,
            polls: polls.clone(),
        };
        (Box::new(operation), polls)
    }

    pub fn finishing_after(description: &str, in_progress: usize, value: T) -> (Operation<T>, Counter) {
        let polls = Counter::default();
        let operation = Self {
            description: description.to_string(),
            remaining: Some(in_progress),
            outcome: Some(Ok(value)),
            polls: polls.clone(),
        };
        (Box::new(operation), polls)
    }

    pub fn failing(description: &str, err: Error) -> Operation<T> {
        Box::new(Self {
            description: description.to_string(),
            remaining: Some(0),
            outcome: Some(Err(err)),
            polls: Counter::default(),
        })
    }
}

#[async_trait]
impl<T: Send> LongRunningOperation<T> for ScriptedOperation<T> {
    fn description(&self) -> &str {
        &self.description
    }

    async fn poll(&mut self) -> Result<OperationStatus<T>> {
        self.polls.bump();
        match self.remaining {
            None => Ok(OperationStatus::InProgress),
            Some(0) => match self.outcome.take() {
                Some(Ok(value)) => Ok(OperationStatus::Succeeded(value)),
                Some(Err(err)) => Ok(OperationStatus::Failed(err)),
                None => Err(Error::Internal("polled after completion".to_string())),
            },
            Some(n) => {
                self.remaining = Some(n - 1);
                Ok(OperationStatus::InProgress)
            }
        }
    }
}

/// A remote call as seen by the fake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Get(ResourceKind),
    List(ResourceKind),
    Create(ResourceKind),
    Run,
}

type MakeError = fn() -> Error;

#[derive(Default)]
struct State {
    resource_groups: BTreeMap<String, ResourceGroup>,
    identities: BTreeMap<(String, String), UserAssignedIdentity>,
    role_definitions: Vec<(ResourceId, RoleDefinition)>,
    role_assignments: Vec<(ResourceId, RoleAssignment)>,
    galleries: BTreeMap<(String, String), Gallery>,
    gallery_images: BTreeMap<(String, String, String), GalleryImage>,
    image_templates: BTreeMap<(String, String), ImageTemplate>,
    calls: Vec<Call>,
    probe_failures: HashMap<ResourceKind, MakeError>,
    create_failures: HashMap<ResourceKind, (Option<usize>, MakeError)>,
    stalled: HashSet<ResourceKind>,
    run_failure: Option<MakeError>,
}

/// Records every call and keeps created resources in memory.
#[derive(Default)]
pub struct FakeCloud {
    state: Mutex<State>,
}

pub fn resource_group_id(name: &str) -> ResourceId {
    ResourceId::new(format!("/subscriptions/{SUBSCRIPTION}/resourceGroups/{name}"))
}

fn provider_id(resource_group: &str, path: &str) -> ResourceId {
    ResourceId::new(format!("{}/providers/{path}", resource_group_id(resource_group)))
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state().calls.iter().filter(|c| *c == call).count()
    }

    /// Calls of any kind against `kind`.
    pub fn touched(&self, kind: ResourceKind) -> bool {
        self.state().calls.iter().any(|call| match call {
            Call::Get(k) | Call::List(k) | Call::Create(k) => *k == kind,
            Call::Run => kind == ResourceKind::ImageTemplate,
        })
    }

    pub fn role_definitions(&self) -> Vec<RoleDefinition> {
        self.state()
            .role_definitions
            .iter()
            .map(|(_, d)| d.clone())
            .collect()
    }

    pub fn role_assignments(&self) -> Vec<RoleAssignment> {
        self.state()
            .role_assignments
            .iter()
            .map(|(_, a)| a.clone())
            .collect()
    }

    pub fn failing_probe(self, kind: ResourceKind, make: MakeError) -> Self {
        self.state().probe_failures.insert(kind, make);
        self
    }

    /// Fail the next `times` creates of `kind`, or all of them when `None`.
    pub fn failing_creates(self, kind: ResourceKind, times: Option<usize>, make: MakeError) -> Self {
        self.state().create_failures.insert(kind, (times, make));
        self
    }

    /// Creates of `kind` return an operation that never finishes.
    pub fn stalled_creates(self, kind: ResourceKind) -> Self {
        self.state().stalled.insert(kind);
        self
    }

    pub fn failing_runs(self, make: MakeError) -> Self {
        self.state().run_failure = Some(make);
        self
    }

    pub fn with_resource_group(self, name: &str) -> Self {
        self.state().insert_resource_group(name, "westus2");
        self
    }

    pub fn with_identity(self, resource_group: &str, name: &str) -> Self {
        self.state().insert_identity(resource_group, name, "westus2");
        self
    }

    pub fn with_role_definition(self, resource_group: &str, role_name: &str) -> Self {
        let scope = resource_group_id(resource_group);
        let properties = RoleDefinitionProperties {
            role_name: role_name.to_string(),
            assignable_scopes: vec![scope.to_string()],
            ..Default::default()
        };
        self.state()
            .insert_role_definition(&scope, &format!("seed-{role_name}"), properties);
        self
    }

    pub fn with_role_assignment(self, resource_group: &str, principal_id: &str, role_definition_id: &str) -> Self {
        let scope = resource_group_id(resource_group);
        let name = format!("seed-{principal_id}");
        self.state()
            .insert_role_assignment(&scope, &name, principal_id, role_definition_id);
        self
    }

    pub fn with_gallery(self, resource_group: &str, name: &str) -> Self {
        self.state().insert_gallery(resource_group, name, "westus2");
        self
    }

    pub fn with_gallery_image(self, resource_group: &str, gallery: &str, name: &str) -> Self {
        let properties = GalleryImageProperties {
            os_type: "Linux".to_string(),
            os_state: "Generalized".to_string(),
            identifier: GalleryImageIdentifier {
                publisher: "seeded".to_string(),
                offer: "seeded".to_string(),
                sku: "seeded".to_string(),
            },
            hyper_v_generation: None,
            description: None,
            additional: Default::default(),
        };
        self.state()
            .insert_gallery_image(resource_group, gallery, name, "westus2", properties);
        self
    }

    /// Seed a template created by other tooling, using kinds this crate never writes.
    pub fn with_image_template(self, resource_group: &str, name: &str) -> Self {
        let template: ImageTemplate = serde_json::from_value(serde_json::json!({
            "location": "westus2",
            "identity": {"type": "UserAssigned", "userAssignedIdentities": {}},
            "properties": {
                "source": {"type": "SharedImageVersion", "imageVersionId": "/galleries/g/images/i/versions/1.0.0"},
                "customize": [{"type": "WindowsRestart", "restartTimeout": "10m"}],
                "distribute": [{"type": "ManagedImage", "imageId": "/images/out", "location": "westus2", "runOutputName": "out"}]
            }
        }))
        .unwrap();
        self.state().insert_image_template(resource_group, name, template);
        self
    }

    /// Record a probe and return the injected failure for `kind`, if any.
    fn record_probe(&self, call: Call, kind: ResourceKind) -> Result<()> {
        let mut state = self.state();
        state.calls.push(call);
        match state.probe_failures.get(&kind) {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }

    /// Record a create; `Ok(true)` means the operation should stall.
    fn record_create(&self, kind: ResourceKind) -> Result<bool> {
        let mut state = self.state();
        state.calls.push(Call::Create(kind));
        if let Some((remaining, make)) = state.create_failures.get_mut(&kind) {
            match remaining {
                None => return Err(make()),
                Some(0) => {}
                Some(n) => {
                    *n -= 1;
                    return Err(make());
                }
            }
        }
        Ok(state.stalled.contains(&kind))
    }
}

impl State {
    fn scope_exists(&self, scope: &ResourceId) -> bool {
        self.resource_groups.values().any(|group| &group.id == scope)
    }

    fn insert_resource_group(&mut self, name: &str, location: &str) -> ResourceGroup {
        let group = ResourceGroup {
            id: resource_group_id(name),
            name: name.to_string(),
            location: location.to_string(),
        };
        self.resource_groups.insert(name.to_string(), group.clone());
        group
    }

    fn insert_identity(&mut self, resource_group: &str, name: &str, location: &str) -> UserAssignedIdentity {
        let identity = UserAssignedIdentity {
            id: provider_id(
                resource_group,
                &format!("Microsoft.ManagedIdentity/userAssignedIdentities/{name}"),
            ),
            name: name.to_string(),
            location: location.to_string(),
            properties: IdentityProperties {
                principal_id: format!("principal-{name}"),
                client_id: None,
                tenant_id: None,
            },
        };
        self.identities
            .insert((resource_group.to_string(), name.to_string()), identity.clone());
        identity
    }

    fn insert_role_definition(
        &mut self,
        scope: &ResourceId,
        name: &str,
        properties: RoleDefinitionProperties,
    ) -> RoleDefinition {
        let definition = RoleDefinition {
            id: ResourceId::new(format!(
                "{scope}/providers/Microsoft.Authorization/roleDefinitions/{name}"
            )),
            name: name.to_string(),
            properties,
        };
        self.role_definitions.push((scope.clone(), definition.clone()));
        definition
    }

    fn insert_role_assignment(
        &mut self,
        scope: &ResourceId,
        name: &str,
        principal_id: &str,
        role_definition_id: &str,
    ) -> RoleAssignment {
        let assignment = RoleAssignment {
            id: ResourceId::new(format!(
                "{scope}/providers/Microsoft.Authorization/roleAssignments/{name}"
            )),
            name: name.to_string(),
            properties: RoleAssignmentProperties {
                role_definition_id: role_definition_id.to_string(),
                principal_id: principal_id.to_string(),
                scope: Some(scope.to_string()),
            },
        };
        self.role_assignments.push((scope.clone(), assignment.clone()));
        assignment
    }

    fn insert_gallery(&mut self, resource_group: &str, name: &str, location: &str) -> Gallery {
        let gallery = Gallery {
            id: provider_id(resource_group, &format!("Microsoft.Compute/galleries/{name}")),
            name: name.to_string(),
            location: location.to_string(),
        };
        self.galleries
            .insert((resource_group.to_string(), name.to_string()), gallery.clone());
        gallery
    }

    fn insert_gallery_image(
        &mut self,
        resource_group: &str,
        gallery: &str,
        name: &str,
        location: &str,
        properties: GalleryImageProperties,
    ) -> GalleryImage {
        let image = GalleryImage {
            id: provider_id(
                resource_group,
                &format!("Microsoft.Compute/galleries/{gallery}/images/{name}"),
            ),
            name: name.to_string(),
            location: location.to_string(),
            properties,
        };
        self.gallery_images.insert(
            (resource_group.to_string(), gallery.to_string(), name.to_string()),
            image.clone(),
        );
        image
    }

    fn insert_image_template(&mut self, resource_group: &str, name: &str, mut template: ImageTemplate) -> ImageTemplate {
        template.id = Some(provider_id(
            resource_group,
            &format!("Microsoft.VirtualMachineImages/imageTemplates/{name}"),
        ));
        template.name = Some(name.to_string());
        self.image_templates
            .insert((resource_group.to_string(), name.to_string()), template.clone());
        template
    }
}

fn missing(what: String) -> Error {
    Error::NotFound(what)
}

fn page_of<T: Clone>(items: Vec<T>, continuation: Option<String>) -> Page<T> {
    let start = continuation
        .and_then(|link| link.strip_prefix("offset:").and_then(|n| n.parse().ok()))
        .unwrap_or(0usize);
    let end = (start + PAGE_SIZE).min(items.len());
    Page {
        value: items[start.min(end)..end].to_vec(),
        next_link: (end < items.len()).then(|| format!("offset:{end}")),
    }
}

fn finish<T: Send + 'static>(description: String, stalled: bool, value: T) -> Operation<T> {
    if stalled {
        ScriptedOperation::never_finishing(&description).0
    } else {
        Completed::boxed(description, value)
    }
}

#[async_trait]
impl ResourceGroupClient for FakeCloud {
    async fn get(&self, name: &str) -> Result<ResourceGroup> {
        self.record_probe(Call::Get(ResourceKind::ResourceGroup), ResourceKind::ResourceGroup)?;
        self.state()
            .resource_groups
            .get(name)
            .cloned()
            .ok_or_else(|| missing(format!("resource group {name}")))
    }

    async fn create_or_update(&self, name: &str, spec: &ResourceGroupSpec) -> Result<Operation<ResourceGroup>> {
        let stalled = self.record_create(ResourceKind::ResourceGroup)?;
        let group = self.state().insert_resource_group(name, &spec.location);
        Ok(finish(format!("create resource group {name}"), stalled, group))
    }
}

#[async_trait]
impl IdentityClient for FakeCloud {
    async fn get(&self, resource_group: &str, name: &str) -> Result<UserAssignedIdentity> {
        self.record_probe(
            Call::Get(ResourceKind::UserAssignedIdentity),
            ResourceKind::UserAssignedIdentity,
        )?;
        self.state()
            .identities
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| missing(format!("identity {name}")))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        spec: &IdentitySpec,
    ) -> Result<Operation<UserAssignedIdentity>> {
        let stalled = self.record_create(ResourceKind::UserAssignedIdentity)?;
        let identity = self.state().insert_identity(resource_group, name, &spec.location);
        Ok(finish(format!("create identity {name}"), stalled, identity))
    }
}

#[async_trait]
impl RoleDefinitionClient for FakeCloud {
    async fn list_page(&self, scope: &ResourceId, continuation: Option<String>) -> Result<Page<RoleDefinition>> {
        self.record_probe(
            Call::List(ResourceKind::RoleDefinition),
            ResourceKind::RoleDefinition,
        )?;
        let state = self.state();
        if !state.scope_exists(scope) {
            return Err(missing(format!("scope {scope}")));
        }
        let items = state
            .role_definitions
            .iter()
            .filter(|(s, _)| s == scope)
            .map(|(_, d)| d.clone())
            .collect();
        Ok(page_of(items, continuation))
    }

    async fn create_or_update(
        &self,
        scope: &ResourceId,
        name: &str,
        spec: &RoleDefinitionSpec,
    ) -> Result<Operation<RoleDefinition>> {
        let stalled = self.record_create(ResourceKind::RoleDefinition)?;
        let definition = self
            .state()
            .insert_role_definition(scope, name, spec.properties.clone());
        Ok(finish(format!("create role definition {name}"), stalled, definition))
    }
}

#[async_trait]
impl RoleAssignmentClient for FakeCloud {
    async fn list_page(&self, scope: &ResourceId, continuation: Option<String>) -> Result<Page<RoleAssignment>> {
        self.record_probe(
            Call::List(ResourceKind::RoleAssignment),
            ResourceKind::RoleAssignment,
        )?;
        let state = self.state();
        if !state.scope_exists(scope) {
            return Err(missing(format!("scope {scope}")));
        }
        let items = state
            .role_assignments
            .iter()
            .filter(|(s, _)| s == scope)
            .map(|(_, a)| a.clone())
            .collect();
        Ok(page_of(items, continuation))
    }

    async fn create(
        &self,
        scope: &ResourceId,
        name: &str,
        spec: &RoleAssignmentSpec,
    ) -> Result<Operation<RoleAssignment>> {
        let stalled = self.record_create(ResourceKind::RoleAssignment)?;
        let assignment = self.state().insert_role_assignment(
            scope,
            name,
            &spec.properties.principal_id,
            &spec.properties.role_definition_id,
        );
        Ok(finish(format!("create role assignment {name}"), stalled, assignment))
    }
}

#[async_trait]
impl GalleryClient for FakeCloud {
    async fn get(&self, resource_group: &str, name: &str) -> Result<Gallery> {
        self.record_probe(Call::Get(ResourceKind::Gallery), ResourceKind::Gallery)?;
        self.state()
            .galleries
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| missing(format!("gallery {name}")))
    }

    async fn create_or_update(&self, resource_group: &str, name: &str, spec: &GallerySpec) -> Result<Operation<Gallery>> {
        let stalled = self.record_create(ResourceKind::Gallery)?;
        let gallery = self.state().insert_gallery(resource_group, name, &spec.location);
        Ok(finish(format!("create gallery {name}"), stalled, gallery))
    }
}

#[async_trait]
impl GalleryImageClient for FakeCloud {
    async fn get(&self, resource_group: &str, gallery: &str, name: &str) -> Result<GalleryImage> {
        self.record_probe(Call::Get(ResourceKind::GalleryImage), ResourceKind::GalleryImage)?;
        self.state()
            .gallery_images
            .get(&(resource_group.to_string(), gallery.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| missing(format!("image definition {gallery}/{name}")))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        gallery: &str,
        name: &str,
        spec: &GalleryImageSpec,
    ) -> Result<Operation<GalleryImage>> {
        let stalled = self.record_create(ResourceKind::GalleryImage)?;
        let image = self.state().insert_gallery_image(
            resource_group,
            gallery,
            name,
            &spec.location,
            spec.properties.clone(),
        );
        Ok(finish(format!("create image definition {name}"), stalled, image))
    }
}

#[async_trait]
impl ImageTemplateClient for FakeCloud {
    async fn get(&self, resource_group: &str, name: &str) -> Result<ImageTemplate> {
        self.record_probe(Call::Get(ResourceKind::ImageTemplate), ResourceKind::ImageTemplate)?;
        self.state()
            .image_templates
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| missing(format!("image template {name}")))
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        template: &ImageTemplate,
    ) -> Result<Operation<ImageTemplate>> {
        let stalled = self.record_create(ResourceKind::ImageTemplate)?;
        let template = self
            .state()
            .insert_image_template(resource_group, name, template.clone());
        Ok(finish(format!("create image template {name}"), stalled, template))
    }

    async fn run(&self, resource_group: &str, name: &str) -> Result<Operation<()>> {
        let mut state = self.state();
        state.calls.push(Call::Run);
        if !state
            .image_templates
            .contains_key(&(resource_group.to_string(), name.to_string()))
        {
            return Err(missing(format!("image template {name}")));
        }
        let description = format!("run image template {name}");
        Ok(match state.run_failure {
            Some(make) => ScriptedOperation::failing(&description, make()),
            None => Completed::boxed(description, ()),
        })
    }
}
