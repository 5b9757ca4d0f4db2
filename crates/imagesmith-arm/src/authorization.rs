//! `Microsoft.Authorization` role definitions and role assignments.
//!
//! Both are scope-relative: the scope is a full resource id (a subscription or
//! resource group) and is used verbatim as the path prefix.

use async_trait::async_trait;
use imagesmith_core::client::{Page, RoleAssignmentClient, RoleDefinitionClient};
use imagesmith_core::operation::Operation;
use imagesmith_core::resource::{
    RoleAssignment, RoleAssignmentSpec, RoleDefinition, RoleDefinitionSpec,
};
use imagesmith_core::{ResourceId, Result};

use crate::client::ArmClient;

pub const API_VERSION: &str = "2022-04-01";

const ROLE_DEFINITIONS: &str = "Microsoft.Authorization/roleDefinitions";
const ROLE_ASSIGNMENTS: &str = "Microsoft.Authorization/roleAssignments";

fn item_path(scope: &ResourceId, collection: &str, name: &str) -> String {
    ArmClient::scoped_path(
        scope,
        &format!("{collection}/{}", urlencoding::encode(name)),
    )
}

#[async_trait]
impl RoleDefinitionClient for ArmClient {
    async fn list_page(
        &self,
        scope: &ResourceId,
        continuation: Option<String>,
    ) -> Result<Page<RoleDefinition>> {
        self.get_page(
            &ArmClient::scoped_path(scope, ROLE_DEFINITIONS),
            API_VERSION,
            continuation,
            &format!("role definitions at {scope}"),
        )
        .await
    }

    async fn create_or_update(
        &self,
        scope: &ResourceId,
        name: &str,
        spec: &RoleDefinitionSpec,
    ) -> Result<Operation<RoleDefinition>> {
        self.begin_put(
            &item_path(scope, ROLE_DEFINITIONS, name),
            API_VERSION,
            spec,
            format!("create role definition {}", spec.properties.role_name),
        )
        .await
    }
}

#[async_trait]
impl RoleAssignmentClient for ArmClient {
    async fn list_page(
        &self,
        scope: &ResourceId,
        continuation: Option<String>,
    ) -> Result<Page<RoleAssignment>> {
        self.get_page(
            &ArmClient::scoped_path(scope, ROLE_ASSIGNMENTS),
            API_VERSION,
            continuation,
            &format!("role assignments at {scope}"),
        )
        .await
    }

    async fn create(
        &self,
        scope: &ResourceId,
        name: &str,
        spec: &RoleAssignmentSpec,
    ) -> Result<Operation<RoleAssignment>> {
        self.begin_put(
            &item_path(scope, ROLE_ASSIGNMENTS, name),
            API_VERSION,
            spec,
            format!("create role assignment {name}"),
        )
        .await
    }
}
