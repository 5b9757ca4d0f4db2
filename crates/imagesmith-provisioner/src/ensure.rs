//! The find-or-create protocol shared by every resource kind.

use async_trait::async_trait;
use futures::stream::{BoxStream, TryStreamExt};
use imagesmith_core::{Error, ResourceKind, Result};
use tracing::info;

/// A resource that should exist, identified by name or by some match rule.
#[async_trait]
pub trait Ensure: Send + Sync {
    type Resource: Send;

    fn kind(&self) -> ResourceKind;

    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Look the resource up. Absence must be reported as [`Error::NotFound`].
    async fn probe(&self) -> Result<Self::Resource>;

    /// Create the resource and wait until the remote side reports it done.
    async fn create(&self) -> Result<Self::Resource>;
}

/// The outcome of [`ensure`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ensured<R> {
    pub resource: R,
    /// `false` when the resource already existed.
    pub created: bool,
}

/// Make sure `target` exists and return it.
///
/// An existing resource is returned as-is, even if it differs from what
/// `create` would have produced. Only [`Error::NotFound`] from the probe leads
/// to creation; any other probe error is returned without creating anything.
pub async fn ensure<E>(target: &E) -> Result<Ensured<E::Resource>>
where
    E: Ensure + ?Sized,
{
    match target.probe().await {
        Ok(resource) => {
            info!(kind = %target.kind(), name = target.name(), "Found existing resource");
            return Ok(Ensured {
                resource,
                created: false,
            });
        }
        Err(err) if err.is_not_found() => {
            info!(kind = %target.kind(), name = target.name(), "Creating resource");
        }
        Err(err) => return Err(err),
    }

    let resource = target.create().await?;
    info!(kind = %target.kind(), name = target.name(), "Created resource");
    Ok(Ensured {
        resource,
        created: true,
    })
}

/// Scan a listing for the first item matching `matches`.
///
/// Running out of items is [`Error::NotFound`]. A `NotFound` raised while
/// listing means the scope itself is missing; it is reported as a 404
/// rejection so it can never be mistaken for an absent item.
pub(crate) async fn find_listed<T, F>(
    mut items: BoxStream<'_, Result<T>>,
    description: &str,
    matches: F,
) -> Result<T>
where
    F: Fn(&T) -> bool,
{
    while let Some(item) = items.try_next().await.map_err(listing_failed)? {
        if matches(&item) {
            return Ok(item);
        }
    }
    Err(Error::NotFound(description.to_string()))
}

fn listing_failed(err: Error) -> Error {
    match err {
        Error::NotFound(message) => Error::RemoteRejected {
            status: 404,
            code: Some("ScopeNotFound".to_string()),
            message,
        },
        other => other,
    }
}
