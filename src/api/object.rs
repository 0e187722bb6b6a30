//! The object API seam between the reconciler and the transport
//!
//! [`ObjectApi`] is the capability set the reconciler requires for one
//! resource kind: lookup by href, lookup by filter, create, update, delete.
//! [`HttpObjectApi`] is the production implementation over
//! [`EngineClient`]; tests substitute a mock.

use std::marker::PhantomData;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::resource::Resource;
use crate::Result;

use super::http::EngineClient;

/// Remote operations for one resource kind.
///
/// This trait allows mocking the engine in tests while using the real HTTP
/// client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectApi<R: Resource>: Send + Sync {
    /// Fetch an object by href.
    ///
    /// Returns `Ok(None)` when no such object exists; never fails for
    /// "not found".
    async fn fetch_by_href(&self, href: &str) -> Result<Option<R>>;

    /// Fetch up to `limit` objects matching the natural-key filter.
    ///
    /// The engine's ordering is undefined; callers must not assume the
    /// first match is the right one when duplicates exist.
    async fn fetch_by_filter(
        &self,
        filter: &[(&'static str, String)],
        limit: usize,
    ) -> Result<Vec<R>>;

    /// Create an object and return the engine's fully populated
    /// representation, including server-computed fields
    async fn create(&self, desired: &R) -> Result<R>;

    /// Apply a partial update; fields omitted from the body are left
    /// untouched server-side
    async fn update(&self, href: &str, body: &serde_json::Value) -> Result<()>;

    /// Delete the object at the given href
    async fn delete(&self, href: &str) -> Result<()>;
}

/// HTTP-backed [`ObjectApi`] for one resource kind
pub struct HttpObjectApi<R> {
    client: EngineClient,
    _kind: PhantomData<fn() -> R>,
}

impl<R: Resource> HttpObjectApi<R> {
    /// Create an object API over the given engine client
    pub fn new(client: EngineClient) -> Self {
        Self {
            client,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<R: Resource> ObjectApi<R> for HttpObjectApi<R> {
    async fn fetch_by_href(&self, href: &str) -> Result<Option<R>> {
        self.client.get_by_href(href, R::KIND).await
    }

    async fn fetch_by_filter(
        &self,
        filter: &[(&'static str, String)],
        limit: usize,
    ) -> Result<Vec<R>> {
        self.client
            .get_collection(R::COLLECTION, R::KIND, filter, limit)
            .await
    }

    async fn create(&self, desired: &R) -> Result<R> {
        self.client.create(R::COLLECTION, R::KIND, desired).await
    }

    async fn update(&self, href: &str, body: &serde_json::Value) -> Result<()> {
        self.client.update(href, R::KIND, body).await
    }

    async fn delete(&self, href: &str) -> Result<()> {
        self.client.delete(href, R::KIND).await
    }
}
