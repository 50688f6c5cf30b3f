use std::marker::PhantomData;
use std::sync::Arc;

use reqwest::Method;
use tracing::{debug, info, instrument};

use crate::connection::{Connection, Placement};
use crate::error::{HcaasError, Result};
use crate::executor::{LockedExecutor, LockedRequest, deadline_for};
use crate::resource::{DeleteMode, ResourceKind, Timeouts, TrackedResource};

/// Create/read/delete controller for one resource kind.
pub struct Reconciler<K: ResourceKind> {
    connection: Arc<Connection>,
    executor: LockedExecutor,
    timeouts: Timeouts,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> Clone for Reconciler<K> {
    fn clone(&self) -> Self {
        Self {
            connection: Arc::clone(&self.connection),
            executor: self.executor.clone(),
            timeouts: self.timeouts,
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> Reconciler<K> {
    pub fn new(connection: Arc<Connection>, executor: LockedExecutor) -> Self {
        Self {
            connection,
            executor,
            timeouts: Timeouts::default(),
            _kind: PhantomData,
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn url(&self, placement: &Placement, path: &str) -> String {
        self.connection
            .service_url(&placement.service_name, &placement.instance, path)
    }

    /// Registers `record` remotely. The returned resource is tracked under
    /// the record's natural key.
    #[instrument(skip_all, fields(kind = K::NAME, instance = %placement.instance))]
    pub async fn create(
        &self,
        placement: Placement,
        record: K::Record,
    ) -> Result<TrackedResource<K::Record>> {
        let url = self.url(&placement, K::SUB_PATH);
        let request = LockedRequest::new(Method::POST, url, self.connection.token())
            .json(&K::create_payload(&record))?;

        self.executor
            .execute(&request, deadline_for(self.timeouts.create))
            .await?;

        let id = K::natural_key(&record).to_string();
        info!(id = %id, "Created {}", K::NAME);
        Ok(TrackedResource {
            id,
            placement,
            record,
        })
    }

    /// Refreshes `resource` from the remote listing. A missing entry clears
    /// the id instead of failing; errors leave `resource` untouched.
    #[instrument(skip_all, fields(kind = K::NAME, instance = %resource.placement.instance, id = %resource.id))]
    pub async fn read(&self, resource: &mut TrackedResource<K::Record>) -> Result<()> {
        if !resource.is_present() {
            return Ok(());
        }

        let url = self.url(&resource.placement, K::SUB_PATH);
        let request =
            LockedRequest::new(Method::GET, url, self.connection.token()).accept_json();
        let body = self.executor.fetch(&request).await?;

        let items: Vec<K::ListItem> =
            serde_json::from_str(&body).map_err(|e| HcaasError::Decode(e.to_string()))?;

        match items.into_iter().find(|item| K::item_key(item) == resource.id) {
            Some(item) => {
                K::refresh(&mut resource.record, item);
                debug!("{} still registered", K::NAME);
            }
            None => {
                info!("{} no longer registered, marking absent", K::NAME);
                resource.mark_absent();
            }
        }
        Ok(())
    }

    /// Removes the remote object and clears the id. Deleting an absent
    /// resource is a no-op.
    #[instrument(skip_all, fields(kind = K::NAME, instance = %resource.placement.instance, id = %resource.id))]
    pub async fn delete(&self, resource: &mut TrackedResource<K::Record>) -> Result<()> {
        if !resource.is_present() {
            return Ok(());
        }

        let token = self.connection.token();
        let request = match K::DELETE_MODE {
            DeleteMode::Body => {
                let url = self.url(&resource.placement, K::SUB_PATH);
                LockedRequest::new(Method::DELETE, url, token)
                    .json(&K::delete_payload(&resource.id, &resource.record))?
            }
            DeleteMode::PathAppended => {
                let path = format!("{}/{}", K::SUB_PATH, resource.id);
                LockedRequest::new(Method::DELETE, self.url(&resource.placement, &path), token)
            }
        };

        self.executor
            .execute(&request, deadline_for(self.timeouts.delete))
            .await?;

        info!("Deleted {}", K::NAME);
        resource.mark_absent();
        Ok(())
    }

    /// Adopts an existing remote object by id and reads its attributes.
    pub async fn import(
        &self,
        placement: Placement,
        id: &str,
    ) -> Result<TrackedResource<K::Record>> {
        let mut resource = TrackedResource::imported(placement, id);
        self.read(&mut resource).await?;
        Ok(resource)
    }
}
