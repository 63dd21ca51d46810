//! Lead lifecycle operations.
//!
//! Every operation on an existing lead resolves it, then passes it through
//! [`assert_owner`] before doing anything else.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde_json::Value;
use uuid::Uuid;

use crate::error::LeadError;
use crate::listing::{LeadFilter, Page, PageRequest, Pagination};
use crate::models::lead;
use crate::repositories::lead::LeadWithOwner;
use crate::repositories::{LeadRepository, UserRepository};
use crate::validation::validate_lead;

/// Fails with [`LeadError::AccessDenied`] unless `caller_id` owns `record`.
pub fn assert_owner(record: &lead::Model, caller_id: Uuid) -> Result<(), LeadError> {
    if record.owner_id == caller_id {
        Ok(())
    } else {
        Err(LeadError::AccessDenied)
    }
}

#[derive(Debug, Clone)]
pub struct LeadService {
    leads: LeadRepository,
    users: UserRepository,
}

impl LeadService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            leads: LeadRepository::new(Arc::clone(&db)),
            users: UserRepository::new(db),
        }
    }

    /// Validates `raw` and stores it as a new lead owned by the caller.
    pub async fn create(&self, caller_id: Uuid, raw: &Value) -> Result<LeadWithOwner, LeadError> {
        let input = validate_lead(raw)?;

        let owner = self
            .users
            .find_by_id(caller_id)
            .await
            .map_err(LeadError::persistence("create lead"))?
            .ok_or(LeadError::Unauthenticated)?;

        let created = self
            .leads
            .create(owner.id, &input)
            .await
            .map_err(LeadError::persistence("create lead"))?;

        metrics::counter!("leads_created_total").increment(1);
        tracing::info!(lead_id = %created.id, owner_id = %owner.id, "Lead created");

        Ok((created, Some(owner)))
    }

    pub async fn get(&self, caller_id: Uuid, id: Uuid) -> Result<LeadWithOwner, LeadError> {
        self.resolve(caller_id, id, "fetch lead").await
    }

    /// Full-record replacement; the incoming body is validated as a whole.
    pub async fn update(
        &self,
        caller_id: Uuid,
        id: Uuid,
        raw: &Value,
    ) -> Result<LeadWithOwner, LeadError> {
        let (existing, owner) = self.resolve(caller_id, id, "update lead").await?;
        let input = validate_lead(raw)?;

        let updated = self
            .leads
            .update(existing, &input)
            .await
            .map_err(LeadError::persistence("update lead"))?;

        tracing::info!(lead_id = %updated.id, "Lead updated");
        Ok((updated, owner))
    }

    /// Permanently removes the lead.
    ///
    /// A lead deleted concurrently after the ownership check reports `NotFound`.
    pub async fn delete(&self, caller_id: Uuid, id: Uuid) -> Result<(), LeadError> {
        self.resolve(caller_id, id, "delete lead").await?;

        let removed = self
            .leads
            .delete(id)
            .await
            .map_err(LeadError::persistence("delete lead"))?;
        if !removed {
            return Err(LeadError::NotFound);
        }

        metrics::counter!("leads_deleted_total").increment(1);
        tracing::info!(lead_id = %id, "Lead deleted");
        Ok(())
    }

    /// Filtered, owner-scoped listing; also serves exports via `PageRequest::export`.
    pub async fn list(
        &self,
        caller_id: Uuid,
        filter: &LeadFilter,
        page: PageRequest,
    ) -> Result<Page<LeadWithOwner>, LeadError> {
        let (items, total) = self
            .leads
            .list(caller_id, filter, &page)
            .await
            .map_err(LeadError::persistence("fetch leads"))?;

        Ok(Page {
            items,
            pagination: Pagination::new(&page, total),
        })
    }

    /// Every lead matching `filter` up to the export cap, newest first.
    pub async fn export(
        &self,
        caller_id: Uuid,
        filter: &LeadFilter,
    ) -> Result<Vec<lead::Model>, LeadError> {
        let page = self.list(caller_id, filter, PageRequest::export()).await?;
        Ok(page.items.into_iter().map(|(lead, _)| lead).collect())
    }

    async fn resolve(
        &self,
        caller_id: Uuid,
        id: Uuid,
        operation: &'static str,
    ) -> Result<LeadWithOwner, LeadError> {
        let found = self
            .leads
            .find_with_owner(id)
            .await
            .map_err(LeadError::persistence(operation))?
            .ok_or(LeadError::NotFound)?;

        assert_owner(&found.0, caller_id)?;
        Ok(found)
    }
}
