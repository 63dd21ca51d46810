//! Lead repository for database operations
//!
//! Every read that feeds a response loads the owning user alongside the
//! lead so the owner's name and email can be rendered.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::listing::{LeadFilter, PageRequest, lead_condition};
use crate::models::lead::{self, Entity as Lead};
use crate::models::user;
use crate::validation::LeadInput;

/// A lead together with its owner row (absent only if the user vanished mid-query).
pub type LeadWithOwner = (lead::Model, Option<user::Model>);

/// Repository for lead database operations
#[derive(Debug, Clone)]
pub struct LeadRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl LeadRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Inserts a new lead owned by `owner_id`.
    pub async fn create(
        &self,
        owner_id: Uuid,
        input: &LeadInput,
    ) -> Result<lead::Model, RepositoryError> {
        let now = Utc::now();
        let mut active = lead::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };
        apply_input(&mut active, input);

        active
            .insert(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<lead::Model>, RepositoryError> {
        Lead::find_by_id(id)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_with_owner(&self, id: Uuid) -> Result<Option<LeadWithOwner>, RepositoryError> {
        Lead::find_by_id(id)
            .find_also_related(user::Entity)
            .one(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Replaces every editable field of `existing` and refreshes `updated_at`.
    ///
    /// Identity, owner and creation time are left untouched.
    pub async fn update(
        &self,
        existing: lead::Model,
        input: &LeadInput,
    ) -> Result<lead::Model, RepositoryError> {
        let mut active = existing.into_active_model();
        apply_input(&mut active, input);
        active.updated_at = Set(Utc::now().into());

        active
            .update(&*self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes by id, returning whether a row was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let result = Lead::delete_by_id(id)
            .exec(&*self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(result.rows_affected > 0)
    }

    /// Runs the filtered listing for `owner_id`, returning the requested slice
    /// and the total number of matches.
    ///
    /// Rows are ordered by `updated_at` descending, then `created_at` and `id`
    /// descending so equal timestamps still page deterministically.
    pub async fn list(
        &self,
        owner_id: Uuid,
        filter: &LeadFilter,
        page: &PageRequest,
    ) -> Result<(Vec<LeadWithOwner>, u64), RepositoryError> {
        let condition = lead_condition(owner_id, filter);

        let rows = Lead::find()
            .filter(condition.clone())
            .order_by_desc(lead::Column::UpdatedAt)
            .order_by_desc(lead::Column::CreatedAt)
            .order_by_desc(lead::Column::Id)
            .find_also_related(user::Entity)
            .offset(page.offset())
            .limit(page.limit())
            .all(&*self.db);
        let total = Lead::find().filter(condition).count(&*self.db);

        tokio::try_join!(rows, total).map_err(RepositoryError::database_error)
    }
}

fn apply_input(active: &mut lead::ActiveModel, input: &LeadInput) {
    active.full_name = Set(input.full_name.clone());
    active.email = Set(input.email.clone());
    active.phone = Set(input.phone.clone());
    active.city = Set(input.city);
    active.property_type = Set(input.property_type);
    active.bhk = Set(input.bhk);
    active.purpose = Set(input.purpose);
    active.budget_min = Set(input.budget_min);
    active.budget_max = Set(input.budget_max);
    active.timeline = Set(input.timeline);
    active.source = Set(input.source);
    active.status = Set(input.status);
    active.notes = Set(input.notes.clone());
    active.tags = Set(input.tags.clone());
}
