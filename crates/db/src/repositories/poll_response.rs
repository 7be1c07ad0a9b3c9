//! Poll response repository.
//!
//! Reads run on the shared connection. Mutations of a response slot take an
//! explicit connection so the ledger can run them inside one transaction:
//! lock the slot, decide, write, commit.

use std::sync::Arc;

use crate::entities::{PollResponse, PollResponseOption, poll_response, poll_response_option};
use polis_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, TransactionTrait, sea_query::OnConflict,
};

/// Poll response repository for database operations.
#[derive(Clone)]
pub struct PollResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl PollResponseRepository {
    /// Create a new poll response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Start a transaction for a slot mutation.
    pub async fn begin(&self) -> AppResult<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a respondent's slot on a poll, whatever its status.
    pub async fn find_by_poll_and_respondent(
        &self,
        poll_id: &str,
        respondent_id: &str,
    ) -> AppResult<Option<poll_response::Model>> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .filter(poll_response::Column::RespondentId.eq(respondent_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all active responses of a poll.
    pub async fn find_active_by_poll(
        &self,
        poll_id: &str,
    ) -> AppResult<Vec<poll_response::Model>> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .filter(poll_response::Column::Status.eq(poll_response::ResponseStatus::Active))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a respondent has ever responded to a poll (active or withdrawn).
    pub async fn has_participated(&self, poll_id: &str, respondent_id: &str) -> AppResult<bool> {
        let count = PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .filter(poll_response::Column::RespondentId.eq(respondent_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Count responses of a poll, whatever their status.
    pub async fn count_by_poll(&self, poll_id: &str) -> AppResult<u64> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the selection rows of several responses.
    pub async fn find_selections(
        &self,
        response_ids: &[String],
    ) -> AppResult<Vec<poll_response_option::Model>> {
        if response_ids.is_empty() {
            return Ok(Vec::new());
        }

        PollResponseOption::find()
            .filter(poll_response_option::Column::ResponseId.is_in(response_ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the option ids selected by one response.
    pub async fn find_selected_option_ids(&self, response_id: &str) -> AppResult<Vec<String>> {
        self.selected_option_ids(self.db.as_ref(), response_id)
            .await
    }

    // ==================== Slot mutations ====================

    /// Read a respondent's slot and lock it for the rest of the transaction.
    pub async fn lock_slot<C: ConnectionTrait>(
        &self,
        conn: &C,
        poll_id: &str,
        respondent_id: &str,
    ) -> AppResult<Option<poll_response::Model>> {
        PollResponse::find()
            .filter(poll_response::Column::PollId.eq(poll_id))
            .filter(poll_response::Column::RespondentId.eq(respondent_id))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read a response by ID and lock it for the rest of the transaction.
    pub async fn lock_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: &str,
    ) -> AppResult<Option<poll_response::Model>> {
        PollResponse::find_by_id(id)
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new slot unless the respondent already has one.
    ///
    /// A concurrent first submission loses silently here; callers re-read
    /// the slot with [`Self::lock_slot`] to find out which row won.
    pub async fn insert_slot<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: poll_response::ActiveModel,
    ) -> AppResult<()> {
        PollResponse::insert(model)
            .on_conflict(
                OnConflict::columns([
                    poll_response::Column::PollId,
                    poll_response::Column::RespondentId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .do_nothing()
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Update a response.
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: poll_response::ActiveModel,
    ) -> AppResult<poll_response::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the option ids selected by one response.
    pub async fn selected_option_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        response_id: &str,
    ) -> AppResult<Vec<String>> {
        let rows = PollResponseOption::find()
            .filter(poll_response_option::Column::ResponseId.eq(response_id))
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|row| row.option_id).collect())
    }

    /// Swap the whole selection set of a response for `option_ids`.
    pub async fn replace_selection<C: ConnectionTrait>(
        &self,
        conn: &C,
        response_id: &str,
        option_ids: &[String],
    ) -> AppResult<()> {
        PollResponseOption::delete_many()
            .filter(poll_response_option::Column::ResponseId.eq(response_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if option_ids.is_empty() {
            return Ok(());
        }

        let rows = option_ids
            .iter()
            .map(|option_id| poll_response_option::ActiveModel {
                response_id: sea_orm::Set(response_id.to_string()),
                option_id: sea_orm::Set(option_id.clone()),
            });

        PollResponseOption::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
