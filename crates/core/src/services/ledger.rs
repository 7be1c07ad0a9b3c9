//! Response ledger: records, updates and withdraws respondents' answers.
//!
//! Every respondent owns at most one response slot per poll. The slot is
//! created on first submission, toggled between active and withdrawn, and
//! never deleted. All mutations run inside one transaction holding a row
//! lock on the slot, so concurrent submissions by the same respondent
//! serialize and leave exactly one active response behind.

use polis_common::{AppError, AppResult, IdGenerator, SharedClock};
use polis_db::{
    entities::{
        poll::{self, QuestionType},
        poll_response::{self, ResponseStatus},
    },
    repositories::{PollOptionRepository, PollRepository, PollResponseRepository},
};
use sea_orm::{DatabaseTransaction, Set};
use serde::{Deserialize, Serialize};

use super::{catalog::OptionCatalog, window::WindowPhase};

/// Identity of the caller answering a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Respondent {
    pub id: String,
    pub is_expert: bool,
}

impl Respondent {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_expert: false,
        }
    }

    #[must_use]
    pub fn expert(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_expert: true,
        }
    }
}

/// Answer to a `single_choice` or likert poll.
///
/// `multi_choice` answers are set through [`ResponseLedger::replace_options`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ResponsePayload {
    SingleChoice { option_id: String },
    Likert { value: i32 },
}

impl ResponsePayload {
    const fn question_type(&self) -> QuestionType {
        match self {
            Self::SingleChoice { .. } => QuestionType::SingleChoice,
            Self::Likert { .. } => QuestionType::Likert,
        }
    }

    fn apply(self, model: &mut poll_response::ActiveModel) {
        match self {
            Self::SingleChoice { option_id } => {
                model.option_id = Set(Some(option_id));
                model.likert_value = Set(None);
            }
            Self::Likert { value } => {
                model.option_id = Set(None);
                model.likert_value = Set(Some(value));
            }
        }
    }
}

/// Fields to change on an existing answer. Missing fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialPayload {
    pub option_id: Option<String>,
    pub value: Option<i32>,
}

/// A response together with its selected options (`multi_choice` only).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseWithOptions {
    pub response: poll_response::Model,
    pub option_ids: Vec<String>,
}

/// Service owning all writes to poll responses.
#[derive(Clone)]
pub struct ResponseLedger {
    poll_repo: PollRepository,
    option_repo: PollOptionRepository,
    response_repo: PollResponseRepository,
    clock: SharedClock,
    id_gen: IdGenerator,
}

impl ResponseLedger {
    /// Create a new response ledger.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        option_repo: PollOptionRepository,
        response_repo: PollResponseRepository,
        clock: SharedClock,
    ) -> Self {
        Self {
            poll_repo,
            option_repo,
            response_repo,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record an answer for `respondent`.
    ///
    /// A withdrawn slot is reactivated with the new answer. An active slot is
    /// overwritten only when the poll allows vote changes.
    pub async fn submit(
        &self,
        poll_id: &str,
        respondent: &Respondent,
        payload: ResponsePayload,
    ) -> AppResult<poll_response::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.ensure_writable(&poll)?;
        ensure_eligible(&poll, respondent)?;

        let catalog = self.catalog_for(&poll).await?;
        validate_payload(&poll, &catalog, &payload)?;

        let txn = self.response_repo.begin().await?;
        let (slot, fresh) = self.acquire_slot(&txn, poll_id, &respondent.id).await?;

        if !fresh && slot.is_active() && !poll.allow_vote_change {
            return Err(vote_change_denied());
        }

        let changed = !fresh && slot.is_active();
        let mut active: poll_response::ActiveModel = slot.into();
        payload.apply(&mut active);
        active.status = Set(ResponseStatus::Active);
        active.updated_at = Set(self.clock.now().into());

        let response = self.response_repo.update(&txn, active).await?;
        commit(txn).await?;

        tracing::debug!(
            poll_id = %poll_id,
            response_id = %response.id,
            respondent_id = %respondent.id,
            changed,
            "Recorded poll response"
        );
        Ok(response)
    }

    /// Change fields of an active answer owned by `respondent`.
    pub async fn update(
        &self,
        poll_id: &str,
        response_id: &str,
        respondent: &Respondent,
        partial: PartialPayload,
    ) -> AppResult<poll_response::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        self.ensure_writable(&poll)?;
        ensure_eligible(&poll, respondent)?;
        if poll.question_type == QuestionType::MultiChoice {
            return Err(multi_choice_payload());
        }

        let catalog = self.catalog_for(&poll).await?;

        let txn = self.response_repo.begin().await?;
        let response = self
            .lock_owned(&txn, poll_id, response_id, &respondent.id)
            .await?;

        if !response.is_active() {
            return Err(AppError::State("response not active".to_string()));
        }
        if !poll.allow_vote_change {
            return Err(vote_change_denied());
        }

        let payload = merge_payload(&poll, &response, partial)?;
        validate_payload(&poll, &catalog, &payload)?;

        let mut active: poll_response::ActiveModel = response.into();
        payload.apply(&mut active);
        active.updated_at = Set(self.clock.now().into());

        let response = self.response_repo.update(&txn, active).await?;
        commit(txn).await?;

        tracing::debug!(poll_id = %poll_id, response_id = %response.id, "Updated poll response");
        Ok(response)
    }

    /// Withdraw an answer. Withdrawing twice succeeds.
    ///
    /// The slot stays behind, so the respondent still counts as having
    /// participated.
    pub async fn withdraw(
        &self,
        poll_id: &str,
        response_id: &str,
        respondent_id: &str,
    ) -> AppResult<()> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        let txn = self.response_repo.begin().await?;
        let response = self
            .lock_owned(&txn, poll_id, response_id, respondent_id)
            .await?;

        if !response.is_active() {
            tracing::debug!(response_id = %response_id, "Response already withdrawn");
            return Ok(());
        }

        self.ensure_writable(&poll)?;

        let mut active: poll_response::ActiveModel = response.into();
        active.status = Set(ResponseStatus::Withdrawn);
        active.updated_at = Set(self.clock.now().into());
        self.response_repo.update(&txn, active).await?;
        commit(txn).await?;

        tracing::debug!(poll_id = %poll_id, response_id = %response_id, "Withdrew poll response");
        Ok(())
    }

    /// Replace the whole selection set of a `multi_choice` answer.
    ///
    /// Without `response_id` the respondent's slot is found or created.
    pub async fn replace_options(
        &self,
        poll_id: &str,
        response_id: Option<&str>,
        respondent: &Respondent,
        option_ids: &[String],
    ) -> AppResult<ResponseWithOptions> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        if poll.question_type != QuestionType::MultiChoice {
            return Err(AppError::Validation(
                "Only multi_choice polls accept option sets".to_string(),
            ));
        }
        self.ensure_writable(&poll)?;
        ensure_eligible(&poll, respondent)?;

        let catalog = OptionCatalog::new(self.option_repo.find_by_poll(poll_id).await?);
        let selection = catalog.validate_selection(option_ids)?;

        let txn = self.response_repo.begin().await?;
        let (slot, fresh) = match response_id {
            Some(id) => (
                self.lock_owned(&txn, poll_id, id, &respondent.id).await?,
                false,
            ),
            None => self.acquire_slot(&txn, poll_id, &respondent.id).await?,
        };

        if !fresh && slot.is_active() && !poll.allow_vote_change {
            let mut current = self
                .response_repo
                .selected_option_ids(&txn, &slot.id)
                .await?;
            current.sort();
            let mut requested = selection.clone();
            requested.sort();
            if !current.is_empty() && current != requested {
                return Err(vote_change_denied());
            }
        }

        self.response_repo
            .replace_selection(&txn, &slot.id, &selection)
            .await?;

        let mut active: poll_response::ActiveModel = slot.into();
        active.status = Set(ResponseStatus::Active);
        active.option_id = Set(None);
        active.likert_value = Set(None);
        active.updated_at = Set(self.clock.now().into());
        let response = self.response_repo.update(&txn, active).await?;
        commit(txn).await?;

        tracing::debug!(
            poll_id = %poll_id,
            response_id = %response.id,
            selected = selection.len(),
            "Replaced poll response options"
        );
        Ok(ResponseWithOptions {
            response,
            option_ids: selection,
        })
    }

    /// The caller's own slot on a poll, active or withdrawn.
    pub async fn get_own_response(
        &self,
        poll_id: &str,
        respondent_id: &str,
    ) -> AppResult<ResponseWithOptions> {
        let response = self
            .response_repo
            .find_by_poll_and_respondent(poll_id, respondent_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No response to poll {poll_id}"))
            })?;
        let option_ids = self
            .response_repo
            .find_selected_option_ids(&response.id)
            .await?;
        Ok(ResponseWithOptions {
            response,
            option_ids,
        })
    }

    fn ensure_writable(&self, poll: &poll::Model) -> AppResult<()> {
        if poll.archived_at.is_some() {
            return Err(AppError::State("poll archived".to_string()));
        }
        if WindowPhase::of(poll, self.clock.now()).is_open() {
            Ok(())
        } else {
            Err(AppError::State("poll not open".to_string()))
        }
    }

    async fn catalog_for(&self, poll: &poll::Model) -> AppResult<OptionCatalog> {
        if poll.question_type.is_choice() {
            Ok(OptionCatalog::new(
                self.option_repo.find_by_poll(&poll.id).await?,
            ))
        } else {
            Ok(OptionCatalog::default())
        }
    }

    /// Lock `response_id` and check it belongs to `poll_id` and `respondent_id`.
    async fn lock_owned(
        &self,
        txn: &DatabaseTransaction,
        poll_id: &str,
        response_id: &str,
        respondent_id: &str,
    ) -> AppResult<poll_response::Model> {
        let response = self
            .response_repo
            .lock_by_id(txn, response_id)
            .await?
            .filter(|response| response.poll_id == poll_id)
            .ok_or_else(|| AppError::NotFound(format!("Response not found: {response_id}")))?;

        if response.respondent_id != respondent_id {
            return Err(AppError::Forbidden(
                "response belongs to another respondent".to_string(),
            ));
        }
        Ok(response)
    }

    /// Lock the respondent's slot, creating it when missing.
    ///
    /// Returns the slot and whether this call created it.
    async fn acquire_slot(
        &self,
        txn: &DatabaseTransaction,
        poll_id: &str,
        respondent_id: &str,
    ) -> AppResult<(poll_response::Model, bool)> {
        if let Some(slot) = self
            .response_repo
            .lock_slot(txn, poll_id, respondent_id)
            .await?
        {
            return Ok((slot, false));
        }

        let now = self.clock.now();
        let candidate = self.id_gen.generate();
        self.response_repo
            .insert_slot(
                txn,
                poll_response::ActiveModel {
                    id: Set(candidate.clone()),
                    poll_id: Set(poll_id.to_string()),
                    respondent_id: Set(respondent_id.to_string()),
                    status: Set(ResponseStatus::Active),
                    option_id: Set(None),
                    likert_value: Set(None),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                },
            )
            .await?;

        let slot = self
            .response_repo
            .lock_slot(txn, poll_id, respondent_id)
            .await?
            .ok_or_else(|| AppError::Internal("response slot missing after insert".to_string()))?;

        let fresh = slot.id == candidate;
        if !fresh {
            tracing::warn!(
                poll_id = %poll_id,
                respondent_id = %respondent_id,
                "Concurrent submission created the response slot first"
            );
        }
        Ok((slot, fresh))
    }
}

fn ensure_eligible(poll: &poll::Model, respondent: &Respondent) -> AppResult<()> {
    if poll.expert_only && !respondent.is_expert {
        return Err(AppError::Forbidden(
            "poll restricted to experts".to_string(),
        ));
    }
    Ok(())
}

fn validate_payload(
    poll: &poll::Model,
    catalog: &OptionCatalog,
    payload: &ResponsePayload,
) -> AppResult<()> {
    if poll.question_type == QuestionType::MultiChoice {
        return Err(multi_choice_payload());
    }
    if payload.question_type() != poll.question_type {
        return Err(AppError::Validation(format!(
            "Answer does not match question type {:?}",
            poll.question_type
        )));
    }

    match payload {
        ResponsePayload::SingleChoice { option_id } => catalog.validate_single(option_id),
        ResponsePayload::Likert { value } => {
            let points = poll.scale_points.unwrap_or_default();
            if (1..=points).contains(value) {
                Ok(())
            } else {
                Err(AppError::Validation(format!(
                    "Value must be between 1 and {points}"
                )))
            }
        }
    }
}

/// Fill the gaps of `partial` from the stored answer.
fn merge_payload(
    poll: &poll::Model,
    response: &poll_response::Model,
    partial: PartialPayload,
) -> AppResult<ResponsePayload> {
    match poll.question_type {
        QuestionType::SingleChoice => {
            if partial.value.is_some() {
                return Err(AppError::Validation(
                    "single_choice answers take an optionId".to_string(),
                ));
            }
            partial
                .option_id
                .or_else(|| response.option_id.clone())
                .map(|option_id| ResponsePayload::SingleChoice { option_id })
                .ok_or_else(|| AppError::Validation("optionId is required".to_string()))
        }
        QuestionType::Likert => {
            if partial.option_id.is_some() {
                return Err(AppError::Validation(
                    "likert answers take a value".to_string(),
                ));
            }
            partial
                .value
                .or(response.likert_value)
                .map(|value| ResponsePayload::Likert { value })
                .ok_or_else(|| AppError::Validation("value is required".to_string()))
        }
        QuestionType::MultiChoice => Err(multi_choice_payload()),
    }
}

async fn commit(txn: DatabaseTransaction) -> AppResult<()> {
    txn.commit()
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

fn vote_change_denied() -> AppError {
    AppError::Conflict("vote change not permitted".to_string())
}

fn multi_choice_payload() -> AppError {
    AppError::Validation("multi_choice answers are set by replacing options".to_string())
}
