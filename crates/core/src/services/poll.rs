//! Poll service.

use chrono::{DateTime, Utc};
use polis_common::{AppError, AppResult, IdGenerator, PollConfig, SharedClock};
use polis_db::{
    entities::{
        poll::{self, QuestionType, VisibilityMode},
        poll_option,
    },
    repositories::{PollOptionRepository, PollRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::{catalog::OptionCatalog, window::WindowPhase};

/// Smallest accepted likert scale.
pub const MIN_SCALE_POINTS: i32 = 2;

/// Definition of a new poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSpec {
    pub question: String,
    pub question_type: QuestionType,
    pub visibility_mode: VisibilityMode,
    #[serde(default)]
    pub expert_only: bool,
    #[serde(default)]
    pub allow_vote_change: bool,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// Choice types only.
    #[serde(default)]
    pub options: Vec<String>,
    /// Likert only.
    pub scale_points: Option<i32>,
    pub min_label: Option<String>,
    pub mid_label: Option<String>,
    pub max_label: Option<String>,
}

/// A poll with its options and current window phase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
    pub phase: WindowPhase,
}

/// Service for defining and looking up polls.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    option_repo: PollOptionRepository,
    clock: SharedClock,
    limits: PollConfig,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        option_repo: PollOptionRepository,
        clock: SharedClock,
        limits: PollConfig,
    ) -> Self {
        Self {
            poll_repo,
            option_repo,
            clock,
            limits,
            id_gen: IdGenerator::new(),
        }
    }

    /// Define a poll on `parent_id`.
    ///
    /// The poll and its options are stored together or not at all.
    pub async fn create_poll(
        &self,
        parent_id: &str,
        author_id: &str,
        spec: PollSpec,
    ) -> AppResult<PollView> {
        if spec.end_at <= spec.start_at {
            return Err(AppError::Validation(
                "Poll end must be after its start".to_string(),
            ));
        }

        let question = spec.question.trim();
        if question.is_empty() {
            return Err(AppError::Validation(
                "Poll question cannot be empty".to_string(),
            ));
        }
        if question.chars().count() > self.limits.max_question_length {
            return Err(AppError::Validation(format!(
                "Poll question is too long (max {} chars)",
                self.limits.max_question_length
            )));
        }

        let (option_texts, scale_points, labels) = if spec.question_type.is_choice() {
            if spec.scale_points.is_some() || has_labels(&spec) {
                return Err(AppError::Validation(
                    "Choice polls cannot define a scale".to_string(),
                ));
            }
            let texts = OptionCatalog::validate_texts(&spec.options, &self.limits)?;
            (texts, None, [None, None, None])
        } else {
            if !spec.options.is_empty() {
                return Err(AppError::Validation(
                    "Likert polls cannot have options".to_string(),
                ));
            }
            let points = spec.scale_points.ok_or_else(|| {
                AppError::Validation("Likert polls require scale points".to_string())
            })?;
            if !(MIN_SCALE_POINTS..=self.limits.max_scale_points).contains(&points) {
                return Err(AppError::Validation(format!(
                    "Scale points must be between {MIN_SCALE_POINTS} and {}",
                    self.limits.max_scale_points
                )));
            }
            let labels = [
                self.validate_label(spec.min_label.as_deref())?,
                self.validate_label(spec.mid_label.as_deref())?,
                self.validate_label(spec.max_label.as_deref())?,
            ];
            (Vec::new(), Some(points), labels)
        };

        let now = self.clock.now();
        let poll_id = self.id_gen.generate();
        let [min_label, mid_label, max_label] = labels;

        let model = poll::ActiveModel {
            id: Set(poll_id.clone()),
            parent_id: Set(parent_id.to_string()),
            author_id: Set(author_id.to_string()),
            question: Set(question.to_string()),
            question_type: Set(spec.question_type),
            visibility_mode: Set(spec.visibility_mode),
            expert_only: Set(spec.expert_only),
            allow_vote_change: Set(spec.allow_vote_change),
            start_at: Set(spec.start_at.into()),
            end_at: Set(spec.end_at.into()),
            scale_points: Set(scale_points),
            min_label: Set(min_label),
            mid_label: Set(mid_label),
            max_label: Set(max_label),
            archived_at: Set(None),
            created_at: Set(now.into()),
        };

        let options = option_texts
            .into_iter()
            .zip(0_i32..)
            .map(|(text, position)| poll_option::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(poll_id.clone()),
                text: Set(text),
                position: Set(position),
            })
            .collect();

        let (poll, options) = self.poll_repo.create_with_options(model, options).await?;

        tracing::info!(
            poll_id = %poll.id,
            parent_id = %poll.parent_id,
            question_type = ?poll.question_type,
            options = options.len(),
            "Created poll"
        );

        let phase = WindowPhase::of(&poll, now);
        Ok(PollView {
            poll,
            options,
            phase,
        })
    }

    /// Get a poll with its options.
    pub async fn get_poll(&self, poll_id: &str) -> AppResult<PollView> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let options = self.option_repo.find_by_poll(poll_id).await?;
        let phase = WindowPhase::of(&poll, self.clock.now());
        Ok(PollView {
            poll,
            options,
            phase,
        })
    }

    /// List polls attached to a content item, newest first.
    pub async fn list_polls(&self, parent_id: &str) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.find_by_parent(parent_id).await
    }

    /// Close a poll early. Only its author may do so.
    pub async fn archive_poll(&self, poll_id: &str, author_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;

        if poll.author_id != author_id {
            return Err(AppError::Forbidden(
                "Only the author can archive this poll".to_string(),
            ));
        }
        if poll.archived_at.is_some() {
            return Ok(poll);
        }

        let mut active: poll::ActiveModel = poll.into();
        active.archived_at = Set(Some(self.clock.now().into()));
        let poll = self.poll_repo.update(active).await?;

        tracing::info!(poll_id = %poll.id, "Archived poll");
        Ok(poll)
    }

    fn validate_label(&self, label: Option<&str>) -> AppResult<Option<String>> {
        let Some(label) = label else {
            return Ok(None);
        };
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::Validation(
                "Scale labels cannot be empty".to_string(),
            ));
        }
        if label.chars().count() > self.limits.max_label_length {
            return Err(AppError::Validation(format!(
                "Scale label is too long (max {} chars)",
                self.limits.max_label_length
            )));
        }
        Ok(Some(label.to_string()))
    }
}

fn has_labels(spec: &PollSpec) -> bool {
    spec.min_label.is_some() || spec.mid_label.is_some() || spec.max_label.is_some()
}
