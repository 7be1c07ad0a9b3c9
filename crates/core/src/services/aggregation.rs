//! Result aggregation.
//!
//! Results are computed from the currently active responses every time they
//! are requested. Nothing is cached, so a withdrawal or vote change shows up
//! on the next read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use polis_common::{AppResult, SharedClock};
use polis_db::{
    entities::{
        poll::{self, QuestionType},
        poll_option, poll_response, poll_response_option,
    },
    repositories::{PollOptionRepository, PollRepository, PollResponseRepository},
};
use serde::Serialize;

/// Votes for one option.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: String,
    pub text: String,
    pub position: i32,
    pub count: u64,
    /// `count / total_respondents`, from 0.0 to 1.0.
    pub percentage: f64,
}

/// Votes for one likert scale point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikertBucket {
    pub value: i32,
    pub count: u64,
    /// `count / total_respondents`, from 0.0 to 1.0.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ResultBreakdown {
    Choice {
        options: Vec<OptionTally>,
    },
    Likert {
        /// `None` until someone answers.
        mean: Option<f64>,
        distribution: Vec<LikertBucket>,
    },
}

/// Computed results of a poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub poll_id: String,
    pub question_type: QuestionType,
    /// Respondents with an active response.
    pub total_respondents: u64,
    pub breakdown: ResultBreakdown,
    pub computed_at: DateTime<Utc>,
}

/// Computes [`PollResult`]s from stored responses.
#[derive(Clone)]
pub struct AggregationEngine {
    poll_repo: PollRepository,
    option_repo: PollOptionRepository,
    response_repo: PollResponseRepository,
    clock: SharedClock,
}

impl AggregationEngine {
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
        }
    }

    /// Compute results for `poll_id`. Does not check visibility.
    pub async fn compute(&self, poll_id: &str) -> AppResult<PollResult> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let options = if poll.question_type.is_choice() {
            self.option_repo.find_by_poll(&poll.id).await?
        } else {
            Vec::new()
        };
        let responses = self.response_repo.find_active_by_poll(&poll.id).await?;

        let selections = if poll.question_type == QuestionType::MultiChoice {
            let ids: Vec<String> = responses.iter().map(|r| r.id.clone()).collect();
            self.response_repo.find_selections(&ids).await?
        } else {
            Vec::new()
        };

        let result = tally(&poll, &options, &responses, &selections, self.clock.now());
        tracing::debug!(
            poll_id = %poll.id,
            total_respondents = result.total_respondents,
            "Computed poll results"
        );
        Ok(result)
    }
}

/// Tally `responses` into a [`PollResult`]. Withdrawn responses are ignored.
#[must_use]
pub fn tally(
    poll: &poll::Model,
    options: &[poll_option::Model],
    responses: &[poll_response::Model],
    selections: &[poll_response_option::Model],
    computed_at: DateTime<Utc>,
) -> PollResult {
    let active: Vec<&poll_response::Model> = responses.iter().filter(|r| r.is_active()).collect();
    let total = active.len() as u64;

    let breakdown = match poll.question_type {
        QuestionType::SingleChoice => {
            let mut counts: HashMap<&str, u64> = HashMap::new();
            for option_id in active.iter().filter_map(|r| r.option_id.as_deref()) {
                *counts.entry(option_id).or_default() += 1;
            }
            choice_breakdown(options, &counts, total)
        }
        QuestionType::MultiChoice => {
            let mut counts: HashMap<&str, u64> = HashMap::new();
            for selection in selections
                .iter()
                .filter(|s| active.iter().any(|r| r.id == s.response_id))
            {
                *counts.entry(selection.option_id.as_str()).or_default() += 1;
            }
            choice_breakdown(options, &counts, total)
        }
        QuestionType::Likert => {
            let points = poll.scale_points.unwrap_or_default();
            let values: Vec<i32> = active.iter().filter_map(|r| r.likert_value).collect();
            let distribution = (1..=points)
                .map(|value| {
                    let count = values.iter().filter(|v| **v == value).count() as u64;
                    LikertBucket {
                        value,
                        count,
                        percentage: percentage(count, total),
                    }
                })
                .collect();
            let mean = (!values.is_empty()).then(|| {
                values.iter().map(|v| f64::from(*v)).sum::<f64>() / values.len() as f64
            });
            ResultBreakdown::Likert { mean, distribution }
        }
    };

    PollResult {
        poll_id: poll.id.clone(),
        question_type: poll.question_type,
        total_respondents: total,
        breakdown,
        computed_at,
    }
}

fn choice_breakdown(
    options: &[poll_option::Model],
    counts: &HashMap<&str, u64>,
    total: u64,
) -> ResultBreakdown {
    let mut ordered: Vec<&poll_option::Model> = options.iter().collect();
    ordered.sort_by_key(|option| option.position);

    let options = ordered
        .into_iter()
        .map(|option| {
            let count = counts.get(option.id.as_str()).copied().unwrap_or_default();
            OptionTally {
                option_id: option.id.clone(),
                text: option.text.clone(),
                position: option.position,
                count,
                percentage: percentage(count, total),
            }
        })
        .collect();
    ResultBreakdown::Choice { options }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
