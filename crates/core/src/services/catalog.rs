//! Option catalog: the immutable set of selectable options of a poll.

use std::collections::HashSet;

use polis_common::{AppError, AppResult, PollConfig};
use polis_db::entities::poll_option;

/// Minimum number of options on a choice poll.
pub const MIN_OPTIONS: usize = 2;

/// The options of one poll, in `position` order.
#[derive(Debug, Clone, Default)]
pub struct OptionCatalog {
    options: Vec<poll_option::Model>,
}

impl OptionCatalog {
    #[must_use]
    pub fn new(mut options: Vec<poll_option::Model>) -> Self {
        options.sort_by_key(|option| option.position);
        Self { options }
    }

    #[must_use]
    pub fn contains(&self, option_id: &str) -> bool {
        self.options.iter().any(|option| option.id == option_id)
    }

    /// Check a `single_choice` selection.
    pub fn validate_single(&self, option_id: &str) -> AppResult<()> {
        if self.contains(option_id) {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "Option {option_id} does not belong to this poll"
            )))
        }
    }

    /// Check a `multi_choice` selection set.
    ///
    /// Returns the ids in catalog order.
    pub fn validate_selection(&self, option_ids: &[String]) -> AppResult<Vec<String>> {
        if option_ids.is_empty() {
            return Err(AppError::Validation(
                "At least one option must be selected".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(option_ids.len());
        for option_id in option_ids {
            if !seen.insert(option_id.as_str()) {
                return Err(AppError::Validation(format!(
                    "Option {option_id} is selected more than once"
                )));
            }
            self.validate_single(option_id)?;
        }

        Ok(self
            .options
            .iter()
            .filter(|option| seen.contains(option.id.as_str()))
            .map(|option| option.id.clone())
            .collect())
    }

    /// Check option texts supplied at poll creation.
    ///
    /// Returns the trimmed texts in the order given.
    pub fn validate_texts(texts: &[String], limits: &PollConfig) -> AppResult<Vec<String>> {
        if texts.len() < MIN_OPTIONS {
            return Err(AppError::Validation(format!(
                "Poll must have at least {MIN_OPTIONS} options"
            )));
        }
        if texts.len() > limits.max_options {
            return Err(AppError::Validation(format!(
                "Poll cannot have more than {} options",
                limits.max_options
            )));
        }

        texts
            .iter()
            .map(|text| {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation(
                        "Poll options cannot be empty".to_string(),
                    ));
                }
                if trimmed.chars().count() > limits.max_option_length {
                    return Err(AppError::Validation(format!(
                        "Poll option is too long (max {} chars)",
                        limits.max_option_length
                    )));
                }
                Ok(trimmed.to_string())
            })
            .collect()
    }
}
