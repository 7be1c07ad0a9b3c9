//! Poll entity: one structured question attached to a parent content item.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Shape of the answers a poll accepts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    #[sea_orm(string_value = "single_choice")]
    SingleChoice,
    #[sea_orm(string_value = "multi_choice")]
    MultiChoice,
    #[sea_orm(string_value = "likert")]
    Likert,
}

impl QuestionType {
    /// Whether answers reference rows of the option catalog.
    #[must_use]
    pub const fn is_choice(self) -> bool {
        matches!(self, Self::SingleChoice | Self::MultiChoice)
    }
}

/// When computed results may be shown.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum VisibilityMode {
    #[sea_orm(string_value = "always_visible")]
    AlwaysVisible,
    #[sea_orm(string_value = "hidden_until_close")]
    HiddenUntilClose,
    #[sea_orm(string_value = "visible_after_vote")]
    VisibleAfterVote,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Content item the poll is attached to (opaque)
    #[sea_orm(indexed)]
    pub parent_id: String,

    /// Author of the poll (opaque)
    pub author_id: String,

    #[sea_orm(column_type = "Text")]
    pub question: String,

    /// Immutable once any response exists
    pub question_type: QuestionType,

    pub visibility_mode: VisibilityMode,

    pub expert_only: bool,

    pub allow_vote_change: bool,

    /// Inclusive start of the voting window
    pub start_at: DateTimeWithTimeZone,

    /// Exclusive end of the voting window
    pub end_at: DateTimeWithTimeZone,

    /// Likert only
    #[sea_orm(nullable)]
    pub scale_points: Option<i32>,

    #[sea_orm(nullable)]
    pub min_label: Option<String>,

    #[sea_orm(nullable)]
    pub mid_label: Option<String>,

    #[sea_orm(nullable)]
    pub max_label: Option<String>,

    /// Soft archival marker; polls are never hard-deleted
    #[sea_orm(nullable)]
    pub archived_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_option::Entity")]
    Options,

    #[sea_orm(has_many = "super::poll_response::Entity")]
    Responses,
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Options.def()
    }
}

impl Related<super::poll_response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Responses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
