//! Poll response entity: a respondent's answer slot for one poll.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a response slot. Transitions go both ways.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll_response")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Unique together with `respondent_id`
    pub poll_id: String,

    pub respondent_id: String,

    pub status: ResponseStatus,

    /// Selected option (`single_choice` only)
    #[sea_orm(nullable)]
    pub option_id: Option<String>,

    /// Selected scale value (likert only)
    #[sea_orm(nullable)]
    pub likert_value: Option<i32>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether this response counts toward results.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ResponseStatus::Active
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll::Entity",
        from = "Column::PollId",
        to = "super::poll::Column::Id",
        on_delete = "Cascade"
    )]
    Poll,

    #[sea_orm(
        belongs_to = "super::poll_option::Entity",
        from = "Column::OptionId",
        to = "super::poll_option::Column::Id",
        on_delete = "SetNull"
    )]
    PollOption,

    #[sea_orm(has_many = "super::poll_response_option::Entity")]
    SelectedOptions,
}

impl Related<super::poll::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Poll.def()
    }
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOption.def()
    }
}

impl Related<super::poll_response_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SelectedOptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
