//! Junction rows realizing a `multi_choice` selection set.
//!
//! The set for a response is always swapped as a whole.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "poll_response_option")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub response_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub option_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::poll_response::Entity",
        from = "Column::ResponseId",
        to = "super::poll_response::Column::Id",
        on_delete = "Cascade"
    )]
    Response,

    #[sea_orm(
        belongs_to = "super::poll_option::Entity",
        from = "Column::OptionId",
        to = "super::poll_option::Column::Id",
        on_delete = "Cascade"
    )]
    PollOption,
}

impl Related<super::poll_response::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Response.def()
    }
}

impl Related<super::poll_option::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
