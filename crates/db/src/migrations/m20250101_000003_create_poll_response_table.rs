//! Create poll response table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollResponse::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollResponse::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PollResponse::PollId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollResponse::RespondentId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollResponse::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(PollResponse::OptionId).string_len(32))
                    .col(ColumnDef::new(PollResponse::LikertValue).integer())
                    .col(
                        ColumnDef::new(PollResponse::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PollResponse::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_response_poll")
                            .from(PollResponse::Table, PollResponse::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_response_option")
                            .from(PollResponse::Table, PollResponse::OptionId)
                            .to(PollOption::Table, PollOption::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (poll_id, respondent_id) - one response slot per respondent,
        // reused on reactivation, so at most one active response can exist
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_response_poll_respondent")
                    .table(PollResponse::Table)
                    .col(PollResponse::PollId)
                    .col(PollResponse::RespondentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (poll_id, status) (for aggregation over active responses)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_response_poll_status")
                    .table(PollResponse::Table)
                    .col(PollResponse::PollId)
                    .col(PollResponse::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollResponse::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollResponse {
    Table,
    Id,
    PollId,
    RespondentId,
    Status,
    OptionId,
    LikertValue,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}

#[derive(Iden)]
enum PollOption {
    Table,
    Id,
}
