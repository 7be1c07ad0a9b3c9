//! Create poll table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Poll::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Poll::ParentId).string_len(64).not_null())
                    .col(ColumnDef::new(Poll::AuthorId).string_len(64).not_null())
                    .col(ColumnDef::new(Poll::Question).text().not_null())
                    .col(ColumnDef::new(Poll::QuestionType).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Poll::VisibilityMode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Poll::ExpertOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::AllowVoteChange)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Poll::EndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Poll::ScalePoints).integer())
                    .col(ColumnDef::new(Poll::MinLabel).string_len(128))
                    .col(ColumnDef::new(Poll::MidLabel).string_len(128))
                    .col(ColumnDef::new(Poll::MaxLabel).string_len(128))
                    .col(ColumnDef::new(Poll::ArchivedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .check(Expr::col(Poll::EndAt).gt(Expr::col(Poll::StartAt)))
                    .to_owned(),
            )
            .await?;

        // Index: parent_id (for listing polls attached to a content item)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_parent_id")
                    .table(Poll::Table)
                    .col(Poll::ParentId)
                    .to_owned(),
            )
            .await?;

        // Index: author_id
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_author_id")
                    .table(Poll::Table)
                    .col(Poll::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    ParentId,
    AuthorId,
    Question,
    QuestionType,
    VisibilityMode,
    ExpertOnly,
    AllowVoteChange,
    StartAt,
    EndAt,
    ScalePoints,
    MinLabel,
    MidLabel,
    MaxLabel,
    ArchivedAt,
    CreatedAt,
}
