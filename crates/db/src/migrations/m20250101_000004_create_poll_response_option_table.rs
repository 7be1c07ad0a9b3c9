//! Create poll response option (multi-choice selection) table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollResponseOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollResponseOption::ResponseId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollResponseOption::OptionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_poll_response_option")
                            .col(PollResponseOption::ResponseId)
                            .col(PollResponseOption::OptionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_response_option_response")
                            .from(PollResponseOption::Table, PollResponseOption::ResponseId)
                            .to(PollResponse::Table, PollResponse::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_response_option_option")
                            .from(PollResponseOption::Table, PollResponseOption::OptionId)
                            .to(PollOption::Table, PollOption::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: option_id (for per-option tallies)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_response_option_option_id")
                    .table(PollResponseOption::Table)
                    .col(PollResponseOption::OptionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollResponseOption::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollResponseOption {
    Table,
    ResponseId,
    OptionId,
}

#[derive(Iden)]
enum PollResponse {
    Table,
    Id,
}

#[derive(Iden)]
enum PollOption {
    Table,
    Id,
}
