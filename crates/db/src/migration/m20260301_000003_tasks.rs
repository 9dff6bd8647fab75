//! Migration to create the `tasks` table backing the task queue.
//!
//! Tasks are written in the same transaction as the business rows that
//! produce them, so an enqueue commits or rolls back with its unit of work.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tasks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Tasks::Kind).string_len(100).not_null())
                    .col(ColumnDef::new(Tasks::Payload).blob().not_null())
                    .col(ColumnDef::new(Tasks::Queue).string_len(50).not_null())
                    .col(ColumnDef::new(Tasks::State).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Tasks::Retried)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Tasks::MaxRetry).integer().not_null())
                    .col(ColumnDef::new(Tasks::LastError).text().null())
                    .col(
                        ColumnDef::new(Tasks::ProcessAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tasks::LeaseExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Tasks::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Tasks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tasks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Claim query: due tasks of one queue in a pickable state
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_claim")
                    .table(Tasks::Table)
                    .col(Tasks::Queue)
                    .col(Tasks::State)
                    .col(Tasks::ProcessAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    Kind,
    Payload,
    Queue,
    State,
    Retried,
    MaxRetry,
    LastError,
    ProcessAt,
    LeaseExpiresAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}
