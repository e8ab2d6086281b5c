// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create tasks table
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tasks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string_len(8)
                            .not_null()
                            .default("enqueued"),
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
                    .col(ColumnDef::new(Tasks::MessageData).blob().not_null())
                    .col(ColumnDef::new(Tasks::ActorName).string_len(300).null())
                    .col(ColumnDef::new(Tasks::QueueName).string_len(100).null())
                    .to_owned(),
            )
            .await?;

        // Listings are ordered by the last write
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_updated_at")
                    .table(Tasks::Table)
                    .col(Tasks::UpdatedAt)
                    .to_owned(),
            )
            .await
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
    Status,
    CreatedAt,
    UpdatedAt,
    MessageData,
    ActorName,
    QueueName,
}
