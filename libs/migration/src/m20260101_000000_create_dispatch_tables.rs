use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Messages::Table)
                    .if_not_exists()
                    .col(pk_auto(Messages::Id))
                    .col(string(Messages::PhoneNumber))
                    .col(text(Messages::Content))
                    .col(string_len(Messages::Status, 20).default("pending"))
                    .col(string_null(Messages::MessageId))
                    .col(text_null(Messages::LastError))
                    .col(timestamp_with_time_zone(Messages::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone_null(Messages::ProcessedAt))
                    .col(timestamp_with_time_zone_null(Messages::SentAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_messages_status")
                    .table(Messages::Table)
                    .col(Messages::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MessageRetries::Table)
                    .if_not_exists()
                    .col(pk_auto(MessageRetries::Id))
                    .col(integer(MessageRetries::OriginalMessageId))
                    .col(string(MessageRetries::PhoneNumber))
                    .col(text(MessageRetries::Content))
                    .col(integer(MessageRetries::RetryCount).default(1))
                    .col(text_null(MessageRetries::LastError))
                    .col(timestamp_with_time_zone(MessageRetries::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_retries_retry_count")
                    .table(MessageRetries::Table)
                    .col(MessageRetries::RetryCount)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_retries_original_message_id")
                    .table(MessageRetries::Table)
                    .col(MessageRetries::OriginalMessageId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MessageDeadLetters::Table)
                    .if_not_exists()
                    .col(pk_auto(MessageDeadLetters::Id))
                    .col(integer(MessageDeadLetters::OriginalMessageId))
                    .col(string(MessageDeadLetters::PhoneNumber))
                    .col(text(MessageDeadLetters::Content))
                    .col(text_null(MessageDeadLetters::LastError))
                    .col(timestamp_with_time_zone(MessageDeadLetters::FailedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_message_dead_letters_original_message_id")
                    .table(MessageDeadLetters::Table)
                    .col(MessageDeadLetters::OriginalMessageId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MessageDeadLetters::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MessageRetries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Messages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
    PhoneNumber,
    Content,
    Status,
    MessageId,
    LastError,
    CreatedAt,
    ProcessedAt,
    SentAt,
}

#[derive(DeriveIden)]
enum MessageRetries {
    Table,
    Id,
    OriginalMessageId,
    PhoneNumber,
    Content,
    RetryCount,
    LastError,
    CreatedAt,
}

#[derive(DeriveIden)]
enum MessageDeadLetters {
    Table,
    Id,
    OriginalMessageId,
    PhoneNumber,
    Content,
    LastError,
    FailedAt,
}
