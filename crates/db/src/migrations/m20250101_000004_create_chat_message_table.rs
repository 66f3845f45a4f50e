//! Create `chat_message` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::CommunityId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::SenderId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::ChatType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChatMessage::RecipientId).string_len(32))
                    .col(ColumnDef::new(ChatMessage::Content).text().not_null())
                    .col(
                        ColumnDef::new(ChatMessage::MessageType)
                            .string_len(20)
                            .not_null()
                            .default("text"),
                    )
                    .col(ColumnDef::new(ChatMessage::FileUrl).string_len(512))
                    .col(ColumnDef::new(ChatMessage::FileName).string_len(255))
                    .col(ColumnDef::new(ChatMessage::FileType).string_len(100))
                    .col(ColumnDef::new(ChatMessage::ReplyToId).string_len(32))
                    .col(
                        ColumnDef::new(ChatMessage::Reactions)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'{}'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::Edited)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::DeletedForEveryone)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::DeletedByUsers)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::ReadBy)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(ChatMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_community")
                            .from(ChatMessage::Table, ChatMessage::CommunityId)
                            .to(Community::Table, Community::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_sender")
                            .from(ChatMessage::Table, ChatMessage::SenderId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_recipient")
                            .from(ChatMessage::Table, ChatMessage::RecipientId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chat_message_reply_to")
                            .from(ChatMessage::Table, ChatMessage::ReplyToId)
                            .to(ChatMessage::Table, ChatMessage::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Community feed: scope + type + sort key
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_feed")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::CommunityId)
                    .col(ChatMessage::ChatType)
                    .col(ChatMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Direct conversation lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_conversation")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::SenderId)
                    .col(ChatMessage::RecipientId)
                    .col(ChatMessage::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Unread counts
        manager
            .create_index(
                Index::create()
                    .name("idx_chat_message_recipient_id")
                    .table(ChatMessage::Table)
                    .col(ChatMessage::RecipientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChatMessage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ChatMessage {
    Table,
    Id,
    CommunityId,
    SenderId,
    ChatType,
    RecipientId,
    Content,
    MessageType,
    FileUrl,
    FileName,
    FileType,
    ReplyToId,
    Reactions,
    Edited,
    DeletedForEveryone,
    DeletedByUsers,
    ReadBy,
    CreatedAt,
}

#[derive(Iden)]
enum Community {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
