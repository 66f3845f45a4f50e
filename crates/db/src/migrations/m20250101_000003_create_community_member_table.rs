//! Create `community_member` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommunityMember::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommunityMember::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::CommunityId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CommunityMember::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_community_member_community")
                            .from(CommunityMember::Table, CommunityMember::CommunityId)
                            .to(Community::Table, Community::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_community_member_user")
                            .from(CommunityMember::Table, CommunityMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership row per user per community
        manager
            .create_index(
                Index::create()
                    .name("idx_community_member_unique")
                    .table(CommunityMember::Table)
                    .col(CommunityMember::CommunityId)
                    .col(CommunityMember::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_community_member_user_id")
                    .table(CommunityMember::Table)
                    .col(CommunityMember::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommunityMember::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CommunityMember {
    Table,
    Id,
    CommunityId,
    UserId,
    IsVerified,
    JoinedAt,
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
