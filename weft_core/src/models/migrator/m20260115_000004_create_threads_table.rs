use sea_orm_migration::{prelude::*, schema::*};

use super::m20260115_000001_create_users_table::User;
use super::m20260115_000002_create_communities_table::Community;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Thread::Table)
                    .col(pk_uuid(Thread::Id))
                    .col(uuid(Thread::AuthorId))
                    .col(uuid_null(Thread::CommunityId))
                    .col(uuid_null(Thread::ParentId)) // NULL marks a top-level post
                    .col(string(Thread::Text))
                    .col(timestamp_with_time_zone(Thread::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-thread-author_id")
                            .from(Thread::Table, Thread::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-thread-community_id")
                            .from(Thread::Table, Thread::CommunityId)
                            .to(Community::Table, Community::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-thread-parent_id")
                            .from(Thread::Table, Thread::ParentId)
                            .to(Thread::Table, Thread::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_threads_author_id")
                    .table(Thread::Table)
                    .col(Thread::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_threads_community_id")
                    .table(Thread::Table)
                    .col(Thread::CommunityId)
                    .to_owned(),
            )
            .await?;

        // Reply lookups walk parent_id; the feed sorts on created_at
        manager
            .create_index(
                Index::create()
                    .name("idx_threads_parent_id")
                    .table(Thread::Table)
                    .col(Thread::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_threads_created_at")
                    .table(Thread::Table)
                    .col(Thread::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Thread::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Thread {
    Table,
    Id,
    AuthorId,
    CommunityId,
    ParentId,
    Text,
    CreatedAt,
}
