use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .col(pk_uuid(User::Id))
                    .col(string(User::AuthId))
                    .col(string(User::Username))
                    .col(string(User::Name))
                    .col(string_null(User::Bio))
                    .col(string_null(User::Image))
                    .col(boolean(User::Onboarded))
                    .to_owned(),
            )
            .await?;

        // The identity-provider id is the lookup key for every user operation
        manager
            .create_index(
                Index::create()
                    .name("idx_users_auth_id")
                    .table(User::Table)
                    .col(User::AuthId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_username")
                    .table(User::Table)
                    .col(User::Username)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    AuthId,
    Username,
    Name,
    Bio,
    Image,
    Onboarded,
}
