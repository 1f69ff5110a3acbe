use sea_orm_migration::{prelude::*, schema::*};

use crate::m20241026_000001_create_users_and_media::{Media, Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Schedules::Table)
                    .if_not_exists()
                    .col(pk_auto(Schedules::Id))
                    .col(integer(Schedules::UserId))
                    .col(integer_null(Schedules::MediaId))
                    .col(string(Schedules::Title))
                    .col(string(Schedules::Date))
                    .col(big_integer(Schedules::CreatedAt))
                    .col(big_integer(Schedules::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_schedules_user")
                            .from(Schedules::Table, Schedules::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_schedules_media")
                            .from(Schedules::Table, Schedules::MediaId)
                            .to(Media::Table, Media::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_schedules_user_date")
                    .table(Schedules::Table)
                    .col(Schedules::UserId)
                    .col(Schedules::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Schedules::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Schedules {
    Table,
    Id,
    UserId,
    MediaId,
    Title,
    Date,
    CreatedAt,
    UpdatedAt,
}
