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
                    .table(UserMedia::Table)
                    .if_not_exists()
                    .col(pk_auto(UserMedia::Id))
                    .col(integer(UserMedia::UserId))
                    .col(integer(UserMedia::MediaId))
                    .col(small_integer(UserMedia::Status).default(1))
                    .col(big_integer_null(UserMedia::ReminderAt))
                    .col(small_integer_null(UserMedia::NotificationType))
                    .col(big_integer(UserMedia::CreatedAt))
                    .col(big_integer(UserMedia::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_media_user")
                            .from(UserMedia::Table, UserMedia::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_media_media")
                            .from(UserMedia::Table, UserMedia::MediaId)
                            .to(Media::Table, Media::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_media_unique")
                    .table(UserMedia::Table)
                    .col(UserMedia::UserId)
                    .col(UserMedia::MediaId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_media_reminder_at")
                    .table(UserMedia::Table)
                    .col(UserMedia::ReminderAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(integer(Reviews::UserId))
                    .col(integer(Reviews::MediaId))
                    .col(small_integer(Reviews::Rating))
                    .col(text_null(Reviews::Comment))
                    .col(big_integer(Reviews::CreatedAt))
                    .col(big_integer(Reviews::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_user")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_media")
                            .from(Reviews::Table, Reviews::MediaId)
                            .to(Media::Table, Media::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_media_id")
                    .table(Reviews::Table)
                    .col(Reviews::MediaId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Reviews::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(UserMedia::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum UserMedia {
    Table,
    Id,
    UserId,
    MediaId,
    Status,
    ReminderAt,
    NotificationType,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    UserId,
    MediaId,
    Rating,
    Comment,
    CreatedAt,
    UpdatedAt,
}
