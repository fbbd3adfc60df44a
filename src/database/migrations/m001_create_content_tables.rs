use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Category names are deliberately not unique at the storage level.
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string_len(100).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Stories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stories::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Stories::Author).string_len(100))
                    .col(
                        ColumnDef::new(Stories::StoryType)
                            .string_len(10)
                            .not_null()
                            .default("short"),
                    )
                    .col(
                        ColumnDef::new(Stories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Stories::Views).integer().not_null().default(0))
                    .col(ColumnDef::new(Stories::IsHidden).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(Stories::IsCompleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Stories::RatingSum).integer().not_null().default(0))
                    .col(ColumnDef::new(Stories::RatingCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Stories::CategoryId).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stories_category_id")
                            .from(Stories::Table, Stories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StoryCategories::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(StoryCategories::StoryId).integer().not_null())
                    .col(ColumnDef::new(StoryCategories::CategoryId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(StoryCategories::StoryId)
                            .col(StoryCategories::CategoryId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_categories_story_id")
                            .from(StoryCategories::Table, StoryCategories::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_categories_category_id")
                            .from(StoryCategories::Table, StoryCategories::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Parts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Parts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Parts::StoryId).integer().not_null())
                    .col(ColumnDef::new(Parts::PartNumber).integer().not_null())
                    .col(ColumnDef::new(Parts::Content).text().not_null())
                    .col(
                        ColumnDef::new(Parts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_parts_story_id")
                            .from(Parts::Table, Parts::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Part numbering is kept contiguous by the services, so this index is not unique.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_parts_story_part_number")
                    .table(Parts::Table)
                    .col(Parts::StoryId)
                    .col(Parts::PartNumber)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Comments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Comments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Comments::StoryId).integer().not_null())
                    .col(ColumnDef::new(Comments::Url).string_len(1024).not_null())
                    .col(ColumnDef::new(Comments::Name).string_len(100))
                    .col(ColumnDef::new(Comments::Email).string_len(255))
                    .col(ColumnDef::new(Comments::Content).text().not_null())
                    .col(
                        ColumnDef::new(Comments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_story_id")
                            .from(Comments::Table, Comments::StoryId)
                            .to(Stories::Table, Stories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PartVideos::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PartVideos::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PartVideos::PartId).integer().not_null())
                    .col(ColumnDef::new(PartVideos::Url).string_len(1024).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_part_videos_part_id")
                            .from(PartVideos::Table, PartVideos::PartId)
                            .to(Parts::Table, Parts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PartVideos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Parts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(StoryCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    Name,
}

#[derive(Iden)]
enum Stories {
    Table,
    Id,
    Title,
    Author,
    StoryType,
    CreatedAt,
    Views,
    IsHidden,
    IsCompleted,
    RatingSum,
    RatingCount,
    CategoryId,
}

#[derive(Iden)]
enum StoryCategories {
    Table,
    StoryId,
    CategoryId,
}

#[derive(Iden)]
enum Parts {
    Table,
    Id,
    StoryId,
    PartNumber,
    Content,
    CreatedAt,
}

#[derive(Iden)]
enum Comments {
    Table,
    Id,
    StoryId,
    Url,
    Name,
    Email,
    Content,
    CreatedAt,
}

#[derive(Iden)]
enum PartVideos {
    Table,
    Id,
    PartId,
    Url,
}
