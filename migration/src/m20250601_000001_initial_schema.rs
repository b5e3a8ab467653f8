use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Enable foreign keys for SQLite
        if manager.get_database_backend() == sea_orm::DatabaseBackend::Sqlite {
            manager
                .get_connection()
                .execute_unprepared("PRAGMA foreign_keys = ON")
                .await?;
        }

        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(
                        ColumnDef::new(Users::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Disabled)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(big_integer(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create info_mats table
        manager
            .create_table(
                Table::create()
                    .table(InfoMats::Table)
                    .if_not_exists()
                    .col(pk_auto(InfoMats::Id))
                    .col(string(InfoMats::Title))
                    .col(string(InfoMats::Authors))
                    .col(string(InfoMats::PublicationYear))
                    .col(string(InfoMats::CoverImage))
                    .col(string(InfoMats::Abstract))
                    .col(string(InfoMats::Matters))
                    .col(string_null(InfoMats::SubMatters))
                    .col(string_null(InfoMats::Availability))
                    .col(string_null(InfoMats::Address))
                    .col(string_null(InfoMats::Summary))
                    .col(string(InfoMats::Tags))
                    .col(string(InfoMats::NumberOfPages))
                    .col(string(InfoMats::Isbn))
                    .col(string(InfoMats::Issn))
                    .col(string(InfoMats::MaterialType))
                    .col(string(InfoMats::Language))
                    .col(string(InfoMats::Publisher))
                    .col(integer(InfoMats::Volume))
                    .col(string(InfoMats::Series))
                    .col(string(InfoMats::Edition))
                    .col(string(InfoMats::ReprintUpdate))
                    .col(
                        ColumnDef::new(InfoMats::NumberOfHits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on info_mats.number_of_hits for the popularity listing
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_info_mats_hits")
                    .table(InfoMats::Table)
                    .col(InfoMats::NumberOfHits)
                    .to_owned(),
            )
            .await?;

        // Create reviews table
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(integer(Reviews::InfoMatId))
                    .col(integer(Reviews::UserId))
                    .col(double(Reviews::Rating))
                    .col(big_integer(Reviews::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_info_mat")
                            .from(Reviews::Table, Reviews::InfoMatId)
                            .to(InfoMats::Table, InfoMats::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_user")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One review per (material, user) pair
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reviews_info_mat_user")
                    .table(Reviews::Table)
                    .col(Reviews::InfoMatId)
                    .col(Reviews::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create info_mat_lists table
        manager
            .create_table(
                Table::create()
                    .table(InfoMatLists::Table)
                    .if_not_exists()
                    .col(pk_auto(InfoMatLists::Id))
                    .col(string(InfoMatLists::Name))
                    .col(integer(InfoMatLists::UserId))
                    .col(
                        ColumnDef::new(InfoMatLists::Public)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(big_integer(InfoMatLists::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_info_mat_lists_user")
                            .from(InfoMatLists::Table, InfoMatLists::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Create info_mat_list_items table
        manager
            .create_table(
                Table::create()
                    .table(InfoMatListItems::Table)
                    .if_not_exists()
                    .col(pk_auto(InfoMatListItems::Id))
                    .col(integer(InfoMatListItems::ListId))
                    .col(integer(InfoMatListItems::InfoMatId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_list_items_list")
                            .from(InfoMatListItems::Table, InfoMatListItems::ListId)
                            .to(InfoMatLists::Table, InfoMatLists::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_list_items_info_mat")
                            .from(InfoMatListItems::Table, InfoMatListItems::InfoMatId)
                            .to(InfoMats::Table, InfoMats::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // A material appears at most once per list
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_list_items_list_info_mat")
                    .table(InfoMatListItems::Table)
                    .col(InfoMatListItems::ListId)
                    .col(InfoMatListItems::InfoMatId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create permission_grants table
        manager
            .create_table(
                Table::create()
                    .table(PermissionGrants::Table)
                    .if_not_exists()
                    .col(pk_auto(PermissionGrants::Id))
                    .col(integer(PermissionGrants::UserId))
                    .col(string(PermissionGrants::Kind))
                    .col(big_integer_null(PermissionGrants::ExpiresAt))
                    .col(
                        ColumnDef::new(PermissionGrants::Revoked)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(big_integer(PermissionGrants::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_permission_grants_user")
                            .from(PermissionGrants::Table, PermissionGrants::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on permission_grants.user_id for effective-set lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_permission_grants_user")
                    .table(PermissionGrants::Table)
                    .col(PermissionGrants::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PermissionGrants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InfoMatListItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InfoMatLists::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InfoMats::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Disabled,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InfoMats {
    Table,
    Id,
    Title,
    Authors,
    PublicationYear,
    CoverImage,
    Abstract,
    Matters,
    SubMatters,
    Availability,
    Address,
    Summary,
    Tags,
    NumberOfPages,
    Isbn,
    Issn,
    MaterialType,
    Language,
    Publisher,
    Volume,
    Series,
    Edition,
    ReprintUpdate,
    NumberOfHits,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    InfoMatId,
    UserId,
    Rating,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InfoMatLists {
    Table,
    Id,
    Name,
    UserId,
    Public,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InfoMatListItems {
    Table,
    Id,
    ListId,
    InfoMatId,
}

#[derive(DeriveIden)]
enum PermissionGrants {
    Table,
    Id,
    UserId,
    Kind,
    ExpiresAt,
    Revoked,
    CreatedAt,
}
