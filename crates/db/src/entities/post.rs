//! Post entity.
//!
//! A post with `repost_of_id` set is a repost wrapper: it carries no content
//! of its own and points at the original. Wrappers nest at most one level;
//! reposting a wrapper targets its original instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Optional title
    #[sea_orm(nullable)]
    pub title: Option<String>,

    /// Post text content
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    /// Author user ID
    #[sea_orm(indexed)]
    pub author_id: String,

    /// Original post ID when this row is a repost wrapper
    #[sea_orm(nullable, indexed)]
    pub repost_of_id: Option<String>,

    /// Like count (denormalized; kept in sync with the like table by
    /// atomic increment/decrement, never recomputed on read)
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Comment count (denormalized)
    #[sea_orm(default_value = 0)]
    pub comment_count: i32,

    /// Repost count (denormalized)
    #[sea_orm(default_value = 0)]
    pub repost_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id"
    )]
    Author,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::RepostOfId",
        to = "Column::Id"
    )]
    RepostOf,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::like::Entity")]
    Likes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
