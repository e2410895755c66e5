use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::app::pagination::{Page, PageRequest, POSTS_PER_PAGE};
use crate::domain::group::GroupRef;
use crate::domain::post::Post;
use crate::infra::db::Db;

const POST_SELECT: &str = "SELECT p.id, p.author_id, u.username AS author_username, \
            p.group_id, g.slug AS group_slug, g.title AS group_title, \
            p.text, p.image_key, p.created_at \
     FROM posts p \
     JOIN users u ON u.id = p.author_id \
     LEFT JOIN post_groups g ON g.id = p.group_id";

/// Which posts a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

impl PostFilter {
    fn where_clause(&self) -> (&'static str, Option<Uuid>) {
        match *self {
            Self::All => ("", None),
            Self::Group(id) => ("WHERE p.group_id = $1", Some(id)),
            Self::Author(id) => ("WHERE p.author_id = $1", Some(id)),
            Self::FollowedBy(id) => (
                "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = $1)",
                Some(id),
            ),
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_post(
        &self,
        author_id: Uuid,
        text: String,
        group_id: Option<Uuid>,
        image_key: Option<String>,
    ) -> Result<Post> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (author_id, group_id, text, image_key) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(author_id)
        .bind(group_id)
        .bind(text)
        .bind(image_key)
        .fetch_one(self.db.pool())
        .await?;

        self.get_post(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("post {} vanished after insert", id))
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        Ok(row.as_ref().map(post_from_row))
    }

    /// Rewrites an existing post. `author_id` becomes the post's author; the
    /// caller has already checked ownership.
    pub async fn update_post(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: String,
        group_id: Option<Uuid>,
        image_key: Option<String>,
    ) -> Result<Option<Post>> {
        let updated = sqlx::query(
            "UPDATE posts \
             SET author_id = $2, text = $3, group_id = $4, image_key = $5 \
             WHERE id = $1",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(group_id)
        .bind(image_key)
        .execute(self.db.pool())
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_post(post_id).await
    }

    /// Comments go with the post through `ON DELETE CASCADE`.
    pub async fn delete_post(&self, post_id: Uuid, author_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1 AND author_id = $2")
            .bind(post_id)
            .bind(author_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_author(&self, author_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// One page of a feed, newest first.
    pub async fn list(&self, filter: PostFilter, request: PageRequest) -> Result<Page<Post>> {
        let (clause, arg) = filter.where_clause();

        let count_sql = format!("SELECT COUNT(*) FROM posts p {}", clause);
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(arg) = arg {
            count_query = count_query.bind(arg);
        }
        let total_count = count_query.fetch_one(self.db.pool()).await?;

        let window = request.resolve(total_count, POSTS_PER_PAGE);
        let first_paging_param = if arg.is_some() { 2 } else { 1 };
        let list_sql = format!(
            "{} {} ORDER BY p.created_at DESC, p.id DESC LIMIT ${} OFFSET ${}",
            POST_SELECT,
            clause,
            first_paging_param,
            first_paging_param + 1,
        );
        let mut list_query = sqlx::query(&list_sql);
        if let Some(arg) = arg {
            list_query = list_query.bind(arg);
        }
        let rows = list_query
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(self.db.pool())
            .await?;

        let posts = rows.iter().map(post_from_row).collect();
        Ok(Page::new(posts, window, total_count))
    }
}

fn post_from_row(row: &PgRow) -> Post {
    let group_id: Option<Uuid> = row.get("group_id");
    let group = match (group_id, row.get::<Option<String>, _>("group_slug")) {
        (Some(id), Some(slug)) => Some(GroupRef {
            id,
            slug,
            title: row.get::<Option<String>, _>("group_title").unwrap_or_default(),
        }),
        _ => None,
    };

    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: row.get("author_username"),
        group,
        text: row.get("text"),
        image_key: row.get("image_key"),
        created_at: row.get("created_at"),
    }
}
