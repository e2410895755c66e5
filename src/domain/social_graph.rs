use time::OffsetDateTime;
use uuid::Uuid;

/// Directed edge: `user_id` sees `author_id`'s posts in their follow feed.
#[derive(Debug, Clone)]
pub struct Follow {
    pub user_id: Uuid,
    pub author_id: Uuid,
    pub created_at: OffsetDateTime,
}
