use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::group::GroupRef;
use crate::domain::ownership::Owned;

#[derive(Debug, Clone)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub group: Option<GroupRef>,
    pub text: String,
    pub image_key: Option<String>,
    pub created_at: OffsetDateTime,
}

impl Owned for Post {
    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}
