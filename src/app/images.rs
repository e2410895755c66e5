use anyhow::Result;
use uuid::Uuid;

use crate::app::forms::ValidImage;
use crate::infra::storage::ObjectStorage;

const POST_IMAGE_PREFIX: &str = "posts";

#[derive(Clone)]
pub struct ImageService {
    storage: ObjectStorage,
}

impl ImageService {
    pub fn new(storage: ObjectStorage) -> Self {
        Self { storage }
    }

    /// Uploads a post image under a fresh key and returns that key.
    pub async fn store_post_image(&self, image: &ValidImage) -> Result<String> {
        let key = post_image_key(Uuid::new_v4(), image.extension);
        self.storage
            .put_object(&key, image.bytes.clone(), image.content_type)
            .await?;
        tracing::debug!(key = %key, bucket = %self.storage.bucket(), "stored post image");
        Ok(key)
    }

    /// Failures are logged and leave the object in place.
    pub async fn discard(&self, key: &str) {
        if let Err(err) = self.storage.delete_object(key).await {
            tracing::warn!(error = ?err, key = %key, "failed to delete post image");
        }
    }
}

/// The image no post refers to once a write settles: the previous image after a
/// successful write that changed it, or the freshly stored one after a failed one.
pub fn unreferenced_image<'a>(
    previous: Option<&'a str>,
    current: Option<&'a str>,
    saved: bool,
) -> Option<&'a str> {
    let (orphan, kept) = if saved {
        (previous, current)
    } else {
        (current, previous)
    };
    orphan.filter(|key| Some(*key) != kept)
}

pub fn post_image_key(id: Uuid, extension: &str) -> String {
    format!("{}/{}.{}", POST_IMAGE_PREFIX, id, extension)
}
