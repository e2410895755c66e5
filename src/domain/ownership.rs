use uuid::Uuid;

/// A resource that exactly one user may modify.
pub trait Owned {
    fn owner_id(&self) -> Uuid;

    fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id() == user_id
    }
}
