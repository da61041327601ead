use realm_world::Entity;

/// Identifies one connected user for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserKey(u64);

impl UserKey {
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

/// One connected player account: which shard hosts them and which entity
/// is their avatar.
pub struct User {
    pub key: UserKey,
    pub shard: usize,
    pub avatar: Option<Entity>,
}

impl User {
    pub fn new(key: UserKey, shard: usize) -> Self {
        Self {
            key,
            shard,
            avatar: None,
        }
    }
}
