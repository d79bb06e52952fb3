//! Entity implementation

/// Entity identifier
///
/// Ids are never reused within one [`World`](super::World), so a stale id simply
/// stops resolving once its entity is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: u32,
}

impl Entity {
    /// Create a new entity with the given ID
    pub(super) fn new(id: u32) -> Self {
        Self { id }
    }

    /// Get the entity ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Index into sparse component arrays
    pub(crate) fn index(self) -> usize {
        self.id as usize
    }

    /// Pack into rigid-body user data
    pub fn to_user_data(self) -> u128 {
        u128::from(self.id)
    }

    /// Recover an entity packed with [`Entity::to_user_data`]
    pub fn from_user_data(data: u128) -> Option<Self> {
        u32::try_from(data).ok().map(Self::new)
    }
}
