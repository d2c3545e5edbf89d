//! In-memory storage backend.
//!
//! Stands in for the SQL collaborator in tests and single-binary
//! deployments. Lookup counters are exposed so tests can assert which
//! paths actually reached persistence.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::post::Post;
use crate::role::Role;
use crate::storage::{PostStore, RoleStore, StorageError, UserStore};
use crate::user::User;

/// DashMap-backed implementation of all storage traits.
#[derive(Default)]
pub struct MemoryStorage {
    users: DashMap<i64, User>,
    roles: DashMap<String, Role>,
    posts: DashMap<i64, Post>,
    user_lookups: AtomicU64,
}

impl MemoryStorage {
    /// Creates an empty storage with no reference data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage seeded with the standard role ladder
    /// (user=1, moderator=2, admin=3).
    #[must_use]
    pub fn with_default_roles() -> Self {
        let storage = Self::new();
        storage.insert_role(Role::new("user", 1).with_description("can create posts and comments"));
        storage.insert_role(
            Role::new("moderator", 2).with_description("can update other users' posts"),
        );
        storage.insert_role(Role::new("admin", 3).with_description("full access"));
        storage
    }

    /// Inserts or replaces a user.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Inserts or replaces a role.
    pub fn insert_role(&self, role: Role) {
        self.roles.insert(role.name.clone(), role);
    }

    /// Inserts or replaces a post.
    pub fn insert_post(&self, post: Post) {
        self.posts.insert(post.id, post);
    }

    /// Number of user lookups (by id or email) that reached this backend.
    #[must_use]
    pub fn user_lookup_count(&self) -> u64 {
        self.user_lookups.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn get_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        self.user_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        self.user_lookups.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .users
            .iter()
            .find(|u| u.email == email)
            .map(|u| u.value().clone()))
    }

    async fn update(&self, user: &User) -> Result<(), StorageError> {
        self.users.insert(user.id, user.clone());
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStorage {
    async fn get_by_name(&self, name: &str) -> Result<Option<Role>, StorageError> {
        Ok(self.roles.get(name).map(|r| r.value().clone()))
    }
}

#[async_trait]
impl PostStore for MemoryStorage {
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>, StorageError> {
        Ok(self.posts.get(&id).map(|p| p.value().clone()))
    }

    async fn update(&self, post: &Post) -> Result<(), StorageError> {
        self.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        Ok(self.posts.remove(&id).is_some())
    }
}
