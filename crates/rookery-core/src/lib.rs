pub mod error;
pub mod memory;
pub mod post;
pub mod role;
pub mod storage;
pub mod user;

pub use error::{ApiError, Result};
pub use memory::MemoryStorage;
pub use post::Post;
pub use role::Role;
pub use storage::{PostStore, RoleStore, StorageError, UserStore};
pub use user::User;
