mod memory;
mod repo;
mod repo_types;
#[cfg(test)]
pub(crate) mod testing;

pub use memory::InMemoryUserStore;
pub use repo::{PgUserStore, UserStore};
pub use repo_types::{ColorScheme, NewUser, ProfileUpdate, UnknownColorScheme, UserRecord};
