//! State management module.
//!
//! Identifiers, the derived ownership index and the managers that mutate
//! persisted state.

pub mod ids;
pub mod index;
pub mod managers;

pub use ids::{ChannelId, ChannelKind, GuildId, Invoker, Member, Permissions, UserId};
pub use index::OwnershipIndex;
pub use managers::{Created, LangScope, LifecycleManager, Limits};
