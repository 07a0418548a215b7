//! CLI commands implementation

pub mod ask;
pub mod chat;
pub mod info;
pub mod init;
pub mod models;

pub use ask::*;
pub use chat::*;
pub use info::*;
pub use init::*;
pub use models::*;
