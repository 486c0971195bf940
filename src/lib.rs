//! Async client for the idTech4 (Doom 3, Prey, Quake 4, dhewm3) master server protocol.
//!
//! [query::query] sends one `getServers` request and decodes the list of
//! game servers from the reply.
pub mod config;
pub mod error;
pub mod packet;
pub mod parse;
pub mod query;

pub use config::QueryConfig;
pub use error::MasterQueryError;
pub use packet::{ProtocolVariant, ServerEntry};
pub use query::query;
