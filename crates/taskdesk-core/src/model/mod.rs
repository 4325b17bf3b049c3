//! Typed views of the remote records taskdesk reads.
//!
//! Odoo encodes "unset" as `false` for every field type and relations as an
//! `[id, display_name]` pair; the deserializers in [`relation`] and [`text`]
//! normalize both into `Option`.

pub mod relation;
pub mod stage;
pub mod text;
pub mod ticket;
pub mod user;

pub use relation::{RecordId, Relation};
pub use stage::Stage;
pub use ticket::Ticket;
pub use user::User;
