//! Wire data models exchanged with the remote service server

mod command;
mod envelope;
mod response;
mod selection;

pub use command::*;
pub use envelope::*;
pub use response::*;
pub use selection::*;
