//! Game sessions: lifecycle, access rules and the service that persists them

mod machine;
mod service;

pub use machine::{PlayerId, Session, Status, Termination, Winner};
pub use service::GameService;
