pub mod admission;
pub mod session;

pub use admission::AdmissionControl;
pub use session::{OwnerSession, SessionOwner};
