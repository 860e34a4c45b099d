pub mod payload;
pub mod session;

pub use session::{SessionController, SessionEvent, SessionPhase, SessionSnapshot};
