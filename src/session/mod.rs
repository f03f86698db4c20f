//! Call session orchestration
//!
//! The session controller owns the room's signaling channel, the media
//! engine instance, the connection state machine, the membership roster,
//! and the beckon limiter, and drives them from a single control task.

pub mod beckon;
pub mod controller;
pub mod events;
pub mod roster;
pub mod state;

pub use beckon::BeckonLimiter;
pub use controller::SessionController;
pub use events::{CallSnapshot, DismissReason, SessionEvent};
pub use roster::ParticipantRoster;
pub use state::{ConnectionState, ConnectionStateMachine};
