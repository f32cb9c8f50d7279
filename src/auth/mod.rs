//! Credential renewal and session lifecycle.
//!
//! # State Machine (per refresh)
//! ```text
//! Idle ──401, call not yet refreshed──▶ Refreshing (leader holds a RefreshLease)
//! Refreshing ──other 401s──▶ Queued (waiters parked in FIFO order)
//! Refreshing ──lease drained (Ok / Err)──▶ Idle, every waiter resumed with the outcome
//! ```
//!
//! # Design Decisions
//! - One refresh at a time; concurrent 401s share its outcome
//! - The flag and the queue live behind one mutex, never held across an await
//! - A dropped lease drains its waiters, so nobody waits forever
//! - Waiters are woken in FIFO order, and each replay waits for the one
//!   queued before it to reach the transport ([`ReplayTurn`]), so replays
//!   go out in arrival order on any runtime; their responses may not

pub mod coordinator;
pub mod refresh;
pub mod session;

pub use coordinator::{RefreshCoordinator, RefreshLease, RefreshOutcome, ReplayTurn, RefreshTicket, RefreshWaiter};
pub use refresh::{request_access_token, RefreshError};
pub use session::{AuthPayload, AuthSession, CurrentUser, User};
