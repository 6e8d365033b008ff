//! Apply one function to many independent pieces on a bounded worker pool,
//! stopping early through a shared [`CancelToken`] and surfacing the first
//! failure through an [`ErrorSlot`].
//!
//! ```
//! use parallelize::{parallel, CancelToken, ErrorSlot, Options};
//!
//! let token = CancelToken::new();
//! let slot: ErrorSlot = ErrorSlot::new();
//! parallel::until(Some(&token), 100, |piece| {
//!     if piece == 42 {
//!         slot.send_and_cancel(anyhow::anyhow!("bad piece {}", piece), || token.cancel());
//!     }
//! }, Options::default().with_parallelism(4));
//! assert!(slot.receive().is_some());
//! ```

pub mod cancel;
pub mod error_slot;
pub mod parallel;
pub mod progress;
pub mod scenarios;

pub use cancel::{CancelReason, CancelToken};
pub use error_slot::ErrorSlot;
pub use parallel::{until, Options, Plan};
