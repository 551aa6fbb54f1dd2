//! Per-device delivery record and its text-encoded transfer queue.
//!
//! A [`Task`] tracks which presentation is assigned to a device (`new*`), which one the
//! device has accepted (`old*`), and the queue of files still to upload (`left_files`,
//! encoded as [`ResumeToken`] strings).

mod field;
mod token;
mod types;

pub use field::TaskField;
pub use token::ResumeToken;
pub use types::*;
