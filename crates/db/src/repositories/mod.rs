//! Repository layer for database access.

mod poll;
mod poll_response;

pub use poll::{PollOptionRepository, PollRepository};
pub use poll_response::PollResponseRepository;
