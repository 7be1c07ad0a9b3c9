//! Database entities.

pub mod poll;
pub mod poll_option;
pub mod poll_response;
pub mod poll_response_option;

pub use poll::Entity as Poll;
pub use poll_option::Entity as PollOption;
pub use poll_response::Entity as PollResponse;
pub use poll_response_option::Entity as PollResponseOption;
