pub mod activity;
pub mod admission;
pub mod channel;
pub mod membership;
pub mod message;
