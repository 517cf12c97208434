pub mod activity;
pub mod channel;
pub mod message;

pub use activity::*;
pub use channel::*;
pub use message::*;
