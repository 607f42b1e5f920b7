pub mod close_position;
pub mod deposit;
pub mod host;
pub mod initialize;
pub mod liquidate;
pub mod open_position;
pub mod publish_price;
pub mod user_action;
pub mod withdrawal;

pub use close_position::*;
pub use deposit::*;
pub use host::*;
pub use initialize::*;
pub use liquidate::*;
pub use open_position::*;
pub use publish_price::*;
pub use user_action::*;
pub use withdrawal::*;
