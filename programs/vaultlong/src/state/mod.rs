pub mod config;
pub mod pending;
pub mod position;
pub mod price_feed;
pub mod protocol;
pub mod tick;

pub use config::*;
pub use pending::*;
pub use position::*;
pub use price_feed::*;
pub use protocol::*;
pub use tick::*;
