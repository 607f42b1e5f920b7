pub mod math;
pub mod tick_math;

pub use math::*;
pub use tick_math::*;
