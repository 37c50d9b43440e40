pub mod breakout_retest;
pub mod signals;

pub use breakout_retest::BreakoutRetestStrategy;
pub use signals::Signal;
