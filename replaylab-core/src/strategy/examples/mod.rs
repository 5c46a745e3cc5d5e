//! Example strategies

pub mod ma_cross;
pub mod momentum;

pub use ma_cross::MovingAverageCross;
pub use momentum::MomentumStrategy;
