//! 输出统计：在线累加器与置信区间

mod accumulator;
mod confidence;

pub use accumulator::Accumulator;
pub use confidence::{ConfidenceInterval, normal_quantile, student_t_quantile};
