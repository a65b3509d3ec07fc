//! 随机变量源
//!
//! 命名随机流 + 分布描述，供到达过程、服务时间和路由抽样使用。

mod distribution;
mod source;

pub use distribution::{Branch, Distribution};
pub use source::{DEFAULT_SEED, VariateSource};
