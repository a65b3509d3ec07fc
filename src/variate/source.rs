//! 命名随机流
//!
//! 主种子与流名混合后为每个流播种，流之间互不共享状态。

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::debug;

use super::distribution::Distribution;

pub const DEFAULT_SEED: u64 = 123_456_789;

/// 按名字区分的独立随机流集合。
///
/// 每个流有自己的 `Pcg64` 状态，种子由主种子与流名混合得到；
/// 因此一个流的抽样次数变化不会影响其他流。
#[derive(Debug, Clone)]
pub struct VariateSource {
    seed: u64,
    streams: BTreeMap<String, Pcg64>,
}

impl Default for VariateSource {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl VariateSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            streams: BTreeMap::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 重新播种：所有流回到由 `seed` 决定的初始状态
    pub fn plant_seeds(&mut self, seed: u64) {
        debug!(seed, streams = self.streams.len(), "重新播种随机流");
        self.seed = seed;
        self.streams.clear();
    }

    fn stream(&mut self, name: &str) -> &mut Pcg64 {
        let seed = self.seed;
        self.streams
            .entry(name.to_string())
            .or_insert_with(|| Pcg64::seed_from_u64(stream_seed(seed, name)))
    }

    /// 从指定流按分布抽样（结果非负）
    pub fn draw(&mut self, name: &str, dist: &Distribution) -> f64 {
        dist.sample(self.stream(name))
    }

    /// U[0,1) 抽样
    pub fn uniform(&mut self, name: &str) -> f64 {
        self.stream(name).random::<f64>()
    }
}

fn stream_seed(seed: u64, name: &str) -> u64 {
    // FNV-1a over the stream name, then splitmix64
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in name.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    mix64(seed ^ h)
}

fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
