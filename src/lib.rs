pub mod regen;
pub mod report;
pub mod sampling;
pub mod scenario;
pub mod sim;
pub mod station;
pub mod stats;
pub mod variate;

#[cfg(test)]
mod test;
