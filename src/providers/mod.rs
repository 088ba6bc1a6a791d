pub mod ecb;
pub mod nbp;
