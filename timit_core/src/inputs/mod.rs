pub mod htk;
pub mod htk_config;
pub mod normalize;
