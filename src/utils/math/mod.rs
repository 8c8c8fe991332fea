pub mod distance;
pub mod svd;
