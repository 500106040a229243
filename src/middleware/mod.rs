pub mod normalize;
pub mod timing;
