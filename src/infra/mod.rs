pub mod keys;
pub mod microprediction;
