mod filename;
mod noise;
mod patterns;

pub use filename::Parser;
pub use noise::NoiseRule;
