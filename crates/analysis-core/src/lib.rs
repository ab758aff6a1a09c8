pub mod error;
pub mod export;
pub mod normalizer;
pub mod traits;
pub mod types;

pub use error::*;
pub use normalizer::normalize;
pub use traits::*;
pub use types::*;
