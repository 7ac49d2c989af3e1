pub mod error;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::*;
pub use traits::*;
pub use types::*;
