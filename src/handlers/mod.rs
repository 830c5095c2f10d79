pub mod health;
pub mod subscription;

pub use health::*;
pub use subscription::*;
