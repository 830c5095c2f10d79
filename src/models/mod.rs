pub mod intent;
pub mod response;
pub mod subscription;
pub mod transaction;

pub use intent::*;
pub use response::*;
pub use subscription::*;
pub use transaction::*;
