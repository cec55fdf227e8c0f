pub mod enums;
pub mod user;

pub use enums::*;
pub use user::*;
