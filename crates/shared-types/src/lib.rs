pub mod error;
pub mod goal;
pub mod notification;
pub mod user;

pub use error::*;
pub use goal::*;
pub use notification::*;
pub use user::*;
