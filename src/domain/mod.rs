pub mod donation;
pub mod member;
pub mod payment;
pub mod session;
pub mod user;

pub use donation::*;
pub use member::*;
pub use payment::*;
pub use session::*;
pub use user::*;
