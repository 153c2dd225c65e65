pub mod auth;
pub mod callbacks;
pub mod donations;
pub mod members;
pub mod root;
