pub mod password;
pub mod principal;
pub mod role;
pub mod service;
pub mod token;
pub mod user;
