pub mod cookies;
pub mod gates;
pub mod jwt;
pub mod middleware;
pub mod password;
