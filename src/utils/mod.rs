pub mod jwt;
pub mod password;
pub mod tokens;
pub mod validation;
