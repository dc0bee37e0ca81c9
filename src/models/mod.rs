pub mod activity;
pub mod audit;
pub mod billing;
pub mod identity;
pub mod invitation;
pub mod user;
pub mod workspace;
