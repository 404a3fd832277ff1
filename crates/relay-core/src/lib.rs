pub mod errors;
pub mod messages;
pub mod provider;
pub mod security;
