pub mod creation;
pub mod envelope;
pub mod user;
