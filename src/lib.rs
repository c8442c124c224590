pub mod benner;
pub mod error;
pub mod event;
pub mod fetch;
pub mod handlers;
pub mod masses;
pub mod outcome;
pub mod store;
