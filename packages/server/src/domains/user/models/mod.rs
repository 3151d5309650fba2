pub mod user;

pub use user::{CreateUser, DeleteOutcome, SortDirection, User, UserSort};
