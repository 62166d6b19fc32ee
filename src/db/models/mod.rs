mod catalog;
mod token;
mod user;

pub use catalog::{slugify, Author, AuthorChoice, Book};
pub use token::Token;
pub use user::{normalize_email, NewUser, User, UserResponse};
