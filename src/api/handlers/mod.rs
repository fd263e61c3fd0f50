//! API request handlers.

pub mod books;
pub mod pages;
pub mod status;
pub mod webviews;
