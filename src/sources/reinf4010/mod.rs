pub mod adapter;
pub mod discover;
pub mod parser;
