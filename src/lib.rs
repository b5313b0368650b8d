pub mod codes;
pub mod error;
pub mod report;
pub mod runtime;
pub mod sources;
pub mod types;
pub mod xml_tree;
