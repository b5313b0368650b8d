pub mod aggregate;
pub mod csv_export;
pub mod layout;
pub mod pdf;
pub mod receipt;
