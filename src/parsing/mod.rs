pub mod csv_input;
pub mod filesystem;
