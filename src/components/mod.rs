pub mod file_table;
pub mod preview;
pub mod resize;
