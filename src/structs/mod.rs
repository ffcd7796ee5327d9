pub mod file_entry;
pub mod file_type;
pub mod job;
pub mod settings;
pub mod update;
