pub mod format;
pub mod procfs;
