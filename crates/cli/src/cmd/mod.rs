//! CLI command implementations

pub mod cat_file;
pub mod commit;
pub mod config;
pub mod hash_object;
pub mod init;
pub mod log;
pub mod ls_files;
pub mod write_tree;
