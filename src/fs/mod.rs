//! Filesystem side: directory scanning, the lazy tree model, and the
//! single-file watcher.

pub mod scanner;
pub mod tree;
pub mod watcher;
