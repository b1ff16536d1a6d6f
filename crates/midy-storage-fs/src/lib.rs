//! Filesystem parser for the Midy content tree.
//!
//! This crate turns directories into index rows:
//!
//! - [`Parser`] lists one directory, interprets each file and writes the folder
//!   through a [`Repository`](midy_cache::Repository)
//! - Numeric name prefixes (`01_intro.md`, `2024-01-15_post.md`) become sort
//!   keys and are stripped from logical names
//! - Built-in interpreters read YAML frontmatter from markdown, a leading
//!   comment from templates, and register static assets as hidden routes
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use midy_cache::SqliteRepository;
//! use midy_storage::{LogicalPath, MountTable, PhysicalPath};
//! use midy_storage_fs::{Parser, default_registry};
//!
//! let repository = Arc::new(SqliteRepository::in_memory()?);
//! let parser = Parser::new(repository, default_registry());
//! let root = PhysicalPath::new("content");
//! parser.parse_folder(&root, &LogicalPath::root(), &MountTable::new(root.clone()))?;
//! ```

mod interpreters;
mod parser;
mod scanner;
mod yaml;

pub use interpreters::{
    AssetInterpreter, MarkdownInterpreter, TemplateInterpreter, default_registry,
};
pub use parser::Parser;
