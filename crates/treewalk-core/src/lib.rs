//! # treewalk-core
//!
//! Core engine for running style checks over syntax trees.
//!
//! This crate provides the pieces every check and front end builds on:
//!
//! - [`SyntaxTree`] and [`NodeRef`], an arena tree with first-child /
//!   next-sibling links, built from a parse tree by [`build_tree`]
//! - [`Check`], the visitor trait, and [`Walker`], which dispatches nodes to
//!   checks by [`NodeKind`] in an ordinary pass and a comment pass
//! - [`Checker`], which runs a walker over many files on a worker pool, with
//!   a [`ResultCache`], [`Filter`]s and [`AuditListener`]s
//! - [`Violation`] and [`AuditReport`] for the findings
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use treewalk_core::{Checker, Config, ModuleRegistry, Severity};
//!
//! let config = Config::from_file("treewalk.toml")?;
//! let mut checker = Checker::builder()
//!     .factory(Arc::new(ModuleRegistry::with_filters().check("MyCheck", || Box::new(MyCheck::default()))))
//!     .config(config.module_tree())
//!     .threads(4)
//!     .build()?;
//!
//! let report = checker.process(&files)?;
//! println!("{}", report.format_test_report(Severity::Error));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod cache;
mod check;
mod checker;
mod comments;
mod config;
mod contents;
mod context;
mod factory;
mod filter;
mod kind;
mod listener;
mod printer;
mod tree;
mod types;
mod walker;

/// Lexer, parser and parse tree of the supported Java subset.
pub mod grammar;

/// Text helpers shared by checks.
pub mod utils;

pub use builder::build_tree;
pub use cache::{CacheError, FileCache, ResultCache, CONFIG_HASH_KEY, EXTERNAL_RESOURCE_KEY_PREFIX};
pub use check::{configure_check, registered_kinds, Check, CheckBox, CheckError, CheckMetadata, Mutability};
pub use checker::{Checker, CheckerBuilder, CheckerError, FilePanic};
pub use comments::{splice_comments, with_comments};
pub use config::{
    property_text, CheckerSection, Config, ConfigError, ModuleConfig, ModuleEntry, PropertyReader,
    WalkerSection, CHECKER_MODULE, WALKER_MODULE,
};
pub use contents::FileContents;
pub use context::{CheckContext, CheckSettings};
pub use factory::{ModuleFactory, ModuleKind, ModuleRegistry};
pub use filter::{
    configure_file_filter, configure_filter, AuditEvent, ExcludeFiles, FileFilter, FileFilterBox, Filter,
    FilterBox, SeverityMatch, SuppressWithNearbyComment,
};
pub use grammar::{JavaSubsetParser, ParseFailure, ParserAdapter, Token};
pub use kind::{KindSet, NodeKind};
pub use listener::{AuditListener, ListenerBox};
pub use printer::AstPrinter;
pub use tree::{Node, NodeId, NodeRef, Siblings, SyntaxTree};
pub use types::{
    format_message, AuditReport, FileReport, Severity, Violation, GENERAL_EXCEPTION, GENERAL_EXCEPTION_TEMPLATE,
};
pub use walker::{WalkError, Walker, WalkerSettings, DEFAULT_TAB_WIDTH};

/// Derives [`CheckMetadata`] from `#[check(name = "...", mutability = "...")]`.
pub use treewalk_macros::CheckMeta;
