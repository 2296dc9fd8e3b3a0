//! # treewalk
//!
//! Syntax tree checker: parses source files into a tree, walks it once per
//! file, and hands every node to the checks registered for its kind.
//!
//! This is the main facade crate that re-exports the engine, the
//! `CheckMeta` derive and the built-in checks.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use treewalk::{audit, Config};
//!
//! let config = Config::from_file("treewalk.toml".as_ref())?;
//! let report = audit(config, &files)?;
//! for (path, violation) in report.violations() {
//!     println!("{}: {violation}", path.display());
//! }
//! ```
//!
//! ## Writing a Check
//!
//! ```rust,ignore
//! use treewalk::{Check, CheckContext, CheckError, CheckMeta, NodeKind, NodeRef};
//!
//! #[derive(Clone, Default, CheckMeta)]
//! #[check(name = "NoReturn", mutability = "stateless")]
//! pub struct NoReturn;
//!
//! impl Check for NoReturn {
//!     fn default_kinds(&self) -> Vec<NodeKind> {
//!         vec![NodeKind::LiteralReturn]
//!     }
//!
//!     fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
//!         ctx.log(node, "no.return", &[]);
//!         Ok(())
//!     }
//! }
//!
//! let registry = treewalk::checks::standard_registry().check("NoReturn", || Box::new(NoReturn));
//! ```

#![forbid(unsafe_code)]

// Re-export the engine, including the CheckMeta derive
pub use treewalk_core::*;

/// Built-in checks and presets.
pub mod checks {
    pub use treewalk_checks::*;
}

mod runner;

pub use runner::{audit, audit_with};
