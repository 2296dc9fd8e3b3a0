//! # treewalk-checks
//!
//! Built-in checks for treewalk.
//!
//! ## Available Checks
//!
//! | Name | Mutability | Description |
//! |------|------------|-------------|
//! | `BooleanExpressionComplexity` | file-stateful | Limits boolean operators per expression |
//! | `DescendantToken` | file-stateful | Limits descendants of given kinds under a node |
//! | `EmptyBlock` | stateless | Forbids empty blocks |
//! | `IllegalToken` | stateless | Forbids nodes of given kinds |
//! | `MethodCount` | file-stateful | Limits methods per type declaration |
//! | `MethodLength` | stateless | Limits method body length |
//! | `TodoComment` | stateless | Reports to-do markers in comments |
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use treewalk_checks::standard_registry;
//! use treewalk_core::{Checker, ModuleConfig, CHECKER_MODULE, WALKER_MODULE};
//!
//! let config = ModuleConfig::new(CHECKER_MODULE).with_child(
//!     ModuleConfig::new(WALKER_MODULE)
//!         .with_child(ModuleConfig::new("MethodLength").with_property("max", "40")),
//! );
//! let mut checker = Checker::builder()
//!     .factory(Arc::new(standard_registry()))
//!     .config(config)
//!     .build()?;
//! let report = checker.process(&files)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod boolean_expression_complexity;
pub mod descendant_token;
pub mod empty_block;
pub mod illegal_token;
pub mod method_count;
pub mod method_length;
mod presets;
pub mod todo_comment;

pub use boolean_expression_complexity::BooleanExpressionComplexity;
pub use descendant_token::DescendantToken;
pub use empty_block::{BlockOption, EmptyBlock};
pub use illegal_token::IllegalToken;
pub use method_count::MethodCount;
pub use method_length::MethodLength;
pub use presets::{apply_preset, default_modules, minimal_modules, Preset};
pub use todo_comment::TodoComment;

use treewalk_core::ModuleRegistry;

/// Re-export core types for convenience.
pub use treewalk_core::{Check, Severity, Violation};

/// Returns a registry with the core filters and every built-in check.
#[must_use]
pub fn standard_registry() -> ModuleRegistry {
    ModuleRegistry::with_filters()
        .check(boolean_expression_complexity::NAME, || {
            Box::new(BooleanExpressionComplexity::new())
        })
        .check(descendant_token::NAME, || Box::new(DescendantToken::new()))
        .check(empty_block::NAME, || Box::new(EmptyBlock::new()))
        .check(illegal_token::NAME, || Box::new(IllegalToken::new()))
        .check(method_count::NAME, || Box::new(MethodCount::new()))
        .check(method_length::NAME, || Box::new(MethodLength::new()))
        .check(todo_comment::NAME, || Box::new(TodoComment::new()))
}
