//! The check contract.

use crate::config::{ConfigError, ModuleConfig, PropertyReader};
use crate::context::{CheckContext, CheckSettings};
use crate::kind::NodeKind;
use crate::tree::NodeRef;
use std::fmt;
use std::str::FromStr;

/// How a check instance may be shared between concurrently processed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// No per-file state. Safe to share, but workers still get their own
    /// instance so hooks never wait on a lock.
    Stateless,
    /// Accumulates per-file state; every worker gets its own instance.
    FileStateful,
    /// Shares state across files on purpose; one locked instance, used as is.
    GlobalStateful,
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stateless => write!(f, "stateless"),
            Self::FileStateful => write!(f, "file_stateful"),
            Self::GlobalStateful => write!(f, "global_stateful"),
        }
    }
}

impl FromStr for Mutability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stateless" => Ok(Self::Stateless),
            "file_stateful" => Ok(Self::FileStateful),
            "global_stateful" => Ok(Self::GlobalStateful),
            other => Err(format!("unknown mutability `{other}`")),
        }
    }
}

/// Identity of a module. Usually derived with `#[derive(CheckMeta)]`.
pub trait CheckMetadata {
    /// Registered module name (e.g. "MethodLength").
    fn name(&self) -> &'static str;

    /// Declared mutability class. `None` is treated as file-stateful.
    fn mutability(&self) -> Option<Mutability> {
        None
    }
}

/// A rule module notified by the walker.
///
/// # Example
///
/// ```ignore
/// use treewalk_core::{Check, CheckContext, CheckError, CheckMeta, NodeKind, NodeRef};
///
/// #[derive(Default, CheckMeta)]
/// #[check(name = "NoReturn", mutability = "stateless")]
/// pub struct NoReturn;
///
/// impl Check for NoReturn {
///     fn default_kinds(&self) -> Vec<NodeKind> {
///         vec![NodeKind::LiteralReturn]
///     }
///
///     fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
///         ctx.log(node, "return.found", &[]);
///         Ok(())
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait Check: CheckMetadata + Send {
    /// Kinds visited when the configuration does not override them.
    fn default_kinds(&self) -> Vec<NodeKind>;

    /// Kinds a configuration may choose from.
    fn acceptable_kinds(&self) -> Vec<NodeKind> {
        self.default_kinds()
    }

    /// Kinds always visited, whatever the configuration says.
    fn required_kinds(&self) -> Vec<NodeKind> {
        Vec::new()
    }

    /// Returns true if the check walks the comment-augmented tree.
    fn requires_comments(&self) -> bool {
        false
    }

    /// Reads check-specific properties.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed values.
    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Message templates keyed by message key.
    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Files or URLs the check reads, hashed into the result cache.
    fn external_resource_locations(&self) -> Vec<String> {
        Vec::new()
    }

    /// Called once after configuration.
    fn init(&mut self) {}

    /// Called once when the run is over.
    fn destroy(&mut self) {}

    /// Called before the walk of each file.
    ///
    /// # Errors
    ///
    /// An error aborts the walk of the file.
    fn begin_tree(&mut self, ctx: &mut CheckContext<'_>, root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        Ok(())
    }

    /// Called on the way down for every node of a registered kind.
    ///
    /// # Errors
    ///
    /// An error aborts the walk of the file.
    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        Ok(())
    }

    /// Called on the way up for every node of a registered kind.
    ///
    /// # Errors
    ///
    /// An error aborts the walk of the file.
    fn leave_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        Ok(())
    }

    /// Called after the walk of each file.
    ///
    /// # Errors
    ///
    /// An error aborts the walk of the file.
    fn finish_tree(&mut self, ctx: &mut CheckContext<'_>, root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        Ok(())
    }
}

/// Type alias for boxed Check trait objects.
pub type CheckBox = Box<dyn Check>;

/// A failure raised by a check while walking a file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("check `{check}` failed: {message}")]
pub struct CheckError {
    /// Name of the failing check.
    pub check: String,
    /// What went wrong.
    pub message: String,
}

impl CheckError {
    /// Creates an error.
    #[must_use]
    pub fn new(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            message: message.into(),
        }
    }
}

/// Applies a module configuration to a check: common properties first, then
/// the check's own, then rejects anything left unread.
///
/// # Errors
///
/// Returns the first configuration problem found.
pub fn configure_check(check: &mut dyn Check, config: &ModuleConfig) -> Result<CheckSettings, ConfigError> {
    let mut reader = PropertyReader::new(config);
    let settings = CheckSettings::read(&mut reader)?;
    check.configure(&mut reader)?;
    reader.finish()?;
    Ok(settings)
}

/// Kinds a configured check is registered for.
///
/// An override must stay within the acceptable kinds; required kinds are
/// always added.
///
/// # Errors
///
/// Returns [`ConfigError::UnacceptableKind`] for an override outside the
/// acceptable set.
pub fn registered_kinds(check: &dyn Check, settings: &CheckSettings) -> Result<Vec<NodeKind>, ConfigError> {
    let mut kinds = match &settings.kinds {
        Some(overridden) => {
            let acceptable = check.acceptable_kinds();
            if let Some(kind) = overridden.iter().find(|k| !acceptable.contains(k)) {
                return Err(ConfigError::UnacceptableKind {
                    module: check.name().to_string(),
                    kind: *kind,
                });
            }
            overridden.clone()
        }
        None => check.default_kinds(),
    };
    kinds.extend(check.required_kinds());
    kinds.sort_unstable();
    kinds.dedup();
    Ok(kinds)
}
