//! Check for tokens that must not appear at all.
//!
//! # Configuration
//!
//! - `tokens`: kinds to report (default: `LITERAL_NATIVE`); any kind is
//!   acceptable

use treewalk_core::{Check, CheckContext, CheckError, CheckMeta, NodeKind, NodeRef};

/// Module name.
pub const NAME: &str = "IllegalToken";

/// Key reported for every illegal node.
pub const MSG_KEY: &str = "illegal.token";

const MESSAGES: &[(&str, &str)] = &[(MSG_KEY, "Using '{0}' is not allowed.")];

/// Reports every node of the configured kinds.
#[derive(Debug, Clone, Default, CheckMeta)]
#[check(name = "IllegalToken", mutability = "stateless")]
pub struct IllegalToken;

impl IllegalToken {
    /// Creates a new check.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Check for IllegalToken {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::LiteralNative]
    }

    fn acceptable_kinds(&self) -> Vec<NodeKind> {
        NodeKind::ALL.to_vec()
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        ctx.log(node, MSG_KEY, &[&node.text()]);
        Ok(())
    }
}
