//! Check for restricted descendants under a node.
//!
//! For every node of a `tokens` kind, counts the descendants whose kinds are
//! listed in `limited_tokens` and reports counts outside the allowed range.
//! The node itself sits at depth 0.
//!
//! # Configuration
//!
//! - `tokens`: kinds to inspect (no default; any kind is acceptable)
//! - `limited_tokens`: kinds to count
//! - `minimum_depth`, `maximum_depth`: depth range counted (default: 0 and unbounded)
//! - `minimum_number`, `maximum_number`: allowed count (default: 0 and unbounded)
//! - `sum_token_counts`: compare the sum over all limited kinds instead of
//!   each kind separately (default: false)
//! - `minimum_message`, `maximum_message`: templates replacing the default
//!   messages
//!
//! ```toml
//! [[walker.modules]]
//! name = "DescendantToken"
//! tokens = ["LITERAL_IF"]
//! limited_tokens = ["SLIST"]
//! maximum_depth = 1
//! minimum_number = 1
//! minimum_message = "'{2}' needs braces."
//! ```

use treewalk_core::{Check, CheckContext, CheckError, CheckMeta, ConfigError, NodeKind, NodeRef, PropertyReader};

/// Module name.
pub const NAME: &str = "DescendantToken";

/// Key reported when one descendant kind occurs too rarely.
pub const MSG_MIN: &str = "descendant.token.min";
/// Key reported when one descendant kind occurs too often.
pub const MSG_MAX: &str = "descendant.token.max";
/// Key reported when the summed count is too low.
pub const MSG_SUM_MIN: &str = "descendant.token.sum.min";
/// Key reported when the summed count is too high.
pub const MSG_SUM_MAX: &str = "descendant.token.sum.max";

const MESSAGES: &[(&str, &str)] = &[
    (MSG_MIN, "Count of {0} for '{2}' descendant '{3}' is less than minimum count {1}."),
    (MSG_MAX, "Count of {0} for '{2}' descendant '{3}' exceeds maximum count {1}."),
    (MSG_SUM_MIN, "Total count of {0} is less than minimum count {1} under '{2}'."),
    (MSG_SUM_MAX, "Total count of {0} exceeds maximum count {1} under '{2}'."),
];

/// Restricts how many descendants of given kinds a node may have.
#[derive(Debug, Clone, CheckMeta)]
#[check(name = "DescendantToken", mutability = "file_stateful")]
pub struct DescendantToken {
    limited: Vec<NodeKind>,
    minimum_depth: usize,
    maximum_depth: usize,
    minimum_number: usize,
    maximum_number: usize,
    sum_token_counts: bool,
    minimum_message: Option<String>,
    maximum_message: Option<String>,
    counts: Vec<usize>,
}

impl Default for DescendantToken {
    fn default() -> Self {
        Self::new()
    }
}

impl DescendantToken {
    /// Creates a new check with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limited: Vec::new(),
            minimum_depth: 0,
            maximum_depth: usize::MAX,
            minimum_number: 0,
            maximum_number: usize::MAX,
            sum_token_counts: false,
            minimum_message: None,
            maximum_message: None,
            counts: vec![0; NodeKind::ALL.len()],
        }
    }

    /// Sets the kinds to count.
    #[must_use]
    pub fn limited_tokens(mut self, kinds: Vec<NodeKind>) -> Self {
        self.limited = kinds;
        self
    }

    /// Sets the allowed count range.
    #[must_use]
    pub fn number_range(mut self, minimum: usize, maximum: usize) -> Self {
        self.minimum_number = minimum;
        self.maximum_number = maximum;
        self
    }

    fn count_descendants(&mut self, node: NodeRef<'_>) {
        self.counts.fill(0);
        let mut stack = vec![(node, 0usize)];
        while let Some((current, depth)) = stack.pop() {
            if depth > self.maximum_depth {
                continue;
            }
            if depth >= self.minimum_depth {
                self.counts[current.kind().index()] += 1;
            }
            stack.extend(current.children().map(|child| (child, depth + 1)));
        }
    }

    fn report(
        &self,
        ctx: &mut CheckContext<'_>,
        node: NodeRef<'_>,
        key: &str,
        custom: Option<&String>,
        args: &[&dyn std::fmt::Display],
    ) {
        match custom {
            Some(template) => ctx.log_with_template(node, key, template, args),
            None => ctx.log(node, key, args),
        }
    }
}

impl Check for DescendantToken {
    fn default_kinds(&self) -> Vec<NodeKind> {
        Vec::new()
    }

    fn acceptable_kinds(&self) -> Vec<NodeKind> {
        NodeKind::ALL.to_vec()
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(kinds) = props.get_kinds("limited_tokens")? {
            self.limited = kinds;
        }
        if let Some(depth) = props.get_usize("minimum_depth")? {
            self.minimum_depth = depth;
        }
        if let Some(depth) = props.get_usize("maximum_depth")? {
            self.maximum_depth = depth;
        }
        if let Some(number) = props.get_usize("minimum_number")? {
            self.minimum_number = number;
        }
        if let Some(number) = props.get_usize("maximum_number")? {
            self.maximum_number = number;
        }
        if let Some(sum) = props.get_bool("sum_token_counts")? {
            self.sum_token_counts = sum;
        }
        self.minimum_message = props.get_str("minimum_message").map(String::from);
        self.maximum_message = props.get_str("maximum_message").map(String::from);
        Ok(())
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        self.count_descendants(node);
        let name = node.kind().name();

        if self.sum_token_counts {
            let total: usize = self.limited.iter().map(|kind| self.counts[kind.index()]).sum();
            if total < self.minimum_number {
                let args: [&dyn std::fmt::Display; 3] = [&total, &self.minimum_number, &name];
                self.report(ctx, node, MSG_SUM_MIN, self.minimum_message.as_ref(), &args);
            }
            if total > self.maximum_number {
                let args: [&dyn std::fmt::Display; 3] = [&total, &self.maximum_number, &name];
                self.report(ctx, node, MSG_SUM_MAX, self.maximum_message.as_ref(), &args);
            }
            return Ok(());
        }

        for kind in &self.limited {
            let count = self.counts[kind.index()];
            let descendant = kind.name();
            if count < self.minimum_number {
                let args: [&dyn std::fmt::Display; 4] = [&count, &self.minimum_number, &name, &descendant];
                self.report(ctx, node, MSG_MIN, self.minimum_message.as_ref(), &args);
            }
            if count > self.maximum_number {
                let args: [&dyn std::fmt::Display; 4] = [&count, &self.maximum_number, &name, &descendant];
                self.report(ctx, node, MSG_MAX, self.maximum_message.as_ref(), &args);
            }
        }
        Ok(())
    }
}
