//! Check for boolean expressions with too many operators.
//!
//! # Rationale
//!
//! Long chains of `&&`, `||`, `&`, `|` and `^` are hard to read and to
//! test. Extracting parts into named locals or methods usually helps.
//!
//! # Configuration
//!
//! - `max`: maximum number of boolean operators per expression (default: 3)
//! - `tokens`: any of `LAND`, `BAND`, `LOR`, `BOR`, `BXOR`
//!
//! Only expressions inside methods and constructors are measured, and the
//! body of an `equals(Object)` implementation is exempt. Bitwise operators
//! handed straight to a method call are not counted.

use treewalk_core::{Check, CheckContext, CheckError, CheckMeta, ConfigError, NodeKind, NodeRef, PropertyReader};

/// Module name.
pub const NAME: &str = "BooleanExpressionComplexity";

/// Key reported for a complex expression.
pub const MSG_KEY: &str = "booleanExpressionComplexity";

const MESSAGES: &[(&str, &str)] = &[(MSG_KEY, "Boolean expression complexity is {0} (max allowed is {1}).")];

const DEFAULT_MAX: usize = 3;

const OPERATORS: &[NodeKind] = &[
    NodeKind::Land,
    NodeKind::Band,
    NodeKind::Lor,
    NodeKind::Bor,
    NodeKind::Bxor,
];

#[derive(Debug, Clone, Copy)]
struct Frame {
    checking: bool,
    count: usize,
}

impl Frame {
    fn new(checking: bool) -> Self {
        Self { checking, count: 0 }
    }
}

/// Limits the number of boolean operators in one expression.
#[derive(Debug, Clone, CheckMeta)]
#[check(name = "BooleanExpressionComplexity", mutability = "file_stateful")]
pub struct BooleanExpressionComplexity {
    max: usize,
    current: Frame,
    stack: Vec<Frame>,
}

impl Default for BooleanExpressionComplexity {
    fn default() -> Self {
        Self::new()
    }
}

impl BooleanExpressionComplexity {
    /// Creates a new check with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max: DEFAULT_MAX,
            current: Frame::new(false),
            stack: Vec::new(),
        }
    }

    /// Sets the maximum number of operators.
    #[must_use]
    pub fn max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    fn push(&mut self, frame: Frame) {
        self.stack.push(std::mem::replace(&mut self.current, frame));
    }

    fn pop(&mut self) {
        self.current = self.stack.pop().unwrap_or(Frame::new(false));
    }
}

impl Check for BooleanExpressionComplexity {
    fn default_kinds(&self) -> Vec<NodeKind> {
        let mut kinds = self.required_kinds();
        kinds.extend_from_slice(OPERATORS);
        kinds
    }

    fn required_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::CtorDef, NodeKind::MethodDef, NodeKind::Expr]
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        if let Some(max) = props.get_usize("max")? {
            self.max = max;
        }
        Ok(())
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn begin_tree(&mut self, _ctx: &mut CheckContext<'_>, _root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        self.current = Frame::new(false);
        self.stack.clear();
        Ok(())
    }

    fn visit_node(&mut self, _ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        match node.kind() {
            NodeKind::CtorDef | NodeKind::MethodDef => self.push(Frame::new(!is_equals_method(node))),
            NodeKind::Expr => self.push(Frame::new(self.current.checking)),
            NodeKind::Bor if is_pipe_operator(node) || is_passed_as_argument(node) => {}
            NodeKind::Band | NodeKind::Bxor if is_passed_as_argument(node) => {}
            _ => self.current.count += 1,
        }
        Ok(())
    }

    fn leave_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        match node.kind() {
            NodeKind::CtorDef | NodeKind::MethodDef => self.pop(),
            NodeKind::Expr => {
                let Frame { checking, count } = self.current;
                if checking && count > self.max {
                    let target = node.parent().unwrap_or(node);
                    ctx.log(target, MSG_KEY, &[&count, &self.max]);
                }
                self.pop();
            }
            _ => {}
        }
        Ok(())
    }
}

/// `equals` overrides are allowed long comparison chains.
fn is_equals_method(node: NodeRef<'_>) -> bool {
    node.kind() == NodeKind::MethodDef
        && node.find_first_child(NodeKind::Ident).is_some_and(|id| id.text() == "equals")
        && node
            .find_first_child(NodeKind::Parameters)
            .is_some_and(|params| params.child_count_of(NodeKind::ParameterDef) == 1)
}

/// `|` between catch types.
fn is_pipe_operator(node: NodeRef<'_>) -> bool {
    node.parent().is_some_and(|p| p.kind() == NodeKind::Type)
}

fn is_passed_as_argument(node: NodeRef<'_>) -> bool {
    node.parent()
        .and_then(|p| p.parent())
        .is_some_and(|gp| gp.kind() == NodeKind::Elist)
}
