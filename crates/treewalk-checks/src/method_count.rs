//! Check for type declarations with too many methods.
//!
//! # Configuration
//!
//! - `max_total`: maximum number of methods (default: 100)
//! - `max_public`, `max_protected`, `max_package`, `max_private`: maximum
//!   per access level (default: 100 each)
//! - `tokens`: `CLASS_DEF`, `INTERFACE_DEF`; `METHOD_DEF` is always visited
//!
//! Methods of nested types count toward the nested type only. Interface
//! methods without an access modifier are public.

use treewalk_core::{
    Check, CheckContext, CheckError, CheckMeta, ConfigError, NodeId, NodeKind, NodeRef, PropertyReader,
};

/// Module name.
pub const NAME: &str = "MethodCount";

/// Key reported for too many private methods.
pub const MSG_PRIVATE_METHODS: &str = "too.many.privateMethods";
/// Key reported for too many package-private methods.
pub const MSG_PACKAGE_METHODS: &str = "too.many.packageMethods";
/// Key reported for too many protected methods.
pub const MSG_PROTECTED_METHODS: &str = "too.many.protectedMethods";
/// Key reported for too many public methods.
pub const MSG_PUBLIC_METHODS: &str = "too.many.publicMethods";
/// Key reported for too many methods overall.
pub const MSG_MANY_METHODS: &str = "too.many.methods";

const MESSAGES: &[(&str, &str)] = &[
    (MSG_PRIVATE_METHODS, "Number of private methods is {0} (max allowed is {1})."),
    (MSG_PACKAGE_METHODS, "Number of package methods is {0} (max allowed is {1})."),
    (MSG_PROTECTED_METHODS, "Number of protected methods is {0} (max allowed is {1})."),
    (MSG_PUBLIC_METHODS, "Number of public methods is {0} (max allowed is {1})."),
    (MSG_MANY_METHODS, "Total number of methods is {0} (max allowed is {1})."),
];

const DEFAULT_MAX_METHODS: usize = 100;

/// Access level of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Public,
    Protected,
    Package,
    Private,
}

/// Methods counted for one type declaration.
#[derive(Debug, Clone)]
struct MethodCounter {
    definition: NodeId,
    in_interface: bool,
    public: usize,
    protected: usize,
    package: usize,
    private: usize,
}

impl MethodCounter {
    fn new(definition: NodeRef<'_>) -> Self {
        Self {
            definition: definition.id(),
            in_interface: definition.kind() == NodeKind::InterfaceDef,
            public: 0,
            protected: 0,
            package: 0,
            private: 0,
        }
    }

    fn increment(&mut self, scope: Scope) {
        match scope {
            Scope::Public => self.public += 1,
            Scope::Protected => self.protected += 1,
            Scope::Package => self.package += 1,
            Scope::Private => self.private += 1,
        }
    }

    fn total(&self) -> usize {
        self.public + self.protected + self.package + self.private
    }
}

/// Limits the number of methods per type declaration.
#[derive(Debug, Clone, CheckMeta)]
#[check(name = "MethodCount", mutability = "file_stateful")]
pub struct MethodCount {
    max_total: usize,
    max_public: usize,
    max_protected: usize,
    max_package: usize,
    max_private: usize,
    counters: Vec<MethodCounter>,
}

impl Default for MethodCount {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodCount {
    /// Creates a new check with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_total: DEFAULT_MAX_METHODS,
            max_public: DEFAULT_MAX_METHODS,
            max_protected: DEFAULT_MAX_METHODS,
            max_package: DEFAULT_MAX_METHODS,
            max_private: DEFAULT_MAX_METHODS,
            counters: Vec::new(),
        }
    }

    /// Sets the maximum number of methods.
    #[must_use]
    pub fn max_total(mut self, max: usize) -> Self {
        self.max_total = max;
        self
    }

    fn check_counter(&self, ctx: &mut CheckContext<'_>, counter: &MethodCounter, node: NodeRef<'_>) {
        let limits = [
            (self.max_private, counter.private, MSG_PRIVATE_METHODS),
            (self.max_package, counter.package, MSG_PACKAGE_METHODS),
            (self.max_protected, counter.protected, MSG_PROTECTED_METHODS),
            (self.max_public, counter.public, MSG_PUBLIC_METHODS),
            (self.max_total, counter.total(), MSG_MANY_METHODS),
        ];
        for (max, value, key) in limits {
            if value > max {
                ctx.log(node, key, &[&value, &max]);
            }
        }
    }
}

impl Check for MethodCount {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::ClassDef, NodeKind::InterfaceDef, NodeKind::MethodDef]
    }

    fn required_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::MethodDef]
    }

    fn configure(&mut self, props: &mut PropertyReader<'_>) -> Result<(), ConfigError> {
        for (key, slot) in [
            ("max_total", &mut self.max_total),
            ("max_public", &mut self.max_public),
            ("max_protected", &mut self.max_protected),
            ("max_package", &mut self.max_package),
            ("max_private", &mut self.max_private),
        ] {
            if let Some(value) = props.get_usize(key)? {
                *slot = value;
            }
        }
        Ok(())
    }

    fn messages(&self) -> &'static [(&'static str, &'static str)] {
        MESSAGES
    }

    fn begin_tree(&mut self, _ctx: &mut CheckContext<'_>, _root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        self.counters.clear();
        Ok(())
    }

    fn visit_node(&mut self, _ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        if node.kind() != NodeKind::MethodDef {
            self.counters.push(MethodCounter::new(node));
            return Ok(());
        }
        let owner = node.parent().and_then(|block| block.parent()).map(|def| def.id());
        if let Some(counter) = self.counters.last_mut().filter(|c| Some(c.definition) == owner) {
            let scope = method_scope(node, counter.in_interface);
            counter.increment(scope);
        }
        Ok(())
    }

    fn leave_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        if node.kind() == NodeKind::MethodDef {
            return Ok(());
        }
        if let Some(counter) = self.counters.pop() {
            self.check_counter(ctx, &counter, node);
        }
        Ok(())
    }
}

fn method_scope(method: NodeRef<'_>, in_interface: bool) -> Scope {
    let modifiers = method.find_first_child(NodeKind::Modifiers);
    let has = |kind| modifiers.is_some_and(|m| m.find_first_child(kind).is_some());
    if has(NodeKind::LiteralPublic) {
        Scope::Public
    } else if has(NodeKind::LiteralProtected) {
        Scope::Protected
    } else if has(NodeKind::LiteralPrivate) {
        Scope::Private
    } else if in_interface {
        Scope::Public
    } else {
        Scope::Package
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::check_code;
    use treewalk_core::ModuleConfig;

    const SOURCE: &str = "\
class Outer {
  public void a() { }
  public void b() { }
  void c() { }
  private void d() { }
  class Inner {
    protected void e() { }
    void f() { }
  }
}
interface Api {
  void g();
  void h();
}
";

    #[test]
    fn test_counts_per_scope() {
        let violations = check_code(
            ModuleConfig::new(NAME)
                .with_property("max_public", "1")
                .with_property("max_total", "3"),
            SOURCE,
        );
        let found: Vec<(usize, &str, &str)> = violations
            .iter()
            .map(|v| (v.line, v.key.as_str(), v.args[0].as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (1, MSG_MANY_METHODS, "4"),
                (1, MSG_PUBLIC_METHODS, "2"),
                (11, MSG_PUBLIC_METHODS, "2"),
            ]
        );
    }

    #[test]
    fn test_nested_types_count_separately() {
        let violations = check_code(ModuleConfig::new(NAME).with_property("max_package", "1"), SOURCE);
        assert!(violations.is_empty(), "{violations:?}");

        let violations = check_code(ModuleConfig::new(NAME).with_property("max_protected", "0"), SOURCE);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 6);
        assert_eq!(violations[0].message, "Number of protected methods is 1 (max allowed is 0).");
    }

    #[test]
    fn test_state_is_reset_between_files() {
        let config = ModuleConfig::new(NAME).with_property("max_total", "1");
        let first = check_code(config.clone(), "class A {\n  void a() { }\n  void b() { }\n}\n");
        let second = check_code(config, "class B {\n  void a() { }\n}\n");
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
