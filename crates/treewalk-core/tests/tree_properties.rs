//! Integration test: shape and cache properties of built syntax trees.

use treewalk_core::grammar::{JavaSubsetParser, ParserAdapter};
use treewalk_core::{build_tree, with_comments, NodeId, NodeKind, SyntaxTree};

fn build(source: &str) -> SyntaxTree {
    let parsed = JavaSubsetParser.parse(source).expect("fixture should parse");
    build_tree(&parsed)
}

/// Pre-order node ids, siblings included, without recursion.
fn preorder(tree: &SyntaxTree) -> Vec<(NodeId, usize)> {
    let mut out = Vec::new();
    let mut stack: Vec<(NodeId, usize)> = tree.root().map(|r| (r, 0)).into_iter().collect();
    while let Some((id, depth)) = stack.pop() {
        out.push((id, depth));
        if let Some(next) = tree.next_sibling(id) {
            stack.push((next, depth));
        }
        if let Some(child) = tree.first_child(id) {
            stack.push((child, depth + 1));
        }
    }
    out
}

fn find_all(tree: &SyntaxTree, kind: NodeKind) -> Vec<NodeId> {
    preorder(tree)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| tree.kind(*id) == kind)
        .collect()
}

// --- binary operator flattening ---

#[test]
fn five_thousand_operands_build_a_left_leaning_chain() {
    let operands = vec!["a"; 5_000].join(" + ");
    let tree = build(&format!("class A {{ int x = {operands}; }}"));

    let pluses = find_all(&tree, NodeKind::Plus);
    assert_eq!(pluses.len(), 4_999);

    // the outermost operator is the first one met in pre-order
    let mut spine = 0;
    let mut current = Some(pluses[0]);
    while let Some(op) = current.filter(|id| tree.kind(*id) == NodeKind::Plus) {
        spine += 1;
        assert_eq!(tree.child_count(op), 2);
        let last = tree.last_child(op).expect("operator has a right operand");
        assert_eq!(tree.kind(last), NodeKind::Ident);
        current = tree.first_child(op);
    }
    assert_eq!(spine, 4_999);
    assert!(tree.branch_contains(pluses[0], NodeKind::Ident));
}

#[test]
fn five_thousand_shift_operands_build_on_a_small_stack() {
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(|| {
            let operands = vec!["a"; 5_000].join(" << ");
            let tree = build(&format!("class A {{ int x = {operands}; }}"));
            let shifts = find_all(&tree, NodeKind::Sl);
            assert_eq!(shifts.len(), 4_999);

            let mut spine = 0;
            let mut current = Some(shifts[0]);
            while let Some(op) = current.filter(|id| tree.kind(*id) == NodeKind::Sl) {
                spine += 1;
                assert_eq!(tree.text(op), "<<");
                assert_eq!(tree.child_count(op), 2);
                current = tree.first_child(op);
            }
            spine
        })
        .unwrap();
    assert_eq!(handle.join().unwrap(), 4_999);
}

#[test]
fn mixed_shift_chain_keeps_operator_kinds() {
    let tree = build("class A { int x = a << b >> c >>> d + e; }");
    let bsr = find_all(&tree, NodeKind::Bsr);
    assert_eq!(bsr.len(), 1);

    let sr = tree.first_child(bsr[0]).unwrap();
    assert_eq!(tree.kind(sr), NodeKind::Sr);
    assert_eq!(tree.text(sr), ">>");
    let sl = tree.first_child(sr).unwrap();
    assert_eq!(tree.kind(sl), NodeKind::Sl);
    assert_eq!(tree.kind(tree.last_child(sl).unwrap()), NodeKind::Ident);

    let plus = tree.last_child(bsr[0]).unwrap();
    assert_eq!(tree.kind(plus), NodeKind::Plus);
}

// --- kind-set cache ---

#[test]
fn inserted_kind_is_visible_from_every_ancestor() {
    let mut tree = build("class A {\n  void run() {\n    int x = 1;\n  }\n}");
    let class = find_all(&tree, NodeKind::ClassDef)[0];
    let method = find_all(&tree, NodeKind::MethodDef)[0];
    let body = find_all(&tree, NodeKind::Slist)[0];

    // fill the caches first
    for id in [class, method, body] {
        assert!(!tree.branch_contains(id, NodeKind::LiteralReturn));
        assert!(tree.branch_contains(id, NodeKind::VariableDef));
    }

    let ret = tree.new_node(NodeKind::LiteralReturn, "return", 3, 4);
    tree.add_child(body, ret);

    let ancestors: Vec<NodeId> = tree.ancestors(ret).collect();
    assert!(ancestors.contains(&class));
    for id in ancestors {
        assert!(tree.branch_contains(id, NodeKind::LiteralReturn), "{}", tree.kind(id));
    }
}

// --- comment splicing ---

#[test]
fn comment_tree_without_comments_matches_plain_tree() {
    let source = "// header\npackage a.b;\n\n/** Docs. */\npublic class A {\n  /* block */\n  int x = 1; // trailing\n\n  // before method\n  void run() {\n    int y = x + 2; /* inline */\n  }\n}\n";
    let plain = build(source);
    let augmented = with_comments(&plain);

    let strip = |tree: &SyntaxTree| -> Vec<(NodeKind, String, usize, usize, usize)> {
        let mut skipped_depth: Option<usize> = None;
        let mut out = Vec::new();
        for (id, depth) in preorder(tree) {
            if let Some(d) = skipped_depth {
                if depth > d {
                    continue;
                }
                skipped_depth = None;
            }
            if tree.kind(id).is_comment() {
                skipped_depth = Some(depth);
                continue;
            }
            out.push((tree.kind(id), tree.text(id).to_string(), tree.line(id), tree.column(id), depth));
        }
        out
    };

    assert!(preorder(&augmented).len() > preorder(&plain).len());
    assert_eq!(strip(&augmented), strip(&plain));
    assert!(preorder(&plain).iter().all(|(id, _)| !plain.kind(*id).is_comment()));
}

#[test]
fn comment_tree_is_rebuilt_identically() {
    let source = "class A {\n  // one\n  int x; // two\n}\n";
    let plain = build(source);
    let first: Vec<_> = preorder(&with_comments(&plain))
        .into_iter()
        .map(|(_, depth)| depth)
        .collect();
    let second: Vec<_> = preorder(&with_comments(&plain))
        .into_iter()
        .map(|(_, depth)| depth)
        .collect();
    assert_eq!(first, second);
}
