//! Tree command implementation.

use anyhow::{Context, Result};
use miette::{NamedSource, Report};
use std::path::Path;
use treewalk_core::{build_tree, with_comments, AstPrinter, JavaSubsetParser, ParserAdapter};

/// Prints the syntax tree of `file` and returns the exit code.
pub fn run(file: &Path, comments: bool) -> Result<i32> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    match render(&text, comments) {
        Ok(dump) => {
            print!("{dump}");
            Ok(0)
        }
        Err(report) => {
            let report = report.with_source_code(NamedSource::new(file.display().to_string(), text));
            eprintln!("{report:?}");
            Ok(crate::FATAL_EXIT_CODE)
        }
    }
}

/// Parses `text` and renders its tree, or a diagnostic for the parse failure.
fn render(text: &str, comments: bool) -> Result<String, Report> {
    let parsed = JavaSubsetParser
        .parse(text)
        .map_err(|failure| Report::new(failure.with_source_span(text)))?;
    let tree = build_tree(&parsed);
    let dump = if comments {
        AstPrinter::new().print(&with_comments(&tree))
    } else {
        AstPrinter::new().skip_comments(true).print(&tree)
    };
    Ok(dump)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_plain_and_commented_trees() {
        let source = "// note\nclass A {}\n";
        let plain = render(source, false).unwrap();
        assert!(plain.starts_with("CLASS_DEF"));
        assert!(!plain.contains("SINGLE_LINE_COMMENT"));

        let commented = render(source, true).unwrap();
        assert!(commented.contains("SINGLE_LINE_COMMENT -> // [1:0]"));
        assert!(commented.contains("COMMENT_CONTENT"));
    }

    #[test]
    fn parse_failure_becomes_diagnostic() {
        let report = render("class {", false).unwrap_err();
        assert!(report.to_string().starts_with("1:6"));
    }
}
