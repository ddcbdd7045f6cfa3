//! Indentation-boundary scanner
//!
//! A unit starts at a line beginning with its keyword at the expected
//! indentation (`def ` for functions, `class ` for classes) and runs until the
//! first non-blank line that carries a word character and is not indented
//! past the declaration. Methods are found by running the same scanner over a
//! class's own text one level deeper.
//!
//! Decorators and comments sitting directly above a declaration are not part
//! of the captured unit.

use super::{FileBreakdown, SourceUnit, UnitKind, UnitMap};

/// Columns per indentation level; a tab counts as one level
pub const INDENT_WIDTH: usize = 4;

const FUNCTION_KEYWORD: &str = "def";
const CLASS_KEYWORD: &str = "class";

/// Scanner state, advanced one line at a time
enum ScanState<'a> {
    Outside,
    InUnit { name: String, buffer: Vec<&'a str> },
}

/// A captured span before it is typed as a unit
struct Span {
    name: String,
    text: String,
}

impl Span {
    fn from_buffer(name: String, buffer: &[&str]) -> Self {
        let end = buffer
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .map_or(0, |last| last + 1);

        Self {
            name,
            text: buffer[..end].join("\n"),
        }
    }
}

/// Extract functions declared at `indent_level`
///
/// Level 0 yields top-level functions; deeper levels yield methods.
pub fn extract_functions(lines: &[&str], indent_level: usize) -> UnitMap {
    let kind = if indent_level == 0 {
        UnitKind::Function
    } else {
        UnitKind::Method
    };

    let mut units = UnitMap::default();
    for span in scan(lines, FUNCTION_KEYWORD, indent_level) {
        units.insert(SourceUnit::new(&span.name, kind, &span.text));
    }
    units
}

/// Extract top-level classes together with their methods
pub fn extract_classes(lines: &[&str]) -> UnitMap {
    let mut units = UnitMap::default();
    for span in scan(lines, CLASS_KEYWORD, 0) {
        let class_lines: Vec<&str> = span.text.lines().collect();
        let methods = extract_functions(&class_lines, 1);
        units.insert(SourceUnit::new(&span.name, UnitKind::Class, &span.text).with_methods(methods));
    }
    units
}

/// Decompose a whole source file
pub fn breakdown_source(path: &str, source: &str) -> FileBreakdown {
    let lines: Vec<&str> = source.lines().collect();

    FileBreakdown {
        path: path.to_string(),
        functions: extract_functions(&lines, 0),
        classes: extract_classes(&lines),
    }
}

/// Run the boundary state machine for one keyword at one indentation level
fn scan(lines: &[&str], keyword: &str, indent_level: usize) -> Vec<Span> {
    let declaration_width = indent_level * INDENT_WIDTH;
    let prefix = format!("{} ", keyword);

    let mut spans = Vec::new();
    let mut state = ScanState::Outside;

    for &line in lines {
        if let ScanState::InUnit { buffer, .. } = &mut state {
            if !closes_unit(line, declaration_width) {
                buffer.push(line);
                continue;
            }
        }

        // Either outside any unit, or this line closes the open one and must
        // be looked at again as a possible declaration.
        if let ScanState::InUnit { name, buffer } = std::mem::replace(&mut state, ScanState::Outside) {
            spans.push(Span::from_buffer(name, &buffer));
        }

        let declared = (indent_width(line) == declaration_width)
            .then(|| line.trim_start().strip_prefix(&prefix))
            .flatten();
        if let Some(rest) = declared {
            state = ScanState::InUnit {
                name: declared_name(rest),
                buffer: vec![line],
            };
        }
    }

    if let ScanState::InUnit { name, buffer } = state {
        spans.push(Span::from_buffer(name, &buffer));
    }

    spans
}

/// Whether `line` ends a unit declared at `declaration_width`
fn closes_unit(line: &str, declaration_width: usize) -> bool {
    !line.trim().is_empty()
        && line.chars().any(is_word_char)
        && indent_width(line) <= declaration_width
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { INDENT_WIDTH } else { 1 })
        .sum()
}

/// Name between the keyword and the first `(` or `:`
fn declared_name(rest: &str) -> String {
    rest.split(['(', ':'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"import os


def load(path):
    """Read a file."""
    with open(path) as f:

        return f.read()


class Store(Base):
    """Keeps things."""

    def __init__(self, root):
        self.root = root

    def get(self, key):
        def inner():
            return key
        return inner()


def main():
    print(load("x"))
"#;

    fn lines(source: &str) -> Vec<&str> {
        source.lines().collect()
    }

    #[test]
    fn test_extract_top_level_functions() {
        let functions = extract_functions(&lines(SAMPLE), 0);

        assert_eq!(functions.names().collect::<Vec<_>>(), vec!["load", "main"]);

        let load = functions.get("load").unwrap();
        assert_eq!(load.kind, UnitKind::Function);
        assert!(load.text.starts_with("def load(path):"));
        // interior blank line kept, trailing blank lines dropped
        assert!(load.text.contains("\n\n        return f.read()"));
        assert!(load.text.ends_with("return f.read()"));

        assert_eq!(
            functions.get("main").unwrap().text,
            "def main():\n    print(load(\"x\"))"
        );
    }

    #[test]
    fn test_extract_classes_with_methods() {
        let classes = extract_classes(&lines(SAMPLE));

        assert_eq!(classes.len(), 1);
        let store = classes.get("Store").unwrap();
        assert_eq!(store.kind, UnitKind::Class);
        assert!(store.text.starts_with("class Store(Base):"));
        assert!(store.text.ends_with("        return inner()"));

        assert_eq!(
            store.methods.names().collect::<Vec<_>>(),
            vec!["__init__", "get"]
        );
        let init = store.methods.get("__init__").unwrap();
        assert_eq!(init.kind, UnitKind::Method);
        assert_eq!(
            init.text,
            "    def __init__(self, root):\n        self.root = root"
        );

        // nested function stays inside its method
        let get = store.methods.get("get").unwrap();
        assert!(get.text.contains("def inner():"));
        assert!(!store.methods.names().any(|name| name == "inner"));
    }

    #[test]
    fn test_methods_exclude_class_signature() {
        let source = "class A:\n    def one(self):\n        pass\n    def two(self):\n        pass\n    def three(self):\n        pass\n";
        let classes = extract_classes(&lines(source));
        let a = classes.get("A").unwrap();

        assert_eq!(a.methods.len(), 3);
        for method in &a.methods {
            assert!(!method.text.contains("class A"));
            assert!(method.text.starts_with("    def "));
        }
    }

    #[test]
    fn test_trailing_blank_lines_never_captured() {
        let source = "def a():\n    return 1\n\n   \n\t\ndef b():\n    return 2\n\n\n";
        let functions = extract_functions(&lines(source), 0);

        for unit in &functions {
            assert!(!unit.text.ends_with('\n'));
            assert!(!unit.text.lines().last().unwrap().trim().is_empty());
        }
        assert_eq!(functions.get("a").unwrap().text, "def a():\n    return 1");
    }

    #[test]
    fn test_signature_only_units_are_captured() {
        let source = "class Empty: pass\ndef noop(): ...\nx = 1\n";
        let breakdown = breakdown_source("empty.py", source);

        assert_eq!(breakdown.classes.get("Empty").unwrap().text, "class Empty: pass");
        assert!(breakdown.classes.get("Empty").unwrap().methods.is_empty());
        assert_eq!(breakdown.functions.get("noop").unwrap().text, "def noop(): ...");
    }

    #[test]
    fn test_duplicate_names_last_write_wins() {
        let source = "def f():\n    return 1\n\ndef g():\n    pass\n\ndef f():\n    return 2\n";
        let functions = extract_functions(&lines(source), 0);

        assert_eq!(functions.len(), 2);
        assert_eq!(functions.get("f").unwrap().text, "def f():\n    return 2");
    }

    #[test]
    fn test_decorator_not_included() {
        let source = "class A:\n    @property\n    def size(self):\n        return 1\n";
        let classes = extract_classes(&lines(source));
        let size = classes.get("A").unwrap().methods.get("size").unwrap();

        assert_eq!(size.text, "    def size(self):\n        return 1");

        let source = "@cache\ndef cached():\n    return 1\n";
        let functions = extract_functions(&lines(source), 0);
        assert!(!functions.get("cached").unwrap().text.contains("@cache"));
    }

    #[test]
    fn test_dedent_closes_unit() {
        let source = "def a():\n    x = 1\nVALUE = 3\n    stray = 2\n";
        let functions = extract_functions(&lines(source), 0);

        assert_eq!(functions.get("a").unwrap().text, "def a():\n    x = 1");
    }

    #[test]
    fn test_lines_without_word_chars_stay_in_unit() {
        let source = "def build(\n    a,\n    b,\n):\n    return a + b\n";
        let functions = extract_functions(&lines(source), 0);

        assert_eq!(functions.get("build").unwrap().text, source.trim_end());
    }

    #[test]
    fn test_tab_indented_body() {
        let source = "def tabbed():\n\treturn 1\n";
        let functions = extract_functions(&lines(source), 0);

        assert_eq!(functions.get("tabbed").unwrap().text, "def tabbed():\n\treturn 1");
    }

    #[test]
    fn test_tab_indented_methods() {
        let source = "class A:\n\tdef one(self):\n\t\treturn 1\n\tdef two(self):\n\t\treturn 2\n";
        let classes = extract_classes(&lines(source));
        let a = classes.get("A").unwrap();

        assert_eq!(a.methods.names().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(a.methods.get("one").unwrap().text, "\tdef one(self):\n\t\treturn 1");
        assert_eq!(a.methods.get("two").unwrap().kind, UnitKind::Method);
    }

    #[test]
    fn test_declaration_must_sit_at_exact_level() {
        let source = "class A:\n  def shallow(self):\n    pass\n    def right(self):\n        pass\n";
        let classes = extract_classes(&lines(source));
        let a = classes.get("A").unwrap();

        assert_eq!(a.methods.names().collect::<Vec<_>>(), vec!["right"]);
    }

    #[test]
    fn test_no_declarations_yields_empty_breakdown() {
        let breakdown = breakdown_source("constants.py", "A = 1\nB = 2\n# define nothing\n");
        assert!(breakdown.is_empty());
        assert_eq!(breakdown.unit_count(), 0);

        assert!(breakdown_source("empty.py", "").is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let first = breakdown_source("sample.py", SAMPLE);
        let second = breakdown_source("sample.py", SAMPLE);

        assert_eq!(first, second);
        assert_eq!(first.unit_count(), 5);
    }

    #[test]
    fn test_declared_name() {
        assert_eq!(declared_name("main():"), "main");
        assert_eq!(declared_name("Foo(Base):"), "Foo");
        assert_eq!(declared_name("Bar:"), "Bar");
        assert_eq!(declared_name("spaced (x):"), "spaced");
    }
}
