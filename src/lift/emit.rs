//! # Statement Emitter
//!
//! Textual assembly for lifted statements: two-space indentation per scope,
//! `;`-terminated statements, `{`-on-opener/`}`-on-its-own-line blocks, and
//! the spec.md §4.7 post-pass cleanup (drop lone trivial-literal statements,
//! de-duplicate a `var`-redeclaration of a name already declared in the
//! same scope).

const INDENT_UNIT: &str = "  ";

/// One already-formatted output line, tagged with the scope depth it was
/// emitted at so the post-pass can reason about block boundaries without
/// re-parsing indentation whitespace.
#[derive(Debug, Clone)]
pub struct Line {
    pub depth: usize,
    pub text: String,
}

/// Accumulates lines for one function body. `indent` tracks the current
/// scope depth; `open_block`/`close_block` raise and lower it around `{ }`.
#[derive(Debug, Default)]
pub struct Emitter {
    lines: Vec<Line>,
    depth: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stmt(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            depth: self.depth,
            text: format!("{};", text.into()),
        });
    }

    pub fn raw(&mut self, text: impl Into<String>) {
        self.lines.push(Line {
            depth: self.depth,
            text: text.into(),
        });
    }

    pub fn open_block(&mut self, header: impl Into<String>) {
        self.lines.push(Line {
            depth: self.depth,
            text: format!("{} {{", header.into()),
        });
        self.depth += 1;
    }

    /// Close the current block with a bare `}`.
    pub fn close_block(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.lines.push(Line {
            depth: self.depth,
            text: "}".to_string(),
        });
    }

    /// Close the current block and immediately open a new one on the same
    /// line (`} else {`, `} catch (e) {`).
    pub fn close_and_open(&mut self, header: impl Into<String>) {
        self.depth = self.depth.saturating_sub(1);
        self.lines.push(Line {
            depth: self.depth,
            text: format!("}} {} {{", header.into()),
        });
        self.depth += 1;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Splice a block of already-indented lines (e.g. a recursively lifted
    /// nested function body) in verbatim, shifting their depth by the
    /// current depth.
    pub fn splice(&mut self, lines: Vec<Line>) {
        for mut line in lines {
            line.depth += self.depth;
            self.lines.push(line);
        }
    }

    pub fn into_lines(self) -> Vec<Line> {
        self.lines
    }

    /// Render to final text, running the post-pass cleanup first.
    pub fn render(self) -> String {
        render_lines(cleanup(self.lines))
    }
}

pub fn render_lines(lines: Vec<Line>) -> String {
    lines
        .into_iter()
        .map(|line| format!("{}{}", INDENT_UNIT.repeat(line.depth), line.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop lines that are lone trivial literals (`undefined;`, `null;`, a bare
/// numeric-literal statement), and rewrite a `var NAME = ...;` that
/// re-declares a name already declared at the same scope depth into a plain
/// assignment `NAME = ...;`.
pub fn cleanup(lines: Vec<Line>) -> Vec<Line> {
    let mut declared: Vec<std::collections::HashSet<String>> = vec![Default::default()];
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        if is_trivial_literal_statement(&line.text) {
            continue;
        }

        while declared.len() > line.depth + 1 {
            declared.pop();
        }
        while declared.len() < line.depth + 1 {
            declared.push(Default::default());
        }

        if let Some(name) = declared_var_name(&line.text) {
            let scope = declared.last_mut().unwrap();
            if scope.contains(&name) {
                let rewritten = line.text.replacen("var ", "", 1);
                out.push(Line {
                    depth: line.depth,
                    text: rewritten,
                });
                continue;
            }
            scope.insert(name);
        }

        out.push(line);
    }

    out
}

fn is_trivial_literal_statement(text: &str) -> bool {
    matches!(text, "undefined;" | "null;") || is_bare_numeric_literal_statement(text)
}

fn is_bare_numeric_literal_statement(text: &str) -> bool {
    let Some(body) = text.strip_suffix(';') else {
        return false;
    };
    !body.is_empty() && body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
}

fn declared_var_name(text: &str) -> Option<String> {
    let body = text.strip_prefix("var ")?;
    let name = body.split(|c: char| c == ' ' || c == '=').next()?;
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_lone_trivial_literals() {
        let lines = vec![
            Line { depth: 0, text: "undefined;".into() },
            Line { depth: 0, text: "null;".into() },
            Line { depth: 0, text: "42;".into() },
            Line { depth: 0, text: "return var_0;".into() },
        ];
        let cleaned = cleanup(lines);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].text, "return var_0;");
    }

    #[test]
    fn redeclaration_in_same_scope_becomes_assignment() {
        let lines = vec![
            Line { depth: 0, text: "var var_0 = 1;".into() },
            Line { depth: 0, text: "var var_0 = 2;".into() },
        ];
        let cleaned = cleanup(lines);
        assert_eq!(cleaned[0].text, "var var_0 = 1;");
        assert_eq!(cleaned[1].text, "var_0 = 2;");
    }

    #[test]
    fn redeclaration_in_a_nested_scope_is_left_alone() {
        let lines = vec![
            Line { depth: 0, text: "var var_0 = 1;".into() },
            Line { depth: 0, text: "if (true) {".into() },
            Line { depth: 1, text: "var var_0 = 2;".into() },
            Line { depth: 0, text: "}".into() },
        ];
        let cleaned = cleanup(lines);
        assert_eq!(cleaned[2].text, "var var_0 = 2;");
    }
}
