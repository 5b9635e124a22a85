//! A small indent-aware code writer backing the emitter.

const INDENT: &str = "    ";

/// Ordered buffer of emitted statements with indentation tracking.
#[derive(Debug, Default)]
pub struct Module {
    lines: Vec<String>,
    indent: usize,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    /// Emit one line at the current indent.
    pub fn stmt(&mut self, line: impl Into<String>) {
        let line = line.into();
        if line.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", INDENT.repeat(self.indent), line));
        }
    }

    /// Blank separator line; consecutive separators collapse.
    pub fn sep(&mut self) {
        if !matches!(self.lines.last().map(String::as_str), Some("") | None) {
            self.lines.push(String::new());
        }
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent below zero");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Emit a line and indent the lines that follow.
    pub fn open(&mut self, line: impl Into<String>) {
        self.stmt(line);
        self.indent();
    }

    /// Dedent and emit the closing line.
    pub fn close(&mut self, line: impl Into<String>) {
        self.dedent();
        self.stmt(line);
    }

    /// Append text to the most recent line (trailing commas in chains).
    pub fn append(&mut self, suffix: &str) {
        if let Some(last) = self.lines.last_mut() {
            last.push_str(suffix);
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_nests() {
        let mut m = Module::new();
        m.open("fn main() {");
        m.stmt("let x = 1;");
        m.open("if x == 1 {");
        m.stmt("return;");
        m.close("}");
        m.close("}");
        assert_eq!(
            m.render(),
            "fn main() {\n    let x = 1;\n    if x == 1 {\n        return;\n    }\n}\n"
        );
    }

    #[test]
    fn sep_collapses() {
        let mut m = Module::new();
        m.stmt("a");
        m.sep();
        m.sep();
        m.stmt("b");
        assert_eq!(m.render(), "a\n\nb\n");
    }

    #[test]
    fn append_extends_last_line() {
        let mut m = Module::new();
        m.open("call(");
        m.stmt("arg");
        m.append(",");
        m.close(")");
        assert_eq!(m.render(), "call(\n    arg,\n)\n");
    }
}
