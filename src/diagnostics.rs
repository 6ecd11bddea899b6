use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SourceSpan {
    start: usize,
    len: usize,
}

impl SourceSpan {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn from_bounds(start: usize, end: usize) -> Self {
        Self::new(start, end.saturating_sub(start))
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn end(&self) -> usize {
        self.start.saturating_add(self.len)
    }

    pub fn merge(&self, other: &SourceSpan) -> SourceSpan {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        SourceSpan::new(start, end.saturating_sub(start))
    }

    fn clamped_start(&self, source: &str) -> usize {
        let mut start = self.start.min(source.len());
        while !source.is_char_boundary(start) {
            start -= 1;
        }
        start
    }

    fn clamped_end(&self, source: &str) -> usize {
        let mut end = self.end().min(source.len());
        while !source.is_char_boundary(end) {
            end -= 1;
        }
        end
    }

    fn line_bounds(&self, source: &str) -> (usize, usize) {
        let start = self.clamped_start(source);
        let line_start = source[..start].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let line_end = source[start..]
            .find('\n')
            .map(|idx| start + idx)
            .unwrap_or(source.len());
        (line_start, line_end)
    }

    pub fn line_and_column(&self, source: &str) -> (usize, usize) {
        let start = self.clamped_start(source);
        let mut line = 1usize;
        let mut column = 1usize;
        for ch in source[..start].chars() {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }

    fn caret_info(&self, source: &str) -> (usize, usize, String) {
        let (line_start, line_end) = self.line_bounds(source);
        let start = self.clamped_start(source);
        let line_text = source[line_start..line_end].to_string();
        let prefix_len = source[line_start..start.min(line_end)].chars().count();
        let highlight_width = if start >= line_end {
            0
        } else {
            source[start..self.clamped_end(source).clamp(start, line_end)]
                .chars()
                .count()
        };
        (prefix_len, highlight_width.max(1), line_text)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--{}", self.start, self.end())
    }
}

/// What went wrong, independent of the message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A node kind or operator outside the supported set.
    UnsupportedConstruct,
    /// A supported construct used outside its supported shape.
    ShapeViolation,
    /// A symbolic branch with no enclosing construct carrying its label.
    UnresolvedBranch,
    /// ESTree input that does not fit the expected node shapes.
    MalformedInput,
    /// Module text rejected by the assembler or the validator.
    Assembly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<SourceSpan>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::UnsupportedConstruct, message)
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::ShapeViolation, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::MalformedInput, message)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn render_with_source(&self, source: &str) -> String {
        match &self.span {
            Some(span) => {
                let (line, column) = span.line_and_column(source);
                let (prefix_len, caret_width, line_text) = span.caret_info(source);
                let gutter_width = line.to_string().len().max(2);
                let spacer = format!("{:>width$} |", "", width = gutter_width);
                let line_display = format!(
                    "{line:>width$} | {line_text}",
                    line = line,
                    width = gutter_width,
                    line_text = line_text
                );
                let caret_line = format!(
                    "{spacer} {spaces}{markers}",
                    spacer = spacer,
                    spaces = " ".repeat(prefix_len),
                    markers = "^".repeat(caret_width)
                );
                format!(
                    "{message}\n --> line {line}, column {column}\n{spacer}\n{line_display}\n{caret_line}",
                    message = self.message,
                    line = line,
                    column = column,
                    spacer = spacer,
                    line_display = line_display,
                    caret_line = caret_line
                )
            }
            None => self.message.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "{} ({})", self.message, span),
            None => write!(f, "{}", self.message),
        }
    }
}
