//! Directive parser for declarative `.sql` migrations
//!
//! A file is split into an apply (`-- +tidemark Up`) and a rollback
//! (`-- +tidemark Down`) section. Statements end at `;` unless the `;` sits
//! inside a quoted string, a quoted identifier, a comment, or a
//! `StatementBegin`/`StatementEnd` block.
//!
//! A backslash inside a quoted literal escapes the next character, so
//! `'it\'s'` stays one literal. A literal that really ends in a backslash
//! (`'C:\'`) belongs in a `StatementBegin`/`StatementEnd` block.

use crate::error::{CoreError, CoreResult};

/// Prefix every directive line starts with, after the `--` comment marker
pub const DIRECTIVE_PREFIX: &str = "+tidemark";

/// Statement lists and flags extracted from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMigration {
    /// `None` when the file has no `Up` section
    pub apply: Option<Vec<String>>,

    /// `None` when the file has no `Down` section
    pub rollback: Option<Vec<String>>,

    pub use_transaction: bool,
}

impl ParsedMigration {
    /// Render back to directive-annotated SQL.
    ///
    /// Statements that would not survive a plain `;` split are wrapped in a
    /// `StatementBegin`/`StatementEnd` block.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        if !self.use_transaction {
            out.push_str(&directive_line(Directive::NoTransaction));
        }
        if let Some(apply) = &self.apply {
            out.push_str(&directive_line(Directive::Up));
            write_statements(&mut out, apply);
        }
        if let Some(rollback) = &self.rollback {
            out.push_str(&directive_line(Directive::Down));
            write_statements(&mut out, rollback);
        }
        out
    }
}

fn write_statements(out: &mut String, statements: &[String]) {
    for stmt in statements {
        if needs_block(stmt) {
            out.push_str(&directive_line(Directive::StatementBegin));
            out.push_str(stmt);
            out.push('\n');
            out.push_str(&directive_line(Directive::StatementEnd));
        } else {
            out.push_str(stmt);
            out.push('\n');
        }
    }
}

fn needs_block(stmt: &str) -> bool {
    let Some(body) = stmt.strip_suffix(';') else {
        return true;
    };
    body.contains(';') || stmt.contains("--") || stmt.contains("/*")
}

fn directive_line(d: Directive) -> String {
    format!("-- {} {}\n", DIRECTIVE_PREFIX, d.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Up,
    Down,
    StatementBegin,
    StatementEnd,
    NoTransaction,
}

impl Directive {
    fn as_str(&self) -> &'static str {
        match self {
            Directive::Up => "Up",
            Directive::Down => "Down",
            Directive::StatementBegin => "StatementBegin",
            Directive::StatementEnd => "StatementEnd",
            Directive::NoTransaction => "NO TRANSACTION",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Up" => Some(Directive::Up),
            "Down" => Some(Directive::Down),
            "StatementBegin" => Some(Directive::StatementBegin),
            "StatementEnd" => Some(Directive::StatementEnd),
            "NO TRANSACTION" => Some(Directive::NoTransaction),
            _ => None,
        }
    }
}

/// Returns the directive keyword if `line` is a `-- +tidemark ...` line
fn directive_keyword(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("--")?.trim_start();
    let keyword = rest.strip_prefix(DIRECTIVE_PREFIX)?;
    if !keyword.is_empty() && !keyword.starts_with(char::is_whitespace) {
        return None;
    }
    Some(keyword.trim())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Apply,
    Rollback,
}

/// Lexical position carried from one line to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Normal,
    SingleQuote,
    DoubleQuote,
    BlockComment,
}

struct Parser<'a> {
    file: &'a str,
    apply: Option<Vec<String>>,
    rollback: Option<Vec<String>>,
    use_transaction: bool,
    section: Option<Section>,
    /// Line where the open `StatementBegin` block started
    block_start: Option<usize>,
    lex: LexState,
    buf: String,
    /// Line where the buffered statement's first significant character is
    stmt_start: Option<usize>,
}

impl<'a> Parser<'a> {
    fn new(file: &'a str) -> Self {
        Self {
            file,
            apply: None,
            rollback: None,
            use_transaction: true,
            section: None,
            block_start: None,
            lex: LexState::Normal,
            buf: String::new(),
            stmt_start: None,
        }
    }

    fn error(&self, line: usize, directive: &str, message: impl Into<String>) -> CoreError {
        CoreError::ParseError {
            file: self.file.to_string(),
            line,
            directive: directive.to_string(),
            message: message.into(),
        }
    }

    fn push_statement(&mut self, stmt: String) {
        let target = match self.section {
            Some(Section::Apply) => self.apply.as_mut(),
            Some(Section::Rollback) => self.rollback.as_mut(),
            None => None,
        };
        if let Some(list) = target {
            list.push(stmt);
        }
    }

    /// Fail if a statement is still waiting for its `;`
    fn ensure_no_pending(&self, directive: &str) -> CoreResult<()> {
        match self.stmt_start {
            Some(line) => Err(self.error(
                line,
                directive,
                "statement is not terminated with ';'",
            )),
            None => Ok(()),
        }
    }

    fn reset_buffer(&mut self) {
        self.buf.clear();
        self.stmt_start = None;
    }

    fn directive(&mut self, line_no: usize, keyword: &str) -> CoreResult<()> {
        let Some(directive) = Directive::from_keyword(keyword) else {
            return Err(self.error(
                line_no,
                keyword,
                format!("unknown directive '-- {} {}'", DIRECTIVE_PREFIX, keyword),
            ));
        };

        match directive {
            Directive::Up | Directive::Down => {
                if self.block_start.is_some() {
                    return Err(self.error(
                        line_no,
                        directive.as_str(),
                        "section starts inside a StatementBegin block",
                    ));
                }
                let (slot, section) = match directive {
                    Directive::Up => (&self.apply, Section::Apply),
                    _ => (&self.rollback, Section::Rollback),
                };
                if slot.is_some() {
                    return Err(self.error(
                        line_no,
                        directive.as_str(),
                        "section declared more than once",
                    ));
                }
                if let Some(current) = self.section {
                    let name = match current {
                        Section::Apply => "Up",
                        Section::Rollback => "Down",
                    };
                    self.ensure_no_pending(name)?;
                }
                self.reset_buffer();
                self.lex = LexState::Normal;
                match section {
                    Section::Apply => self.apply = Some(Vec::new()),
                    Section::Rollback => self.rollback = Some(Vec::new()),
                }
                self.section = Some(section);
            }
            Directive::StatementBegin => {
                if self.section.is_none() {
                    return Err(self.error(
                        line_no,
                        directive.as_str(),
                        "StatementBegin outside an Up or Down section",
                    ));
                }
                if self.block_start.is_some() {
                    return Err(self.error(
                        line_no,
                        directive.as_str(),
                        "StatementBegin blocks cannot be nested",
                    ));
                }
                self.ensure_no_pending(directive.as_str())?;
                self.reset_buffer();
                self.block_start = Some(line_no);
            }
            Directive::StatementEnd => {
                if self.block_start.take().is_none() {
                    return Err(self.error(
                        line_no,
                        directive.as_str(),
                        "StatementEnd without a matching StatementBegin",
                    ));
                }
                let stmt = self.buf.trim().to_string();
                if !stmt.is_empty() {
                    self.push_statement(stmt);
                }
                self.reset_buffer();
                self.lex = LexState::Normal;
            }
            Directive::NoTransaction => {
                self.use_transaction = false;
            }
        }
        Ok(())
    }

    /// Feed one non-directive line through the statement splitter
    fn sql_line(&mut self, line_no: usize, line: &str) -> CoreResult<()> {
        if self.block_start.is_some() {
            self.buf.push_str(line);
            self.buf.push('\n');
            return Ok(());
        }

        if self.section.is_none() {
            if self.lex == LexState::Normal && is_comment_or_blank(line) {
                return Ok(());
            }
            if self.lex == LexState::BlockComment || line.trim_start().starts_with("/*") {
                self.scan(line_no, line);
                if self.stmt_start.is_none() {
                    self.reset_buffer();
                    return Ok(());
                }
            }
            return Err(self.error(
                line_no,
                "Up",
                "SQL found before any '-- +tidemark Up' or '-- +tidemark Down' section",
            ));
        }

        self.scan(line_no, line);
        Ok(())
    }

    fn scan(&mut self, line_no: usize, line: &str) {
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match self.lex {
                LexState::Normal => match c {
                    '-' if chars.peek() == Some(&'-') => {
                        self.buf.push(c);
                        self.buf.extend(chars.by_ref());
                        break;
                    }
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        self.buf.push_str("/*");
                        self.lex = LexState::BlockComment;
                    }
                    ';' => {
                        self.buf.push(c);
                        if self.stmt_start.is_some() {
                            let stmt = self.buf.trim().to_string();
                            self.push_statement(stmt);
                        }
                        self.reset_buffer();
                    }
                    c if c.is_whitespace() => self.buf.push(c),
                    c => {
                        self.mark_significant(line_no);
                        self.buf.push(c);
                        match c {
                            '\'' => self.lex = LexState::SingleQuote,
                            '"' => self.lex = LexState::DoubleQuote,
                            _ => {}
                        }
                    }
                },
                LexState::SingleQuote | LexState::DoubleQuote => {
                    self.buf.push(c);
                    if c == '\\' {
                        // MySQL-style escape: the next character never closes the literal
                        if let Some(escaped) = chars.next() {
                            self.buf.push(escaped);
                        }
                    } else if (c == '\'' && self.lex == LexState::SingleQuote)
                        || (c == '"' && self.lex == LexState::DoubleQuote)
                    {
                        self.lex = LexState::Normal;
                    }
                }
                LexState::BlockComment => {
                    self.buf.push(c);
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        self.buf.push('/');
                        self.lex = LexState::Normal;
                    }
                }
            }
        }
        self.buf.push('\n');
    }

    /// First real character of a statement: drop the comments buffered so far
    fn mark_significant(&mut self, line_no: usize) {
        if self.stmt_start.is_none() {
            self.buf.clear();
            self.stmt_start = Some(line_no);
        }
    }

    fn finish(self, last_line: usize) -> CoreResult<ParsedMigration> {
        if let Some(line) = self.block_start {
            return Err(self.error(
                line,
                Directive::StatementBegin.as_str(),
                "StatementBegin is never closed with StatementEnd",
            ));
        }
        if let Some(current) = self.section {
            let name = match current {
                Section::Apply => "Up",
                Section::Rollback => "Down",
            };
            self.ensure_no_pending(name)?;
        }

        match (&self.apply, &self.rollback) {
            (None, None) => Err(self.error(
                last_line,
                "Up",
                "no '-- +tidemark Up' or '-- +tidemark Down' section found",
            )),
            (Some(_), None) => Err(CoreError::MissingSection {
                migration: self.file.to_string(),
                section: "Down".to_string(),
            }),
            _ => Ok(ParsedMigration {
                apply: self.apply,
                rollback: self.rollback,
                use_transaction: self.use_transaction,
            }),
        }
    }
}

fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with("--")
}

/// Parse the contents of a declarative migration.
///
/// `file` only labels errors.
pub fn parse_migration(file: &str, content: &str) -> CoreResult<ParsedMigration> {
    let mut parser = Parser::new(file);
    let mut last_line = 0;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        last_line = line_no;

        if parser.lex == LexState::Normal {
            if let Some(keyword) = directive_keyword(line) {
                parser.directive(line_no, keyword)?;
                continue;
            }
        }
        parser.sql_line(line_no, line)?;
    }

    parser.finish(last_line)
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
