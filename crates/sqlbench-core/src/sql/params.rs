use crate::errors::diagnostic::{codes, Diagnostic};
use serde::{Deserialize, Serialize};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};
use std::collections::HashMap;
use std::fmt;

/// A variable declared by setup SQL, e.g. `@since datetime2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredParameter {
    pub name: String,
    pub data_type: String,
}

impl DeclaredParameter {
    pub fn is_table(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("TABLE")
    }

    pub fn is_cursor(&self) -> bool {
        self.data_type.eq_ignore_ascii_case("CURSOR")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlDiagnostic {
    pub line: u64,
    pub column: u64,
    pub message: String,
}

impl fmt::Display for SqlDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

/// Setup SQL that could not be read. Carries every problem found plus the
/// offending text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse setup SQL{}", render_problems(.diagnostics))]
pub struct ParseError {
    pub diagnostics: Vec<SqlDiagnostic>,
    pub sql: String,
}

impl ParseError {
    fn at(loc: Location, message: impl Into<String>, sql: &str) -> Self {
        Self {
            diagnostics: vec![SqlDiagnostic {
                line: loc.line,
                column: loc.column,
                message: message.into(),
            }],
            sql: sql.to_string(),
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let problems: Vec<String> = self.diagnostics.iter().map(|d| d.to_string()).collect();
        Diagnostic::new(codes::E_SETUP_SQL_PARSE, "failed to parse setup SQL")
            .with_source("sql")
            .with_context(serde_json::json!({
                "errors": problems,
                "sql": self.sql,
            }))
            .with_fix_step("Check the parameter_sql of the suite and of each case")
    }
}

fn render_problems(diagnostics: &[SqlDiagnostic]) -> String {
    diagnostics.iter().map(|d| format!("\n  {}", d)).collect()
}

/// Finds the variables declared at the top level of a SQL fragment.
pub trait DeclarationParser: Send + Sync {
    fn declarations(&self, sql: &str) -> Result<Vec<DeclaredParameter>, ParseError>;
}

/// Memoizing front for a [`DeclarationParser`]. Entries live as long as the
/// extractor; the key is the exact fragment text.
pub struct ParameterExtractor {
    parser: Box<dyn DeclarationParser>,
    memo: HashMap<String, Vec<DeclaredParameter>>,
}

impl Default for ParameterExtractor {
    fn default() -> Self {
        Self::new(Box::new(TsqlDeclarations))
    }
}

impl ParameterExtractor {
    pub fn new(parser: Box<dyn DeclarationParser>) -> Self {
        Self {
            parser,
            memo: HashMap::new(),
        }
    }

    pub fn extract(&mut self, sql: &str) -> Result<Vec<DeclaredParameter>, ParseError> {
        if let Some(hit) = self.memo.get(sql) {
            return Ok(hit.clone());
        }
        let params = self.parser.declarations(sql)?;
        self.memo.insert(sql.to_string(), params.clone());
        Ok(params)
    }

    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }
}

/// T-SQL `DECLARE` extraction over the sqlparser tokenizer.
pub struct TsqlDeclarations;

impl DeclarationParser for TsqlDeclarations {
    fn declarations(&self, sql: &str) -> Result<Vec<DeclaredParameter>, ParseError> {
        let dialect = MsSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .tokenize_with_location()
            .map_err(|e| ParseError::at(e.location, e.message, sql))?;
        let tokens: Vec<TokenWithSpan> = tokens
            .into_iter()
            .filter(|t| !matches!(t.token, Token::Whitespace(_) | Token::EOF))
            .collect();

        Scanner { sql, tokens: &tokens, pos: 0 }.run()
    }
}

const STATEMENT_KEYWORDS: &[&str] = &[
    "ALTER", "BEGIN", "BREAK", "CLOSE", "COMMIT", "CONTINUE", "CREATE", "DEALLOCATE", "DECLARE",
    "DELETE", "DENY", "DROP", "ELSE", "EXEC", "EXECUTE", "FETCH", "GO", "GOTO", "GRANT", "IF",
    "INSERT", "MERGE", "OPEN", "PRINT", "RAISERROR", "RETURN", "REVOKE", "ROLLBACK", "SAVE",
    "SELECT", "SET", "THROW", "TRUNCATE", "UPDATE", "USE", "WAITFOR", "WHILE", "WITH",
];

fn keyword(t: &Token) -> Option<&str> {
    match t {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.as_str()),
        _ => None,
    }
}

fn is_keyword(t: &Token, kw: &str) -> bool {
    keyword(t).is_some_and(|v| v.eq_ignore_ascii_case(kw))
}

fn starts_statement(t: &Token) -> bool {
    keyword(t).is_some_and(|v| STATEMENT_KEYWORDS.iter().any(|k| v.eq_ignore_ascii_case(k)))
}

enum Block {
    Begin,
    Case,
}

struct Scanner<'a> {
    sql: &'a str,
    tokens: &'a [TokenWithSpan],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn run(mut self) -> Result<Vec<DeclaredParameter>, ParseError> {
        let mut out = Vec::new();
        let mut parens: Vec<Location> = Vec::new();
        let mut blocks: Vec<(Block, Location)> = Vec::new();

        while let Some(t) = self.tokens.get(self.pos) {
            let loc = t.span.start;
            match &t.token {
                Token::LParen => parens.push(loc),
                Token::RParen => {
                    if parens.pop().is_none() {
                        return Err(self.error(loc, "unexpected ')'"));
                    }
                }
                tok if is_keyword(tok, "BEGIN") => {
                    if !self.begins_transaction() {
                        blocks.push((Block::Begin, loc));
                    }
                }
                tok if is_keyword(tok, "CASE") => blocks.push((Block::Case, loc)),
                tok if is_keyword(tok, "END") => {
                    if blocks.pop().is_none() {
                        return Err(self.error(loc, "END without a matching BEGIN or CASE"));
                    }
                }
                tok if is_keyword(tok, "DECLARE") && parens.is_empty() && blocks.is_empty() => {
                    self.pos += 1;
                    self.declaration(&mut out)?;
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }

        if let Some(loc) = parens.last() {
            return Err(self.error(*loc, "'(' is never closed"));
        }
        if let Some((block, loc)) = blocks.last() {
            let what = match block {
                Block::Begin => "BEGIN",
                Block::Case => "CASE",
            };
            return Err(self.error(*loc, format!("{} is never closed with END", what)));
        }
        Ok(out)
    }

    fn begins_transaction(&self) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|n| {
            ["TRAN", "TRANSACTION", "DISTRIBUTED", "DIALOG", "CONVERSATION"]
                .iter()
                .any(|k| is_keyword(&n.token, k))
        })
    }

    /// Parses the declarator list following `DECLARE`. Leaves `pos` on the
    /// first token that does not belong to the declaration.
    fn declaration(&mut self, out: &mut Vec<DeclaredParameter>) -> Result<(), ParseError> {
        loop {
            let name = match self.variable_name() {
                Some(name) => name,
                None => {
                    if self.is_cursor_declaration() {
                        self.pos += 1;
                        return Ok(());
                    }
                    let loc = self.location_here();
                    return Err(self.error(loc, "expected a variable name after DECLARE"));
                }
            };

            if self.peek().is_some_and(|t| is_keyword(t, "AS")) {
                self.pos += 1;
            }

            let type_start = self.location_here();
            let data_type = self.data_type()?;
            if data_type.is_empty() {
                return Err(self.error(type_start, format!("expected a data type for {}", name)));
            }
            out.push(DeclaredParameter { name, data_type });

            if matches!(self.peek(), Some(Token::Eq)) {
                self.pos += 1;
                self.skip_expression()?;
            }

            if matches!(self.peek(), Some(Token::Comma)) {
                self.pos += 1;
                continue;
            }
            return Ok(());
        }
    }

    fn variable_name(&mut self) -> Option<String> {
        match self.peek()? {
            Token::Word(w)
                if w.quote_style.is_none() && w.value.starts_with('@') && w.value.len() > 1 =>
            {
                let name = w.value.clone();
                self.pos += 1;
                Some(name)
            }
            Token::AtSign => match self.tokens.get(self.pos + 1).map(|t| &t.token) {
                Some(Token::Word(w)) if w.quote_style.is_none() => {
                    let name = format!("@{}", w.value);
                    self.pos += 2;
                    Some(name)
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn is_cursor_declaration(&self) -> bool {
        let Some(Token::Word(_)) = self.peek() else {
            return false;
        };
        self.tokens[self.pos + 1..]
            .iter()
            .take(3)
            .any(|t| is_keyword(&t.token, "CURSOR"))
    }

    fn data_type(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.skip_until_boundary(true)?;
        Ok(render_type(&self.tokens[start..self.pos]))
    }

    fn skip_expression(&mut self) -> Result<(), ParseError> {
        let start = self.location_here();
        let before = self.pos;
        self.skip_until_boundary(false)?;
        if self.pos == before {
            return Err(self.error(start, "expected an initial value after '='"));
        }
        Ok(())
    }

    /// Advances over balanced tokens until a top-level declarator boundary.
    fn skip_until_boundary(&mut self, stop_at_eq: bool) -> Result<(), ParseError> {
        let mut parens: Vec<Location> = Vec::new();
        let mut cases: Vec<Location> = Vec::new();

        while let Some(t) = self.tokens.get(self.pos) {
            let depth0 = parens.is_empty() && cases.is_empty();
            match &t.token {
                Token::LParen => parens.push(t.span.start),
                Token::RParen if parens.is_empty() => {
                    if cases.is_empty() {
                        return Ok(());
                    }
                    return Err(self.error(t.span.start, "unexpected ')'"));
                }
                Token::RParen => {
                    parens.pop();
                }
                Token::Comma | Token::SemiColon if depth0 => return Ok(()),
                Token::Eq if depth0 && stop_at_eq => return Ok(()),
                tok if parens.is_empty() && is_keyword(tok, "CASE") => cases.push(t.span.start),
                tok if parens.is_empty() && is_keyword(tok, "END") => {
                    if cases.pop().is_none() {
                        return Ok(());
                    }
                }
                tok if depth0 && starts_statement(tok) => return Ok(()),
                _ => {}
            }
            self.pos += 1;
        }

        if let Some(loc) = parens.last() {
            return Err(self.error(*loc, "'(' is never closed"));
        }
        if let Some(loc) = cases.last() {
            return Err(self.error(*loc, "CASE is never closed with END"));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn location_here(&self) -> Location {
        match self.tokens.get(self.pos) {
            Some(t) => t.span.start,
            None => self
                .tokens
                .last()
                .map(|t| t.span.end)
                .unwrap_or(Location { line: 1, column: 1 }),
        }
    }

    fn error(&self, loc: Location, message: impl Into<String>) -> ParseError {
        ParseError::at(loc, message, self.sql)
    }
}

fn render_type(tokens: &[TokenWithSpan]) -> String {
    let first_is_table = tokens.first().is_some_and(|t| is_keyword(&t.token, "TABLE"));
    if first_is_table {
        return "TABLE".to_string();
    }

    let mut out = String::new();
    let mut prev_wordlike = false;
    for t in tokens {
        let wordlike = matches!(t.token, Token::Word(_) | Token::Number(..));
        if wordlike && prev_wordlike {
            out.push(' ');
        }
        out.push_str(&t.token.to_string());
        prev_wordlike = wordlike;
    }
    out
}
