//! Tokenizer for fixture sources
//!
//! Only as much of the language as is needed to find the default export and
//! fold its value: comments, string / template / regular-expression
//! literals, numbers, identifiers and punctuators. Positions are byte
//! offsets into the source.

use crate::error::ExtractionFailure;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    /// Template literal; `None` when it contains substitutions
    Template(Option<String>),
    Num(f64),
    BigInt,
    Regex,
    Punct(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// A line terminator sits between the previous token and this one
    pub newline_before: bool,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(self.kind, TokenKind::Punct(q) if q == p)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(n) if n == name)
    }
}

// Longest first, so that `>>>=` wins over `>>`.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==", "!=",
    "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-", "*", "/", "%",
    "&", "|", "^", "!", "~", "?", ":", "=", ".", "@", "#",
];

// After these keywords a `/` starts a regular expression, not a division.
const KEYWORDS_BEFORE_EXPRESSION: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
    "default",
];

// A parenthesized header after these is followed by a statement.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

type LexResult<T> = std::result::Result<T, ExtractionFailure>;

pub fn tokenize(source: &str) -> LexResult<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    /// One entry per open `(`: whether it starts a control header
    parens: Vec<bool>,
    /// One entry per open `{`: whether it starts a block
    braces: Vec<bool>,
    /// The last token is a `)` or `}` that ends a statement head or a block
    closed_statement: bool,
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c)
        || c.is_ascii_digit()
        || c == '\u{200c}'
        || c == '\u{200d}'
        || c.is_alphanumeric()
}

fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            tokens: Vec::new(),
            parens: Vec::new(),
            braces: Vec::new(),
            closed_statement: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: &str) -> ExtractionFailure {
        let line = self.src[..self.pos].matches('\n').count() + 1;
        ExtractionFailure::Syntax(format!("{} (line {})", message, line))
    }

    fn run(mut self) -> LexResult<Vec<Token>> {
        loop {
            let newline_before = self.skip_trivia()?;
            let start = self.pos;
            let c = match self.peek() {
                Some(c) => c,
                None => break,
            };

            let kind = if is_ident_start(c) || c == '\\' {
                TokenKind::Ident(self.read_ident()?)
            } else if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
            {
                self.read_number()?
            } else if c == '"' || c == '\'' {
                TokenKind::Str(self.read_string(c)?)
            } else if c == '`' {
                TokenKind::Template(self.read_template()?)
            } else if c == '/' && self.regex_allowed() {
                self.read_regex()?;
                TokenKind::Regex
            } else {
                TokenKind::Punct(self.read_punct()?)
            };

            self.closed_statement = match &kind {
                TokenKind::Punct(p) => self.track_nesting(p),
                _ => false,
            };
            self.tokens.push(Token {
                kind,
                start,
                end: self.pos,
                newline_before,
            });
        }

        Ok(self.tokens)
    }

    /// Skip whitespace and comments, reporting whether a line break was seen
    fn skip_trivia(&mut self) -> LexResult<bool> {
        let mut newline = false;
        while let Some(c) = self.peek() {
            if is_line_terminator(c) {
                newline = true;
                self.bump();
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.bump();
            } else if self.src[self.pos..].starts_with("//") {
                while let Some(c) = self.peek() {
                    if is_line_terminator(c) {
                        break;
                    }
                    self.bump();
                }
            } else if self.src[self.pos..].starts_with("/*") {
                let rest = &self.src[self.pos + 2..];
                let close = rest
                    .find("*/")
                    .ok_or_else(|| self.error("unterminated block comment"))?;
                if rest[..close].chars().any(is_line_terminator) {
                    newline = true;
                }
                self.pos += 2 + close + 2;
            } else if self.pos == 0 && self.src.starts_with("#!") {
                while let Some(c) = self.peek() {
                    if is_line_terminator(c) {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    /// Update the bracket stacks for `punct`, which is about to be pushed.
    /// Returns whether it closes a control header or a block.
    fn track_nesting(&mut self, punct: &str) -> bool {
        match punct {
            "(" => {
                let header = matches!(
                    self.tokens.last().map(|t| &t.kind),
                    Some(TokenKind::Ident(name)) if CONTROL_KEYWORDS.contains(&name.as_str())
                );
                self.parens.push(header);
                false
            }
            ")" => self.parens.pop().unwrap_or(false),
            "{" => {
                let block = self.brace_opens_block();
                self.braces.push(block);
                false
            }
            "}" => self.braces.pop().unwrap_or(false),
            _ => false,
        }
    }

    fn brace_opens_block(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            None => true,
            Some(TokenKind::Punct(p)) => matches!(*p, ";" | "{" | "}" | ")" | "=>"),
            Some(TokenKind::Ident(name)) => {
                matches!(name.as_str(), "do" | "else")
                    || !KEYWORDS_BEFORE_EXPRESSION.contains(&name.as_str())
            }
            Some(_) => false,
        }
    }

    fn regex_allowed(&self) -> bool {
        match self.tokens.last().map(|t| &t.kind) {
            None => true,
            Some(TokenKind::Punct(")" | "}")) => self.closed_statement,
            Some(TokenKind::Punct(p)) => *p != "]",
            Some(TokenKind::Ident(name)) => KEYWORDS_BEFORE_EXPRESSION.contains(&name.as_str()),
            Some(_) => false,
        }
    }

    fn read_ident(&mut self) -> LexResult<String> {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.bump();
                if self.bump() != Some('u') {
                    return Err(self.error("invalid escape in identifier"));
                }
                name.push(self.read_unicode_escape()?);
            } else if is_ident_part(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn read_number(&mut self) -> LexResult<TokenKind> {
        let start = self.pos;
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        let value = if radix != 10 {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_digit(radix) || c == '_');
            let digits = digits.replace('_', "");
            if digits.is_empty() {
                return Err(self.error("missing digits in number literal"));
            }
            if self.peek() == Some('n') {
                self.bump();
                return Ok(TokenKind::BigInt);
            }
            // Large literals lose precision the same way the runtime does.
            digits
                .chars()
                .fold(0f64, |acc, d| acc * radix as f64 + d.to_digit(radix).unwrap_or(0) as f64)
        } else {
            self.take_while(|c| c.is_ascii_digit() || c == '_');
            if self.peek() == Some('n') {
                self.bump();
                return Ok(TokenKind::BigInt);
            }
            if self.peek() == Some('.') {
                self.bump();
                self.take_while(|c| c.is_ascii_digit() || c == '_');
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let sign = self.peek_at(1);
                let digit_at = if matches!(sign, Some('+' | '-')) { 2 } else { 1 };
                if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                    for _ in 0..digit_at {
                        self.bump();
                    }
                    self.take_while(|c| c.is_ascii_digit() || c == '_');
                }
            }
            let text = self.src[start..self.pos].replace('_', "");
            text.parse::<f64>()
                .map_err(|_| self.error(&format!("invalid number literal `{}`", text)))?
        };

        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error("identifier directly after number"));
        }

        Ok(TokenKind::Num(value))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        let src = self.src;
        &src[start..self.pos]
    }

    fn read_hex_digits(&mut self, count: usize) -> LexResult<u32> {
        let mut value = 0u32;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error("invalid hexadecimal escape"))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    /// Reads the part after `\u`
    fn read_unicode_escape(&mut self) -> LexResult<char> {
        let code = if self.peek() == Some('{') {
            self.bump();
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            if self.bump() != Some('}') || digits.is_empty() {
                return Err(self.error("invalid unicode escape"));
            }
            u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid unicode escape"))?
        } else {
            let high = self.read_hex_digits(4)?;
            // Surrogate pair written as two escapes.
            if (0xD800..0xDC00).contains(&high) && self.src[self.pos..].starts_with("\\u") {
                let save = self.pos;
                self.pos += 2;
                match self.read_hex_digits(4) {
                    Ok(low) if (0xDC00..0xE000).contains(&low) => {
                        return Ok(char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))
                            .unwrap_or(char::REPLACEMENT_CHARACTER));
                    }
                    _ => self.pos = save,
                }
            }
            high
        };
        Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// Reads an escape sequence after the backslash, `None` for a line continuation
    fn read_escape(&mut self) -> LexResult<Option<char>> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape sequence"))?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !self.peek().is_some_and(|d| d.is_ascii_digit()) => '\0',
            'x' => char::from_u32(self.read_hex_digits(2)?).unwrap_or(char::REPLACEMENT_CHARACTER),
            'u' => self.read_unicode_escape()?,
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
                return Ok(None);
            }
            c if is_line_terminator(c) => return Ok(None),
            other => other,
        };
        Ok(Some(decoded))
    }

    fn read_string(&mut self, quote: char) -> LexResult<String> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => {
                    if let Some(decoded) = self.read_escape()? {
                        value.push(decoded);
                    }
                }
                Some(c) if c == '\n' || c == '\r' => {
                    return Err(self.error("unterminated string literal"))
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn read_template(&mut self) -> LexResult<Option<String>> {
        self.bump();
        let mut value = String::new();
        let mut substituted = false;
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated template literal")),
                Some('`') => return Ok(if substituted { None } else { Some(value) }),
                Some('\\') => {
                    if let Some(decoded) = self.read_escape()? {
                        value.push(decoded);
                    }
                }
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    substituted = true;
                    self.skip_substitution()?;
                }
                Some('\r') => {
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                    value.push('\n');
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// Skip a `${ ... }` body, including nested literals and braces
    fn skip_substitution(&mut self) -> LexResult<()> {
        let mut depth = 1usize;
        while depth > 0 {
            self.skip_trivia()?;
            match self.peek() {
                None => return Err(self.error("unterminated template substitution")),
                Some('{') => {
                    depth += 1;
                    self.bump();
                }
                Some('}') => {
                    depth -= 1;
                    self.bump();
                }
                Some(q @ ('"' | '\'')) => {
                    self.read_string(q)?;
                }
                Some('`') => {
                    self.read_template()?;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        Ok(())
    }

    fn read_regex(&mut self) -> LexResult<()> {
        self.bump();
        let mut in_class = false;
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated regular expression")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error("unterminated regular expression"))
                }
                Some('\\') => {
                    self.bump();
                }
                Some('[') => in_class = true,
                Some(']') => in_class = false,
                Some('/') if !in_class => break,
                Some(_) => {}
            }
        }
        self.take_while(is_ident_part);
        Ok(())
    }

    fn read_punct(&mut self) -> LexResult<&'static str> {
        let rest = &self.src[self.pos..];
        let punct = PUNCTUATORS
            .iter()
            .copied()
            // `?.` followed by a digit is a conditional and a number
            .filter(|p| {
                !(*p == "?."
                    && rest
                        .get(2..)
                        .is_some_and(|r| r.starts_with(|c: char| c.is_ascii_digit())))
            })
            .find(|p| rest.starts_with(p))
            .ok_or_else(|| {
                let found = rest.chars().next().unwrap_or(' ');
                self.error(&format!("unexpected character `{}`", found))
            })?;
        self.pos += punct.len();
        Ok(punct)
    }
}
