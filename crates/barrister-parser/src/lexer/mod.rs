mod cursor;

use crate::ParseError;
use cursor::Cursor;
use cursor::EOF_CHAR;
use std::fmt;

/// The classes of token the IDL lexer produces.
///
/// Keywords (`struct`, `enum`, `interface`, `extends`, `namespace`) are
/// ordinary [`Ident`] tokens; the parser classifies them from their text.
///
/// [`Ident`]: TokenKind::Ident
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Ident,
    /// `[]` immediately followed by an identifier; the token data excludes
    /// the `[]` prefix.
    ArrayIdent,
    /// A `[ ... ]` bracket holding type options; the token data is the
    /// bracket interior.
    TypeOpts,
    /// A single `//` line; the token data has the marker and one leading
    /// space stripped, and the terminating newline is consumed.
    Comment,
    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    Comma,    // ,
    /// Newlines are significant: they separate fields and delimit comment
    /// blocks. Other whitespace is skipped.
    Newline,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    data: String,
    line: usize,
}

impl Token {
    fn new(kind: TokenKind, data: String, line: usize) -> Self {
        Self { kind, data, line }
    }

    /// Get a reference to the token's kind.
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Get a reference to the token's data.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The 1-based line this token starts on.
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident => write!(f, "IDENT@{} {:?}", self.line, self.data),
            TokenKind::ArrayIdent => write!(f, "ARRAY_IDENT@{} {:?}", self.line, self.data),
            TokenKind::TypeOpts => write!(f, "TYPE_OPTS@{} {:?}", self.line, self.data),
            TokenKind::Comment => write!(f, "COMMENT@{} {:?}", self.line, self.data),
            TokenKind::LBrace => write!(f, "L_BRACE@{}", self.line),
            TokenKind::RBrace => write!(f, "R_BRACE@{}", self.line),
            TokenKind::LParen => write!(f, "L_PAREN@{}", self.line),
            TokenKind::RParen => write!(f, "R_PAREN@{}", self.line),
            TokenKind::Comma => write!(f, "COMMA@{}", self.line),
            TokenKind::Newline => write!(f, "NEWLINE@{}", self.line),
        }
    }
}

/// Tokenizes IDL text.
///
/// Lexing never aborts: unknown input is reported as an error carrying the
/// current line number and the lexer keeps going. The parser decides
/// whether to proceed over the remaining tokens.
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a new instance of `Lexer`.
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Tokenize the input, returning the tokens and any lexical errors.
    pub fn lex(self) -> (Vec<Token>, Vec<ParseError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut cursor = Cursor::new(self.input);

        while !cursor.is_eof() {
            let line = cursor.line();
            let c = cursor.bump().expect("cursor is not at EOF");

            match c {
                '\n' => tokens.push(Token::new(TokenKind::Newline, String::new(), line)),
                c if is_whitespace(c) => {}
                '/' if cursor.first() == '/' => {
                    cursor.bump();
                    tokens.push(comment(&mut cursor, line));
                }
                c if is_ident_start(c) => tokens.push(ident(&mut cursor, c, line)),
                '[' => match bracket(&mut cursor, line) {
                    Ok(token) => tokens.push(token),
                    Err(e) => errors.push(e),
                },
                '{' => tokens.push(Token::new(TokenKind::LBrace, String::new(), line)),
                '}' => tokens.push(Token::new(TokenKind::RBrace, String::new(), line)),
                '(' => tokens.push(Token::new(TokenKind::LParen, String::new(), line)),
                ')' => tokens.push(Token::new(TokenKind::RParen, String::new(), line)),
                ',' => tokens.push(Token::new(TokenKind::Comma, String::new(), line)),
                c => errors.push(ParseError::new(line, format!("unexpected character: {c}"))),
            }
        }

        (tokens, errors)
    }
}

/// The `//` marker is already consumed. An optional single space after the
/// marker is stripped; the terminating newline belongs to the comment.
fn comment(cursor: &mut Cursor<'_>, line: usize) -> Token {
    cursor.eatc(' ');

    let mut buf = String::new();
    while !cursor.is_eof() && cursor.first() != '\n' {
        buf.push(cursor.bump().expect("cursor is not at EOF"));
    }
    cursor.eatc('\n');

    Token::new(TokenKind::Comment, buf, line)
}

fn ident(cursor: &mut Cursor<'_>, first_char: char, line: usize) -> Token {
    let mut buf = String::new();
    buf.push(first_char);

    while is_ident_char(cursor.first()) {
        buf.push(cursor.bump().expect("cursor is not at EOF"));
    }

    Token::new(TokenKind::Ident, buf, line)
}

/// The `[` is already consumed. `[]` directly followed by an identifier is
/// an array-prefixed identifier (longest match); anything else scans the
/// bracket interior as type options, which may not span lines or contain
/// braces.
fn bracket(cursor: &mut Cursor<'_>, line: usize) -> Result<Token, ParseError> {
    if cursor.first() == ']' && is_ident_start(cursor.second()) {
        cursor.bump();
        let first_char = cursor.bump().expect("peeked an identifier start");
        let token = ident(cursor, first_char, line);
        return Ok(Token::new(TokenKind::ArrayIdent, token.data, line));
    }

    let mut buf = String::new();
    loop {
        match cursor.first() {
            ']' => {
                cursor.bump();
                return Ok(Token::new(TokenKind::TypeOpts, buf, line));
            }
            '{' | '}' | '\n' | EOF_CHAR => {
                return Err(ParseError::new(line, "unterminated type options bracket"));
            }
            _ => buf.push(cursor.bump().expect("cursor is not at EOF")),
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

fn is_ident_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

fn is_ident_char(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}
