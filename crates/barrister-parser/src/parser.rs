//! State-machine parser for Barrister IDL text.
//!
//! The grammar is encoded as transitions over the token stream: every
//! [`State`] corresponds to a syntactic position (after the `struct`
//! keyword, inside a field block, between function parameters, ...) and
//! [`Machine::step`] advances one token at a time. Comment attachment is
//! part of the machine: a buffered `//` block sticks to the next
//! definition unless a blank line at the top level flushes it as a
//! standalone entity.

use crate::checksum;
use crate::idl::Comment;
use crate::idl::Document;
use crate::idl::Entity;
use crate::idl::EnumDef;
use crate::idl::EnumValue;
use crate::idl::Field;
use crate::idl::Function;
use crate::idl::InterfaceDef;
use crate::idl::Param;
use crate::idl::ReturnDef;
use crate::idl::StructDef;
use crate::lexer::Lexer;
use crate::lexer::Token;
use crate::lexer::TokenKind;
use crate::validation;
use crate::IdlErrors;
use crate::ParseError;
use indexmap::IndexSet;

/// Parse IDL text with semantic validation and meta stamping enabled.
pub fn parse(input: &str) -> Result<Document, IdlErrors> {
    Parser::new(input).parse()
}

/// Parse IDL text into a contract [`Document`].
///
/// ## Example
/// ```rust
/// use barrister_parser::Parser;
///
/// let idl = "
/// struct Person {
///     email string
///     age int
/// }
/// ";
/// let doc = Parser::new(idl).parse().unwrap();
/// assert_eq!(doc.structs().count(), 1);
/// ```
pub struct Parser<'a> {
    input: &'a str,
    validate: bool,
    add_meta: bool,
}

impl<'a> Parser<'a> {
    /// Create a new instance of a parser given an input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            validate: true,
            add_meta: true,
        }
    }

    /// Configure whether semantic validation runs after parsing.
    ///
    /// On by default.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Configure whether a `meta` entity (version, timestamp, checksum) is
    /// appended to a successfully parsed document.
    ///
    /// On by default.
    pub fn add_meta(mut self, add_meta: bool) -> Self {
        self.add_meta = add_meta;
        self
    }

    /// Parse the input, returning the document or every error found.
    pub fn parse(self) -> Result<Document, IdlErrors> {
        let (tokens, mut errors) = Lexer::new(self.input).lex();

        let mut machine = Machine::new();
        let mut halted = false;
        for token in &tokens {
            if !machine.step(token) {
                halted = true;
                break;
            }
        }
        if !halted {
            machine.finish();
        }
        errors.extend(machine.errors);

        let mut entities = machine.entities;
        if let Some(ns) = &machine.namespace {
            apply_namespace(&mut entities, ns);
        }

        if self.validate {
            errors.extend(validation::validate(&entities));
        }

        if !errors.is_empty() {
            return Err(IdlErrors::new(errors));
        }

        let mut doc = Document::new(entities);
        if self.add_meta {
            checksum::add_meta(&mut doc);
        }
        Ok(doc)
    }
}

/// One syntactic position in the IDL grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TopLevel,
    /// After the `struct` keyword, expecting the type name.
    StructName,
    EnumName,
    InterfaceName,
    NamespaceName,
    /// After a type name, expecting `extends` or `{`.
    BlockStart,
    /// After `extends`, expecting the parent name or `{`.
    ExtendsName,
    /// Inside a struct block, expecting a field name or `}`.
    Fields,
    /// After a field name, expecting its type on the same line.
    FieldType,
    /// After a field type, expecting `[optional]`, a newline, or `}`.
    FieldOpts,
    /// Inside an enum block, expecting a value or `}`.
    Values,
    /// Inside an interface block, expecting a function name or `}`.
    Functions,
    /// After a function name, expecting `(`.
    FunctionParen,
    /// Expecting a parameter name or `)`.
    Params,
    /// After a parameter name, expecting its type.
    ParamType,
    /// After a parameter type, expecting `,` or `)`.
    ParamNext,
    /// After `)`. A newline here ends a notification (no return type).
    Returns,
    /// After a return type, expecting `[optional]`, a newline, or `}`.
    ReturnOpts,
}

/// The definition under construction.
enum Current {
    Struct(StructDef),
    Enum(EnumDef),
    Interface(InterfaceDef),
}

struct Machine {
    state: State,
    entities: Vec<Entity>,
    errors: Vec<ParseError>,
    /// Names of completed type definitions, for duplicate detection.
    types: IndexSet<String>,
    namespace: Option<String>,
    saw_type: bool,
    /// Pending `//` lines, joined by `\n`.
    comment: Option<String>,
    current: Option<Current>,
    field_name: Option<String>,
    function: Option<Function>,
    param_name: Option<String>,
    /// Line of the most recently consumed token.
    line: usize,
}

impl Machine {
    fn new() -> Self {
        Self {
            state: State::TopLevel,
            entities: Vec::new(),
            errors: Vec::new(),
            types: IndexSet::new(),
            namespace: None,
            saw_type: false,
            comment: None,
            current: None,
            field_name: None,
            function: None,
            param_name: None,
            line: 1,
        }
    }

    /// Advance over one token. Returns `false` to halt: like the original
    /// scanner, parsing stops consuming input at the first syntactic
    /// error, while accumulated checks (duplicates, block minimums,
    /// semantic validation) keep collecting.
    fn step(&mut self, token: &Token) -> bool {
        self.line = token.line();

        match self.state {
            State::TopLevel => self.top_level(token),
            State::StructName => self.type_name(token, |name, comment| {
                Current::Struct(StructDef {
                    name,
                    extends: String::new(),
                    comment,
                    fields: Vec::new(),
                })
            }),
            State::EnumName => self.type_name(token, |name, comment| {
                Current::Enum(EnumDef {
                    name,
                    comment,
                    values: Vec::new(),
                })
            }),
            State::InterfaceName => self.type_name(token, |name, comment| {
                Current::Interface(InterfaceDef {
                    name,
                    comment,
                    functions: Vec::new(),
                })
            }),
            State::NamespaceName => self.namespace_name(token),
            State::BlockStart => self.block_start(token),
            State::ExtendsName => self.extends_name(token),
            State::Fields => self.fields(token),
            State::FieldType => self.field_type(token),
            State::FieldOpts => self.field_opts(token),
            State::Values => self.values(token),
            State::Functions => self.functions(token),
            State::FunctionParen => self.function_paren(token),
            State::Params => self.params(token),
            State::ParamType => self.param_type(token),
            State::ParamNext => self.param_next(token),
            State::Returns => self.returns(token),
            State::ReturnOpts => self.return_opts(token),
        }
    }

    /// EOF while a definition is still open.
    fn finish(&mut self) {
        if self.current.is_some() || self.function.is_some() {
            self.errors
                .push(ParseError::new(self.line, "Unexpected end of file"));
        }
    }

    fn top_level(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Newline => {
                self.flush_comment_block();
                true
            }
            TokenKind::Comment => {
                self.buffer_comment(token.data());
                true
            }
            TokenKind::Ident => match token.data() {
                "struct" => {
                    self.state = State::StructName;
                    true
                }
                "enum" => {
                    self.state = State::EnumName;
                    true
                }
                "interface" => {
                    self.state = State::InterfaceName;
                    true
                }
                "namespace" => {
                    self.state = State::NamespaceName;
                    true
                }
                _ => self.syntax_error(format!(
                    "expected 'struct', 'enum', 'interface' or 'namespace', found {}",
                    describe(token)
                )),
            },
            _ => self.syntax_error(format!(
                "expected 'struct', 'enum', 'interface' or 'namespace', found {}",
                describe(token)
            )),
        }
    }

    fn type_name(
        &mut self,
        token: &Token,
        make: impl FnOnce(String, String) -> Current,
    ) -> bool {
        match token.kind() {
            TokenKind::Ident => {
                let name = token.data().to_string();
                if self.types.contains(&name) {
                    self.errors.push(ParseError::new(
                        token.line(),
                        format!("type {name} already defined"),
                    ));
                }
                let comment = self.take_comment();
                let current = make(name, comment);
                if matches!(current, Current::Interface(_)) && self.namespace.is_some() {
                    self.errors.push(ParseError::new(
                        token.line(),
                        "namespace cannot be used in a file containing interfaces",
                    ));
                }
                self.saw_type = true;
                self.current = Some(current);
                self.state = State::BlockStart;
                true
            }
            TokenKind::Newline => true,
            _ => self.syntax_error("Missing identifier"),
        }
    }

    fn namespace_name(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => {
                if self.namespace.is_some() {
                    self.errors
                        .push(ParseError::new(token.line(), "namespace already defined"));
                } else if self.saw_type {
                    self.errors.push(ParseError::new(
                        token.line(),
                        "namespace must be defined before any types",
                    ));
                } else {
                    self.namespace = Some(token.data().to_string());
                }
                self.state = State::TopLevel;
                true
            }
            TokenKind::Newline => true,
            _ => self.syntax_error("Missing identifier"),
        }
    }

    fn block_start(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident if token.data() == "extends" => {
                if !matches!(self.current, Some(Current::Struct(_))) {
                    self.errors.push(ParseError::new(
                        token.line(),
                        "extends is only supported for struct types",
                    ));
                }
                self.state = State::ExtendsName;
                true
            }
            TokenKind::LBrace => self.open_block(),
            TokenKind::Newline => true,
            _ => self.syntax_error(format!("expected '{{', found {}", describe(token))),
        }
    }

    fn extends_name(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => {
                if let Some(Current::Struct(s)) = &mut self.current {
                    s.extends = token.data().to_string();
                }
                true
            }
            TokenKind::LBrace => self.open_block(),
            TokenKind::Newline => true,
            _ => self.syntax_error(format!(
                "expected a struct name, found {}",
                describe(token)
            )),
        }
    }

    fn open_block(&mut self) -> bool {
        self.state = match self.current {
            Some(Current::Struct(_)) => State::Fields,
            Some(Current::Enum(_)) => State::Values,
            Some(Current::Interface(_)) => State::Functions,
            None => return self.syntax_error("unexpected '{'"),
        };
        true
    }

    fn fields(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => {
                self.field_name = Some(token.data().to_string());
                self.state = State::FieldType;
                true
            }
            TokenKind::Comment => {
                self.buffer_comment(token.data());
                true
            }
            TokenKind::Newline => true,
            TokenKind::RBrace => self.close_block(),
            _ => self.syntax_error(format!("expected a field name, found {}", describe(token))),
        }
    }

    fn field_type(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => self.end_field(token, false),
            TokenKind::ArrayIdent => self.end_field(token, true),
            _ => self.syntax_error(format!("expected a field type, found {}", describe(token))),
        }
    }

    fn end_field(&mut self, token: &Token, is_array: bool) -> bool {
        let name = self.field_name.take().unwrap_or_default();
        let comment = self.take_comment();
        if let Some(Current::Struct(s)) = &mut self.current {
            s.fields.push(Field {
                name,
                ty: token.data().to_string(),
                is_array,
                optional: false,
                comment,
            });
        }
        self.state = State::FieldOpts;
        true
    }

    fn field_opts(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::TypeOpts => {
                self.apply_field_opts(token);
                self.state = State::Fields;
                true
            }
            TokenKind::Newline => {
                self.state = State::Fields;
                true
            }
            TokenKind::RBrace => self.close_block(),
            TokenKind::Ident | TokenKind::ArrayIdent => {
                self.syntax_error("fields must be declared on separate lines")
            }
            _ => self.syntax_error(format!(
                "expected type options or a newline, found {}",
                describe(token)
            )),
        }
    }

    fn values(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => {
                let comment = self.take_comment();
                if let Some(Current::Enum(e)) = &mut self.current {
                    // duplicates are silently dropped, first appearance wins
                    if !e.values.iter().any(|v| v.value == token.data()) {
                        e.values.push(EnumValue {
                            value: token.data().to_string(),
                            comment,
                        });
                    }
                }
                true
            }
            TokenKind::Comment => {
                self.buffer_comment(token.data());
                true
            }
            TokenKind::Newline => true,
            TokenKind::RBrace => self.close_block(),
            _ => self.syntax_error(format!(
                "expected an enum value, found {}",
                describe(token)
            )),
        }
    }

    fn functions(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => {
                let comment = self.take_comment();
                self.function = Some(Function {
                    name: token.data().to_string(),
                    comment,
                    params: Vec::new(),
                    returns: None,
                });
                self.state = State::FunctionParen;
                true
            }
            TokenKind::Comment => {
                self.buffer_comment(token.data());
                true
            }
            TokenKind::Newline => true,
            TokenKind::RBrace => self.close_block(),
            _ => self.syntax_error(format!(
                "expected a function name, found {}",
                describe(token)
            )),
        }
    }

    fn function_paren(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::LParen => {
                self.state = State::Params;
                true
            }
            _ => self.syntax_error(format!("expected '(', found {}", describe(token))),
        }
    }

    fn params(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => {
                self.param_name = Some(token.data().to_string());
                self.state = State::ParamType;
                true
            }
            TokenKind::RParen => {
                self.state = State::Returns;
                true
            }
            TokenKind::Newline => true,
            _ => self.syntax_error(format!(
                "expected a parameter name or ')', found {}",
                describe(token)
            )),
        }
    }

    fn param_type(&mut self, token: &Token) -> bool {
        let is_array = match token.kind() {
            TokenKind::Ident => false,
            TokenKind::ArrayIdent => true,
            TokenKind::Newline => return true,
            _ => {
                return self.syntax_error(format!(
                    "expected a parameter type, found {}",
                    describe(token)
                ))
            }
        };
        let name = self.param_name.take().unwrap_or_default();
        if let Some(f) = &mut self.function {
            f.params.push(Param {
                name,
                ty: token.data().to_string(),
                is_array,
            });
        }
        self.state = State::ParamNext;
        true
    }

    fn param_next(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Comma => {
                self.state = State::Params;
                true
            }
            TokenKind::RParen => {
                self.state = State::Returns;
                true
            }
            TokenKind::Newline => true,
            _ => self.syntax_error(format!("expected ',' or ')', found {}", describe(token))),
        }
    }

    fn returns(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::Ident => self.end_return(token, false),
            TokenKind::ArrayIdent => self.end_return(token, true),
            TokenKind::Newline => {
                // no declared return type: a notification
                self.finish_function();
                self.state = State::Functions;
                true
            }
            TokenKind::RBrace => {
                self.finish_function();
                self.close_block()
            }
            _ => self.syntax_error(format!(
                "expected a return type, found {}",
                describe(token)
            )),
        }
    }

    fn end_return(&mut self, token: &Token, is_array: bool) -> bool {
        if let Some(f) = &mut self.function {
            f.returns = Some(ReturnDef {
                ty: token.data().to_string(),
                is_array,
                optional: false,
            });
        }
        self.finish_function();
        self.state = State::ReturnOpts;
        true
    }

    fn return_opts(&mut self, token: &Token) -> bool {
        match token.kind() {
            TokenKind::TypeOpts => {
                self.apply_return_opts(token);
                self.state = State::Functions;
                true
            }
            TokenKind::Newline => {
                self.state = State::Functions;
                true
            }
            TokenKind::RBrace => self.close_block(),
            _ => self.syntax_error(format!(
                "expected type options or a newline, found {}",
                describe(token)
            )),
        }
    }

    fn finish_function(&mut self) {
        if let (Some(f), Some(Current::Interface(i))) = (self.function.take(), &mut self.current) {
            i.functions.push(f);
        }
    }

    fn apply_field_opts(&mut self, token: &Token) {
        match parse_type_opts(token.data()) {
            Some(true) => {
                if let Some(Current::Struct(s)) = &mut self.current {
                    if let Some(field) = s.fields.last_mut() {
                        field.optional = true;
                    }
                }
            }
            Some(false) => {}
            None => self.invalid_type_option(token),
        }
    }

    fn apply_return_opts(&mut self, token: &Token) {
        match parse_type_opts(token.data()) {
            Some(true) => {
                if let Some(Current::Interface(i)) = &mut self.current {
                    if let Some(returns) =
                        i.functions.last_mut().and_then(|f| f.returns.as_mut())
                    {
                        returns.optional = true;
                    }
                }
            }
            Some(false) => {}
            None => self.invalid_type_option(token),
        }
    }

    fn invalid_type_option(&mut self, token: &Token) {
        self.errors.push(ParseError::new(
            token.line(),
            format!("Invalid type option: {}", token.data().trim()),
        ));
    }

    fn close_block(&mut self) -> bool {
        let Some(current) = self.current.take() else {
            return self.syntax_error("unexpected '}'");
        };

        let (entity, name, missing) = match current {
            Current::Struct(s) => {
                if s.fields.is_empty() {
                    (None, s.name, "field")
                } else {
                    let name = s.name.clone();
                    (Some(Entity::Struct(s)), name, "")
                }
            }
            Current::Enum(e) => {
                if e.values.is_empty() {
                    (None, e.name, "value")
                } else {
                    let name = e.name.clone();
                    (Some(Entity::Enum(e)), name, "")
                }
            }
            Current::Interface(i) => {
                if i.functions.is_empty() {
                    (None, i.name, "function")
                } else {
                    let name = i.name.clone();
                    (Some(Entity::Interface(i)), name, "")
                }
            }
        };

        match entity {
            Some(entity) => {
                self.types.insert(name);
                self.entities.push(entity);
            }
            None => self.errors.push(ParseError::new(
                self.line,
                format!("{name} must have at least one {missing}"),
            )),
        }

        self.state = State::TopLevel;
        true
    }

    fn buffer_comment(&mut self, text: &str) {
        match &mut self.comment {
            Some(buf) => {
                buf.push('\n');
                buf.push_str(text);
            }
            None => self.comment = Some(text.to_string()),
        }
    }

    fn take_comment(&mut self) -> String {
        self.comment.take().unwrap_or_default()
    }

    /// A blank line at the top level turns a pending comment block into a
    /// standalone entity instead of attaching it to the next definition.
    fn flush_comment_block(&mut self) {
        if let Some(value) = self.comment.take() {
            self.entities.push(Entity::Comment(Comment { value }));
        }
    }

    fn syntax_error(&mut self, message: impl Into<String>) -> bool {
        self.errors.push(ParseError::new(self.line, message));
        false
    }
}

/// `Some(true)` when the bracket holds `optional`, `Some(false)` when it is
/// empty, `None` when the option is unknown.
fn parse_type_opts(text: &str) -> Option<bool> {
    match text.trim() {
        "optional" => Some(true),
        "" => Some(false),
        _ => None,
    }
}

/// Prepend `<ns>.` to every defined type name and to every reference that
/// resolves to a type defined in this file.
fn apply_namespace(entities: &mut [Entity], ns: &str) {
    let defined: IndexSet<String> = entities
        .iter()
        .filter_map(|e| e.name().map(str::to_string))
        .collect();
    let qualify = |name: &mut String| {
        if defined.contains(name.as_str()) {
            *name = format!("{ns}.{name}");
        }
    };

    for entity in entities.iter_mut() {
        match entity {
            Entity::Struct(s) => {
                s.name = format!("{ns}.{}", s.name);
                if !s.extends.is_empty() {
                    qualify(&mut s.extends);
                }
                for field in &mut s.fields {
                    qualify(&mut field.ty);
                }
            }
            Entity::Enum(e) => e.name = format!("{ns}.{}", e.name),
            Entity::Interface(i) => {
                i.name = format!("{ns}.{}", i.name);
                for f in &mut i.functions {
                    for p in &mut f.params {
                        qualify(&mut p.ty);
                    }
                    if let Some(r) = &mut f.returns {
                        qualify(&mut r.ty);
                    }
                }
            }
            Entity::Comment(_) | Entity::Meta(_) => {}
        }
    }
}

fn describe(token: &Token) -> String {
    match token.kind() {
        TokenKind::Ident | TokenKind::ArrayIdent => format!("'{}'", token.data()),
        TokenKind::TypeOpts => format!("'[{}]'", token.data()),
        TokenKind::Comment => "a comment".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Newline => "end of line".to_string(),
    }
}
