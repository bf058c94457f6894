//! Textual grammar for [`TypeHint`]
//!
//! ```text
//! hint      := primary ('|' primary)*
//! primary   := NAME ['[' args ']'] | NAME '(' kwargs ')'
//! args      := arg (',' arg)*
//! arg       := hint | literal | '...' | NAME ':' hint | NAME '=' literal
//! literal   := 'text' | "text" | number | True | False | None
//! ```
//!
//! Examples: `list[int]`, `Optional[str]`, `tuple[int, ...]`, `Literal['a', 'b']`,
//! `Annotated[int, gt=0]`, `conint(ge=1, le=10)`, `Enum[Color, 'red', 'green']`,
//! `NamedTuple[Point, x: int, y: int]`, `int | None`.

use serde_json::Value;
use thiserror::Error;

use super::extra::ExtraType;
use super::hint::{CollectionKind, EnumType, Metadata, Numeric, PathKind, TypeHint};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type '{input}' at offset {offset}: {reason}")]
pub struct HintParseError {
    pub input: String,
    pub offset: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Number(Numeric),
    Open(char),
    Close(char),
    Comma,
    Colon,
    Equals,
    Pipe,
    Ellipsis,
}

struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
        }
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.input.len())
    }

    fn error(&self, offset: usize, reason: impl Into<String>) -> HintParseError {
        HintParseError {
            input: self.input.to_string(),
            offset,
            reason: reason.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<(usize, Token)>, HintParseError> {
        let mut tokens = Vec::new();
        while let Some(&(offset, c)) = self.chars.get(self.pos) {
            let token = match c {
                c if c.is_whitespace() => {
                    self.pos += 1;
                    continue;
                }
                '[' | '(' => {
                    self.pos += 1;
                    Token::Open(c)
                }
                ']' | ')' => {
                    self.pos += 1;
                    Token::Close(c)
                }
                ',' => {
                    self.pos += 1;
                    Token::Comma
                }
                ':' => {
                    self.pos += 1;
                    Token::Colon
                }
                '=' => {
                    self.pos += 1;
                    Token::Equals
                }
                '|' => {
                    self.pos += 1;
                    Token::Pipe
                }
                '.' => {
                    if self.input[offset..].starts_with("...") {
                        self.pos += 3;
                        Token::Ellipsis
                    } else {
                        self.number()?
                    }
                }
                '\'' | '"' => self.string(c)?,
                c if c.is_ascii_digit() || c == '-' || c == '+' => self.number()?,
                c if c.is_alphabetic() || c == '_' => {
                    let start = self.pos;
                    while matches!(self.chars.get(self.pos), Some((_, c)) if c.is_alphanumeric() || *c == '_' || *c == '.')
                    {
                        self.pos += 1;
                    }
                    Token::Name(self.chars[start..self.pos].iter().map(|(_, c)| c).collect())
                }
                other => return Err(self.error(offset, format!("unexpected character {other:?}"))),
            };
            tokens.push((offset, token));
        }
        Ok(tokens)
    }

    fn string(&mut self, quote: char) -> Result<Token, HintParseError> {
        let start = self.offset();
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.chars.get(self.pos) {
                None => return Err(self.error(start, "unterminated string")),
                Some((_, '\\')) => {
                    if let Some((_, escaped)) = self.chars.get(self.pos + 1) {
                        text.push(*escaped);
                    }
                    self.pos += 2;
                }
                Some((_, c)) if *c == quote => {
                    self.pos += 1;
                    return Ok(Token::Str(text));
                }
                Some((_, c)) => {
                    text.push(*c);
                    self.pos += 1;
                }
            }
        }
    }

    fn number(&mut self) -> Result<Token, HintParseError> {
        let start = self.pos;
        let offset = self.offset();
        self.pos += 1;
        while matches!(self.chars.get(self.pos), Some((_, c)) if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_'))
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .map(|(_, c)| *c)
            .filter(|c| *c != '_')
            .collect();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Token::Number(Numeric::Int(i)));
        }
        text.parse::<f64>()
            .map(|f| Token::Number(Numeric::Float(f)))
            .map_err(|_| self.error(offset, format!("invalid number {text:?}")))
    }
}

/// One argument inside `[...]` or `(...)`
enum Arg {
    Hint(TypeHint),
    Literal(Value),
    Ellipsis,
    Field(String, TypeHint),
    Keyword(String, Value),
    /// A bare lowercase word inside `Annotated[...]`, e.g. `file` or `counter`
    Marker(String),
}

struct Parser {
    input: String,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn error(&self, reason: impl Into<String>) -> HintParseError {
        let offset = self
            .tokens
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.input.len());
        HintParseError {
            input: self.input.clone(),
            offset,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn peek_at(&self, ahead: usize) -> Option<Token> {
        self.tokens.get(self.pos + ahead).map(|(_, token)| token.clone())
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, token)| token.clone());
        self.pos += 1;
        token
    }

    fn hint(&mut self) -> Result<TypeHint, HintParseError> {
        let first = self.primary()?;
        if self.peek() != Some(&Token::Pipe) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.peek() == Some(&Token::Pipe) {
            self.pos += 1;
            members.push(self.primary()?);
        }
        Ok(TypeHint::Union(members))
    }

    fn primary(&mut self) -> Result<TypeHint, HintParseError> {
        let name = match self.next() {
            Some(Token::Name(name)) => name,
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error("expected a type name"));
            }
        };
        let name = name.rsplit('.').next().unwrap_or(&name).to_string();
        match self.peek() {
            Some(Token::Open('[')) if name == "Enum" || name == "NamedTuple" => {
                self.pos += 1;
                self.declared(&name)
            }
            Some(Token::Open('[')) if name == "Annotated" => {
                self.pos += 1;
                self.annotated()
            }
            Some(Token::Open('[')) => {
                self.pos += 1;
                let args = self.args(']')?;
                self.generic(&name, args)
            }
            Some(Token::Open('(')) => {
                self.pos += 1;
                let args = self.args(')')?;
                self.constrained(&name, args)
            }
            _ => self.bare(&name),
        }
    }

    fn args(&mut self, close: char) -> Result<Vec<Arg>, HintParseError> {
        let mut args = Vec::new();
        loop {
            if self.peek() == Some(&Token::Close(close)) {
                self.pos += 1;
                return Ok(args);
            }
            args.push(self.arg()?);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close(c)) if c == close => return Ok(args),
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.error(format!("expected ',' or '{close}'")));
                }
            }
        }
    }

    fn arg(&mut self) -> Result<Arg, HintParseError> {
        match (self.peek().cloned(), self.peek_at(1)) {
            (Some(Token::Ellipsis), _) => {
                self.pos += 1;
                Ok(Arg::Ellipsis)
            }
            (Some(Token::Str(s)), _) => {
                self.pos += 1;
                Ok(Arg::Literal(Value::String(s)))
            }
            (Some(Token::Number(n)), _) => {
                self.pos += 1;
                Ok(Arg::Literal(n.to_value()))
            }
            (Some(Token::Name(name)), Some(Token::Colon)) => {
                self.pos += 2;
                Ok(Arg::Field(name, self.hint()?))
            }
            (Some(Token::Name(name)), Some(Token::Equals)) => {
                self.pos += 2;
                let value = self.literal()?;
                Ok(Arg::Keyword(name, value))
            }
            (Some(Token::Name(name)), _) if name == "True" || name == "False" => {
                self.pos += 1;
                Ok(Arg::Literal(Value::Bool(name == "True")))
            }
            _ => Ok(Arg::Hint(self.hint()?)),
        }
    }

    fn literal(&mut self) -> Result<Value, HintParseError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Number(n)) => Ok(n.to_value()),
            Some(Token::Name(name)) if name == "True" => Ok(Value::Bool(true)),
            Some(Token::Name(name)) if name == "False" => Ok(Value::Bool(false)),
            Some(Token::Name(name)) if name == "None" => Ok(Value::Null),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("expected a literal value"))
            }
        }
    }

    fn bare(&self, name: &str) -> Result<TypeHint, HintParseError> {
        let hint = match name {
            "Any" | "object" => TypeHint::Any,
            "None" | "NoneType" => TypeHint::None,
            "str" | "String" => TypeHint::Str,
            "int" => TypeHint::Int,
            "float" => TypeHint::Float,
            "Decimal" | "decimal" => TypeHint::Decimal,
            "bool" => TypeHint::Bool,
            "UUID" | "uuid" => TypeHint::Uuid,
            "Path" | "path" => TypeHint::Path,
            "date" => TypeHint::Date,
            "time" => TypeHint::Time,
            "datetime" => TypeHint::DateTime,
            "timedelta" => TypeHint::TimeDelta,
            "Context" => TypeHint::Context,
            "PositiveInt" => TypeHint::positive_int(),
            "NegativeInt" => TypeHint::negative_int(),
            "NonNegativeInt" => TypeHint::non_negative_int(),
            "NonPositiveInt" => TypeHint::non_positive_int(),
            "PositiveFloat" => TypeHint::positive_float(),
            "NegativeFloat" => TypeHint::negative_float(),
            "NonNegativeFloat" => TypeHint::non_negative_float(),
            "NonPositiveFloat" => TypeHint::non_positive_float(),
            "FilePath" => TypeHint::file_path(),
            "DirectoryPath" => TypeHint::directory_path(),
            "NewPath" => TypeHint::new_path(),
            "PastDate" => TypeHint::past_date(),
            "FutureDate" => TypeHint::future_date(),
            "PastDatetime" => TypeHint::past_datetime(),
            "FutureDatetime" => TypeHint::future_datetime(),
            "Counter" => TypeHint::counter(),
            other => match collection_kind(other) {
                Some(kind) => TypeHint::Collection(kind, None),
                None => match ExtraType::from_name(other) {
                    Some(extra) => TypeHint::Extra(extra),
                    None => return Err(self.error(format!("unknown type {other:?}"))),
                },
            },
        };
        Ok(hint)
    }

    fn generic(&self, name: &str, args: Vec<Arg>) -> Result<TypeHint, HintParseError> {
        match name {
            "Optional" => match one_hint(args) {
                Some(inner) => Ok(TypeHint::optional(inner)),
                None => Err(self.error("Optional takes exactly one type")),
            },
            "Union" => {
                let members = all_hints(args).ok_or_else(|| self.error("Union takes types only"))?;
                if members.is_empty() {
                    return Err(self.error("Union needs at least one member"));
                }
                Ok(TypeHint::Union(members))
            }
            "Literal" => {
                let mut values = Vec::new();
                for arg in args {
                    match arg {
                        Arg::Literal(value) => values.push(value),
                        Arg::Hint(TypeHint::None) => values.push(Value::Null),
                        _ => return Err(self.error("Literal takes literal values only")),
                    }
                }
                Ok(TypeHint::Literal(values))
            }
            "tuple" | "Tuple" => {
                if matches!(args.as_slice(), [Arg::Hint(_), Arg::Ellipsis]) {
                    return match args.into_iter().next() {
                        Some(Arg::Hint(element)) => Ok(TypeHint::var_tuple(element)),
                        _ => Err(self.error("malformed tuple")),
                    };
                }
                all_hints(args)
                    .map(TypeHint::Tuple)
                    .ok_or_else(|| self.error("tuple takes types only"))
            }
            other => match collection_kind(other) {
                Some(kind) => match one_hint(args) {
                    Some(element) => Ok(TypeHint::Collection(kind, Some(Box::new(element)))),
                    None => Err(self.error(format!("{other} takes exactly one type"))),
                },
                None => Err(self.error(format!("{other:?} is not a generic type"))),
            },
        }
    }

    /// `Enum[Name, values...]` or `NamedTuple[Name, field: hint, ...]`
    fn declared(&mut self, kind: &str) -> Result<TypeHint, HintParseError> {
        let name = match self.next() {
            Some(Token::Name(name)) => name,
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error(format!("{kind} takes a name first")));
            }
        };
        let args = match self.next() {
            Some(Token::Comma) => self.args(']')?,
            Some(Token::Close(']')) => Vec::new(),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                return Err(self.error("expected ',' or ']'"));
            }
        };
        if kind == "Enum" {
            let mut values = Vec::new();
            for arg in args {
                match arg {
                    Arg::Literal(value) => values.push(value),
                    _ => return Err(self.error("Enum takes literal values only")),
                }
            }
            return Ok(TypeHint::Enum(EnumType::from_values(name, values)));
        }
        let mut fields = Vec::new();
        for arg in args {
            match arg {
                Arg::Field(field, hint) => fields.push((field, hint)),
                _ => return Err(self.error("NamedTuple fields are written 'name: type'")),
            }
        }
        Ok(TypeHint::named_tuple(name, fields))
    }

    fn annotated(&mut self) -> Result<TypeHint, HintParseError> {
        let inner = self.hint()?;
        let mut metadata = Vec::new();
        loop {
            match self.next() {
                Some(Token::Close(']')) => break,
                Some(Token::Comma) => {}
                _ => {
                    self.pos = self.pos.saturating_sub(1);
                    return Err(self.error("expected ',' or ']'"));
                }
            }
            let arg = match (self.peek().cloned(), self.peek_at(1)) {
                (Some(Token::Name(name)), Some(Token::Comma | Token::Close(']'))) => {
                    self.pos += 1;
                    Arg::Marker(name)
                }
                _ => self.arg()?,
            };
            metadata.push(self.metadata(arg)?);
        }
        Ok(TypeHint::annotated(inner, metadata))
    }

    fn metadata(&self, arg: Arg) -> Result<Metadata, HintParseError> {
        match arg {
            Arg::Keyword(key, value) => self.keyword_metadata(&key, value),
            Arg::Marker(name) => match name.as_str() {
                "file" => Ok(Metadata::Path(PathKind::File)),
                "dir" => Ok(Metadata::Path(PathKind::Directory)),
                "new" => Ok(Metadata::Path(PathKind::New)),
                "past" => Ok(Metadata::Past),
                "future" => Ok(Metadata::Future),
                "counter" => Ok(Metadata::Counter),
                other => Err(self.error(format!("unknown marker {other:?}"))),
            },
            Arg::Hint(_) | Arg::Literal(_) | Arg::Ellipsis | Arg::Field(..) => {
                Err(self.error("expected constraint metadata"))
            }
        }
    }

    fn keyword_metadata(&self, key: &str, value: Value) -> Result<Metadata, HintParseError> {
        let numeric = |value: &Value| -> Option<Numeric> {
            value
                .as_i64()
                .map(Numeric::Int)
                .or_else(|| value.as_f64().map(Numeric::Float))
        };
        let length = |value: &Value| value.as_u64().map(|n| n as usize);
        let metadata = match key {
            "gt" => numeric(&value).map(Metadata::Gt),
            "ge" => numeric(&value).map(Metadata::Ge),
            "lt" => numeric(&value).map(Metadata::Lt),
            "le" => numeric(&value).map(Metadata::Le),
            "multiple_of" => numeric(&value).map(Metadata::MultipleOf),
            "min_length" => length(&value).map(Metadata::MinLength),
            "max_length" => length(&value).map(Metadata::MaxLength),
            "pattern" => value.as_str().map(|p| Metadata::Pattern(p.to_string())),
            _ => return Err(self.error(format!("unknown constraint {key:?}"))),
        };
        metadata.ok_or_else(|| self.error(format!("invalid value for {key:?}")))
    }

    fn constrained(&self, name: &str, args: Vec<Arg>) -> Result<TypeHint, HintParseError> {
        let base = match name {
            "conint" | "concounter" => TypeHint::Int,
            "confloat" => TypeHint::Float,
            "constr" => TypeHint::Str,
            other => return Err(self.error(format!("{other:?} does not take constraints"))),
        };
        let mut metadata = Vec::new();
        for arg in args {
            match arg {
                Arg::Keyword(key, value) => metadata.push(self.keyword_metadata(&key, value)?),
                _ => return Err(self.error("constraints must be keyword arguments")),
            }
        }
        if name == "concounter" {
            metadata.push(Metadata::Counter);
        }
        Ok(TypeHint::annotated(base, metadata))
    }
}

fn collection_kind(name: &str) -> Option<CollectionKind> {
    match name {
        "list" | "List" | "Sequence" | "Iterable" => Some(CollectionKind::List),
        "set" | "Set" => Some(CollectionKind::Set),
        "frozenset" | "FrozenSet" => Some(CollectionKind::FrozenSet),
        "deque" | "Deque" => Some(CollectionKind::Deque),
        "tuple" | "Tuple" => Some(CollectionKind::VarTuple),
        _ => None,
    }
}

fn one_hint(args: Vec<Arg>) -> Option<TypeHint> {
    let mut hints = all_hints(args)?;
    if hints.len() == 1 {
        hints.pop()
    } else {
        None
    }
}

fn all_hints(args: Vec<Arg>) -> Option<Vec<TypeHint>> {
    args.into_iter()
        .map(|arg| match arg {
            Arg::Hint(hint) => Some(hint),
            _ => None,
        })
        .collect()
}

/// Parse the textual form of a type annotation
pub fn parse_hint(input: &str) -> Result<TypeHint, HintParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        input: input.to_string(),
        tokens,
        pos: 0,
    };
    let hint = parser.hint()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(hint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> TypeHint {
        parse_hint(text).unwrap()
    }

    #[test]
    fn test_scalars_and_aliases() {
        assert_eq!(parse("int"), TypeHint::Int);
        assert_eq!(parse("pathlib.Path"), TypeHint::Path);
        assert_eq!(parse("PositiveInt"), TypeHint::positive_int());
        assert_eq!(parse("FilePath"), TypeHint::file_path());
        assert_eq!(parse("Counter"), TypeHint::counter());
        assert_eq!(parse("Color"), TypeHint::Extra(ExtraType::Color));
    }

    #[test]
    fn test_generics() {
        assert_eq!(parse("list[int]"), TypeHint::list(TypeHint::Int));
        assert_eq!(parse("Optional[str]"), TypeHint::optional(TypeHint::Str));
        assert_eq!(parse("str | None"), TypeHint::optional(TypeHint::Str));
        assert_eq!(parse("tuple[float, ...]"), TypeHint::var_tuple(TypeHint::Float));
        assert_eq!(
            parse("Tuple[int, str]"),
            TypeHint::tuple([TypeHint::Int, TypeHint::Str])
        );
        assert_eq!(
            parse("Literal['a', 2, True]"),
            TypeHint::Literal(vec![json!("a"), json!(2), json!(true)])
        );
        assert_eq!(
            parse("set"),
            TypeHint::Collection(CollectionKind::Set, None)
        );
    }

    #[test]
    fn test_annotated_and_constrained() {
        assert_eq!(
            parse("Annotated[int, gt=0, multiple_of=2]"),
            TypeHint::annotated(
                TypeHint::Int,
                [Metadata::Gt(Numeric::Int(0)), Metadata::MultipleOf(Numeric::Int(2))]
            )
        );
        assert_eq!(
            parse("Annotated[Path, dir]"),
            TypeHint::directory_path()
        );
        assert_eq!(
            parse("constr(min_length=10)"),
            TypeHint::annotated(TypeHint::Str, [Metadata::MinLength(10)])
        );
        assert!(parse("concounter(le=3)").is_counter());
        assert_eq!(
            parse("confloat(ge=-1.5)"),
            TypeHint::annotated(TypeHint::Float, [Metadata::Ge(Numeric::Float(-1.5))])
        );
    }

    #[test]
    fn test_declared_types() {
        let hint = parse("Enum[Mode, 'fast', 'slow']");
        let TypeHint::Enum(e) = hint else {
            panic!("expected enum");
        };
        assert_eq!(e.name, "Mode");
        assert_eq!(e.values().cloned().collect::<Vec<_>>(), vec![json!("fast"), json!("slow")]);

        assert_eq!(
            parse("NamedTuple[Point, x: int, y: int]"),
            TypeHint::named_tuple("Point", [("x", TypeHint::Int), ("y", TypeHint::Int)])
        );
    }

    #[test]
    fn test_display_round_trip() {
        for text in [
            "list[int]",
            "Optional[str]",
            "tuple[float, ...]",
            "Literal['a', 'b']",
            "Annotated[int, gt=0]",
            "Union[int, str]",
            "NamedTuple[Point, x: int, y: int]",
        ] {
            assert_eq!(parse(text).to_string(), text);
        }
    }

    #[test]
    fn test_errors() {
        assert!(parse_hint("Nope").is_err());
        assert!(parse_hint("list[int").is_err());
        assert!(parse_hint("Optional[int, str]").is_err());
        assert!(parse_hint("int str").is_err());
        let err = parse_hint("conint(foo=1)").unwrap_err();
        assert!(err.to_string().contains("unknown constraint"));
    }
}
