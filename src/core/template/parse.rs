//! Template tokenizer.
//!
//! Bodies are literal text with `{{ ... }}` actions. An action is a
//! pipeline of commands separated by `|`; the value of each command is
//! passed as the last argument of the next. `{{-` and `-}}` trim adjacent
//! whitespace.

use crate::error::{Result, TemplateError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Segment {
    Text(String),
    Action(Vec<Command>),
}

/// One command: a function call or a single operand.
pub(super) type Command = Vec<Token>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Token {
    /// `.Name`
    Field(String),
    /// `"quoted"`
    Str(String),
    Int(i64),
    /// Function name.
    Ident(String),
}

pub(super) fn parse(body: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = body;
    let mut trim_next = false;

    while let Some(start) = rest.find("{{") {
        let mut text = &rest[..start];
        if trim_next {
            text = text.trim_start();
        }
        let mut inner = &rest[start + 2..];
        if let Some(stripped) = inner.strip_prefix('-') {
            text = text.trim_end();
            inner = stripped;
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text.to_string()));
        }

        let end = inner
            .find("}}")
            .ok_or_else(|| TemplateError::Parse("unclosed action".into()))?;
        let mut action = &inner[..end];
        trim_next = false;
        if let Some(stripped) = action.strip_suffix('-') {
            action = stripped;
            trim_next = true;
        }
        segments.push(Segment::Action(parse_pipeline(action)?));
        rest = &inner[end + 2..];
    }

    let text = if trim_next { rest.trim_start() } else { rest };
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
    Ok(segments)
}

fn parse_pipeline(action: &str) -> Result<Vec<Command>> {
    let tokens = tokenize(action)?;
    let mut commands = vec![Vec::new()];
    for token in tokens {
        match token {
            Lexeme::Pipe => commands.push(Vec::new()),
            Lexeme::Token(t) => {
                if let Some(last) = commands.last_mut() {
                    last.push(t);
                }
            }
        }
    }
    if commands.iter().any(Vec::is_empty) {
        return Err(TemplateError::Parse(format!("empty command in {{{{{}}}}}", action)).into());
    }
    Ok(commands)
}

enum Lexeme {
    Pipe,
    Token(Token),
}

fn tokenize(action: &str) -> Result<Vec<Lexeme>> {
    let mut out = Vec::new();
    let mut chars = action.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '|' {
            chars.next();
            out.push(Lexeme::Pipe);
        } else if c == '"' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => s.push('\n'),
                        Some('t') => s.push('\t'),
                        Some(other) => s.push(other),
                        None => return Err(TemplateError::Parse("unterminated string".into()).into()),
                    },
                    Some(other) => s.push(other),
                    None => return Err(TemplateError::Parse("unterminated string".into()).into()),
                }
            }
            out.push(Lexeme::Token(Token::Str(s)));
        } else {
            let mut word = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == '|' || c == '"' {
                    break;
                }
                word.push(c);
                chars.next();
            }
            out.push(Lexeme::Token(word_token(&word)?));
        }
    }
    Ok(out)
}

fn word_token(word: &str) -> Result<Token> {
    if let Some(field) = word.strip_prefix('.') {
        if field.is_empty() || !field.chars().all(char::is_alphanumeric) {
            return Err(TemplateError::Parse(format!("bad field {}", word)).into());
        }
        return Ok(Token::Field(field.to_string()));
    }
    if let Ok(n) = word.parse::<i64>() {
        return Ok(Token::Int(n));
    }
    if word.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Ok(Token::Ident(word.to_string()));
    }
    Err(TemplateError::Parse(format!("unexpected {}", word)).into())
}
