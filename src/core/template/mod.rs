//! Template evaluation.
//!
//! A template turns the content supplied for a new secret (usually a
//! generated password) into the full secret body. Fields: `.Content`,
//! `.Name` (last path segment), `.Path` (full name), `.Dir` (parent, `.` at
//! the top). Functions: `md5sum`, `sha1sum`, `md5crypt`, `ssha`, `ssha256`,
//! `ssha512`, `get`, `getpw`, `getval`.
//!
//! `get`-style functions read other secrets. A secret read this way that
//! itself contains template actions is evaluated too; a name that is
//! already being evaluated fails with `TemplateError::Recursion`.

mod funcs;
mod parse;

use tracing::debug;

use crate::core::context::Context;
use crate::core::root::RootStore;
use crate::core::secret::Secret;
use crate::error::{Result, TemplateError};

use parse::{Segment, Token};

/// Nesting limit for secrets resolved from templates.
const MAX_DEPTH: usize = 16;

/// Source of secrets for `get`, `getpw` and `getval`.
pub trait Resolver {
    fn resolve(&self, ctx: &Context, name: &str) -> Result<Secret>;
}

impl Resolver for RootStore {
    fn resolve(&self, ctx: &Context, name: &str) -> Result<Secret> {
        self.get(ctx, name)
    }
}

/// Render `body` for the secret `name` with `content` as `.Content`.
///
/// # Errors
///
/// Returns `TemplateError::Parse` for malformed actions,
/// `TemplateError::UnknownFunction` for unknown calls and
/// `TemplateError::Recursion` when secret lookups form a cycle.
pub fn render(
    ctx: &Context,
    body: &str,
    name: &str,
    content: &str,
    resolver: Option<&dyn Resolver>,
) -> Result<String> {
    let eval = Evaluator { ctx, resolver };
    let mut stack = vec![name.to_string()];
    eval.render(body, name, content, &mut stack)
}

/// Render the template that applies to `name`, if any.
///
/// Returns the rendered secret body, or `None` when no template matches.
pub fn apply(ctx: &Context, root: &RootStore, name: &str, content: &str) -> Result<Option<String>> {
    match root.lookup_template(ctx, name)? {
        Some((template, body)) => {
            debug!(template = %template, secret = name, "applying template");
            let body = String::from_utf8_lossy(&body);
            render(ctx, &body, name, content, Some(root)).map(Some)
        }
        None => Ok(None),
    }
}

struct Evaluator<'a> {
    ctx: &'a Context,
    resolver: Option<&'a dyn Resolver>,
}

impl Evaluator<'_> {
    fn render(&self, body: &str, name: &str, content: &str, stack: &mut Vec<String>) -> Result<String> {
        let mut out = String::with_capacity(body.len());
        for segment in parse::parse(body)? {
            match segment {
                Segment::Text(t) => out.push_str(&t),
                Segment::Action(pipeline) => {
                    let mut value: Option<String> = None;
                    for command in &pipeline {
                        value = Some(self.command(command, value, name, content, stack)?);
                    }
                    out.push_str(&value.unwrap_or_default());
                }
            }
        }
        Ok(out)
    }

    fn command(
        &self,
        command: &[Token],
        piped: Option<String>,
        name: &str,
        content: &str,
        stack: &mut Vec<String>,
    ) -> Result<String> {
        let (head, rest) = match command.split_first() {
            Some(split) => split,
            None => return Err(TemplateError::Parse("empty command".into()).into()),
        };

        let func = match head {
            Token::Ident(f) => f.as_str(),
            operand if rest.is_empty() && piped.is_none() => {
                return self.operand(operand, name, content);
            }
            _ => return Err(TemplateError::Parse("operand used as a function".into()).into()),
        };

        let mut args = rest
            .iter()
            .map(|t| self.operand(t, name, content))
            .collect::<Result<Vec<_>>>()?;
        args.extend(piped);

        match func {
            "md5sum" => Ok(funcs::md5sum(last(&args, func)?)),
            "sha1sum" => Ok(funcs::sha1sum(last(&args, func)?)),
            "md5crypt" => Ok(funcs::md5crypt(last(&args, func)?, salt_arg(&args))),
            "ssha" => Ok(funcs::ssha1(last(&args, func)?, salt_arg(&args))),
            "ssha256" => Ok(funcs::ssha256(last(&args, func)?, salt_arg(&args))),
            "ssha512" => Ok(funcs::ssha512(last(&args, func)?, salt_arg(&args))),
            "get" => {
                let secret = self.lookup(first(&args, func)?, stack)?;
                Ok(String::from_utf8_lossy(&secret.bytes()).into_owned())
            }
            "getpw" => Ok(self.lookup(first(&args, func)?, stack)?.password().to_string()),
            "getval" => {
                let (target, key) = match args.as_slice() {
                    [target, key, ..] => (target, key),
                    _ => {
                        return Err(
                            TemplateError::Exec("getval needs a secret and a key".into()).into(),
                        )
                    }
                };
                self.lookup(target, stack)?
                    .get(key)
                    .ok_or_else(|| TemplateError::Exec(format!("key {} not found in {}", key, target)).into())
            }
            other => Err(TemplateError::UnknownFunction(other.to_string()).into()),
        }
    }

    fn operand(&self, token: &Token, name: &str, content: &str) -> Result<String> {
        match token {
            Token::Str(s) => Ok(s.clone()),
            Token::Int(n) => Ok(n.to_string()),
            Token::Field(f) => match f.as_str() {
                "Content" => Ok(content.to_string()),
                "Path" => Ok(name.to_string()),
                "Name" => Ok(name.rsplit('/').next().unwrap_or(name).to_string()),
                "Dir" => Ok(match name.rsplit_once('/') {
                    Some((dir, _)) => dir.to_string(),
                    None => ".".to_string(),
                }),
                other => Err(TemplateError::Exec(format!("unknown field .{}", other)).into()),
            },
            Token::Ident(f) => Err(TemplateError::Parse(format!("{} used as an argument", f)).into()),
        }
    }

    /// Read `target`, evaluating any template actions it contains.
    fn lookup(&self, target: &str, stack: &mut Vec<String>) -> Result<Secret> {
        if stack.iter().any(|n| n == target) || stack.len() > MAX_DEPTH {
            return Err(TemplateError::Recursion(target.to_string()).into());
        }
        let resolver = self
            .resolver
            .ok_or_else(|| TemplateError::Exec(format!("cannot read {} here", target)))?;
        let secret = resolver.resolve(self.ctx, target)?;
        let raw = String::from_utf8_lossy(&secret.bytes()).into_owned();
        if !raw.contains("{{") {
            return Ok(secret);
        }

        stack.push(target.to_string());
        let rendered = self.render(&raw, target, "", stack);
        stack.pop();
        Secret::parse(rendered?.as_bytes())
    }
}

fn last<'a>(args: &'a [String], func: &str) -> Result<&'a str> {
    args.last()
        .map(String::as_str)
        .ok_or_else(|| TemplateError::Exec(format!("{} needs an argument", func)).into())
}

fn first<'a>(args: &'a [String], func: &str) -> Result<&'a str> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| TemplateError::Exec(format!("{} needs an argument", func)).into())
}

/// Optional salt length: the first of two arguments.
fn salt_arg(args: &[String]) -> Option<&str> {
    (args.len() >= 2).then(|| args[0].as_str())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::ErrorKind;

    struct Fixed(BTreeMap<&'static str, &'static str>);

    impl Resolver for Fixed {
        fn resolve(&self, _ctx: &Context, name: &str) -> Result<Secret> {
            match self.0.get(name) {
                Some(body) => Secret::parse(body.as_bytes()),
                None => Err(crate::error::StoreError::NotFound(name.to_string()).into()),
            }
        }
    }

    fn fixed(entries: &[(&'static str, &'static str)]) -> Fixed {
        Fixed(entries.iter().copied().collect())
    }

    fn run(body: &str, name: &str, resolver: &Fixed) -> Result<String> {
        render(&Context::new(), body, name, "bar", Some(resolver))
    }

    #[test]
    fn test_fields() {
        let r = fixed(&[]);
        assert_eq!(run("{{.Dir}}", "testdir", &r).unwrap(), ".");
        assert_eq!(run("{{ .Dir }}/{{ .Name }}", "a/b/c", &r).unwrap(), "a/b/c");
        assert_eq!(run("{{ .Path }}", "a/b/c", &r).unwrap(), "a/b/c");
        assert_eq!(run("{{ .Content }}", "x", &r).unwrap(), "bar");
        assert!(run("{{ .Nope }}", "x", &r).is_err());
    }

    #[test]
    fn test_pipelines() {
        let r = fixed(&[]);
        assert_eq!(
            run("{{ .Content | md5sum }}", "x", &r).unwrap(),
            "37b51d194a7513e45b56f6524f2d51f2"
        );
        assert_eq!(
            run("{{ sha1sum .Content }}", "x", &r).unwrap(),
            "62cdb7020ff920e5aa642c3d4066950dd1f01f4d"
        );
        assert!(run("{{ .Content | md5crypt }}", "x", &r).unwrap().starts_with("$1$"));
        let out = run("{{ .Content | ssha 8 }}", "x", &r).unwrap();
        assert!(out.starts_with("{SSHA}"));
        assert_eq!(
            run("{{ .Content | nope }}", "x", &r).unwrap_err().kind(),
            ErrorKind::FormatError
        );
    }

    #[test]
    fn test_lookups() {
        let r = fixed(&[("foo", "barfoo\n---\nbarkey: barvalue\n")]);
        assert_eq!(run(r#"{{ getpw "foo" }}"#, "x", &r).unwrap(), "barfoo");
        assert_eq!(run(r#"{{ getval "foo" "barkey" }}"#, "x", &r).unwrap(), "barvalue");
        assert_eq!(
            run(r#"{{ get "foo" }}"#, "x", &r).unwrap(),
            "barfoo\n---\nbarkey: barvalue\n"
        );
        assert!(run(r#"{{ getval "foo" "missing" }}"#, "x", &r).is_err());
        assert_eq!(
            run(r#"{{ getpw "missing" }}"#, "x", &r).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_nested_templates_resolve() {
        let r = fixed(&[("a", "{{ getpw \"b\" }}-a\n"), ("b", "root\n")]);
        assert_eq!(run(r#"{{ getpw "a" }}"#, "new", &r).unwrap(), "root-a");
    }

    #[test]
    fn test_cycle_fails() {
        let r = fixed(&[("a", "{{ getpw \"b\" }}\n"), ("b", "{{ getpw \"a\" }}\n")]);
        let err = run(r#"{{ getpw "a" }}"#, "new", &r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateRecursion);

        // a template reading the secret it creates is a cycle too
        let err = run(r#"{{ getpw "new" }}"#, "new", &r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateRecursion);
    }

    #[test]
    fn test_without_resolver() {
        let err = render(&Context::new(), r#"{{ getpw "a" }}"#, "x", "", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatError);
    }
}
