//! Runtime message templates
//!
//! Templates use `{}` for each argument and `{{` / `}}` for literal braces.
//! Rendering does no I/O and never blocks.

use std::fmt::{self, Display, Write};

use crate::error::{Error, Result};

/// Message substituted when a template and its arguments disagree
pub const MALFORMED_MESSAGE: &str = "Discard log due to illegal formatting.";

/// Render `template` with `args`
///
/// With no arguments, or no `{}` in the template, the template is returned
/// untouched. Arguments past the last placeholder are ignored.
pub fn render(template: &str, args: &[&dyn Display]) -> Result<String> {
    if args.is_empty() || !template.contains("{}") {
        return Ok(template.to_string());
    }

    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut remaining = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => match chars.next() {
                Some('{') => out.push('{'),
                Some('}') => {
                    let arg = remaining.next().ok_or_else(|| {
                        Error::Format(format!(
                            "template has more placeholders than the {} argument(s) given",
                            args.len()
                        ))
                    })?;
                    write!(out, "{}", arg).map_err(fmt_error)?;
                }
                Some(other) => {
                    return Err(Error::Format(format!(
                        "unsupported placeholder starting with `{{{}`",
                        other
                    )))
                }
                None => return Err(Error::Format("unterminated `{`".to_string())),
            },
            '}' => match chars.next() {
                Some('}') => out.push('}'),
                _ => return Err(Error::Format("unmatched `}`".to_string())),
            },
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Render, falling back to `MALFORMED_MESSAGE`
pub fn render_or_placeholder(template: &str, args: &[&dyn Display]) -> String {
    render(template, args).unwrap_or_else(|e| {
        tracing::debug!(template, error = %e, "Discarding malformed log message");
        MALFORMED_MESSAGE.to_string()
    })
}

fn fmt_error(e: fmt::Error) -> Error {
    Error::Format(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_args_keeps_braces() {
        assert_eq!(render("literal {} here", &[]).unwrap(), "literal {} here");
    }

    #[test]
    fn test_render_substitutes_in_order() {
        let user = "ada";
        let count = 3;
        assert_eq!(
            render("{} bought {} items", &[&user, &count]).unwrap(),
            "ada bought 3 items"
        );
    }

    #[test]
    fn test_render_escapes() {
        assert_eq!(render("{{{}}}", &[&7]).unwrap(), "{7}");
    }

    #[test]
    fn test_render_too_few_args() {
        assert!(matches!(render("{} and {}", &[&1]), Err(Error::Format(_))));
    }

    #[test]
    fn test_render_ignores_surplus_args() {
        assert_eq!(render("only {}", &[&1, &2]).unwrap(), "only 1");
        assert_eq!(
            render("no placeholders here", &[&1]).unwrap(),
            "no placeholders here"
        );
        assert_eq!(render("{{literal}}", &[&1]).unwrap(), "{{literal}}");
    }

    #[test]
    fn test_render_rejects_named_placeholders() {
        assert!(matches!(render("{name} {}", &[&1]), Err(Error::Format(_))));
        assert!(matches!(render("{} oops }", &[&1]), Err(Error::Format(_))));
        assert!(matches!(render("{} {", &[&1]), Err(Error::Format(_))));
    }

    #[test]
    fn test_placeholder_on_mismatch() {
        assert_eq!(render_or_placeholder("{} {}", &[&1]), MALFORMED_MESSAGE);
        assert_eq!(render_or_placeholder("{}", &[&1]), "1");
        assert_eq!(render_or_placeholder("plain text", &[&1, &2]), "plain text");
    }
}
