/// Stage fragment templates — parsing at catalog load, rendering per selection.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

use crate::schema::motif::EncounterStage;

#[derive(Debug, Error, PartialEq)]
pub enum FragmentError {
    #[error("fragment parse error: {0}")]
    Parse(String),
}

/// Values a fragment may interpolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Name,
    Family,
    Encounters,
    Stage,
}

impl Placeholder {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "name" => Some(Self::Name),
            "family" => Some(Self::Family),
            "encounters" => Some(Self::Encounters),
            "stage" => Some(Self::Stage),
            _ => None,
        }
    }
}

/// A segment of a parsed fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// `{name}`, `{family}`, `{encounters}` or `{stage}`.
    Placeholder(Placeholder),
}

/// Values substituted into a fragment when it is rendered.
#[derive(Debug, Clone, Copy)]
pub struct FragmentContext<'a> {
    pub name: &'a str,
    pub family: &'a str,
    pub encounters: u32,
    pub stage: EncounterStage,
}

/// A parsed stage fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<FragmentSegment>,
}

impl Template {
    /// Parse a fragment string.
    ///
    /// Syntax:
    /// - `{name}`, `{family}`, `{encounters}`, `{stage}` → `Placeholder`
    /// - `{{` / `}}` → literal brace
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, FragmentError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let placeholder = read_placeholder(&mut chars)?;
                    if !text.is_empty() {
                        segments.push(FragmentSegment::Literal(std::mem::take(&mut text)));
                    }
                    segments.push(FragmentSegment::Placeholder(placeholder));
                }
                '}' => {
                    return Err(FragmentError::Parse(
                        "unmatched closing brace".to_string(),
                    ))
                }
                _ => text.push(c),
            }
        }

        if !text.is_empty() {
            segments.push(FragmentSegment::Literal(text));
        }

        Ok(Template {
            source: input.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[FragmentSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn render(&self, ctx: &FragmentContext<'_>) -> String {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                FragmentSegment::Literal(text) => out.push_str(text),
                FragmentSegment::Placeholder(Placeholder::Name) => out.push_str(ctx.name),
                FragmentSegment::Placeholder(Placeholder::Family) => out.push_str(ctx.family),
                FragmentSegment::Placeholder(Placeholder::Encounters) => {
                    out.push_str(&ctx.encounters.to_string())
                }
                FragmentSegment::Placeholder(Placeholder::Stage) => out.push_str(ctx.stage.tag()),
            }
        }
        out
    }
}

/// Consume a placeholder body up to and including its closing brace.
fn read_placeholder(chars: &mut Peekable<Chars<'_>>) -> Result<Placeholder, FragmentError> {
    let mut key = String::new();
    for c in chars.by_ref() {
        match c {
            '}' => {
                let key = key.trim();
                if key.is_empty() {
                    return Err(FragmentError::Parse("empty braces".to_string()));
                }
                return Placeholder::from_key(key).ok_or_else(|| {
                    FragmentError::Parse(format!("unknown placeholder '{}'", key))
                });
            }
            '{' => {
                return Err(FragmentError::Parse(
                    "nested braces are not allowed".to_string(),
                ))
            }
            _ => key.push(c),
        }
    }
    Err(FragmentError::Parse("unclosed brace".to_string()))
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FragmentContext<'static> {
        FragmentContext {
            name: "The Elder",
            family: "guide",
            encounters: 4,
            stage: EncounterStage::Return,
        }
    }

    #[test]
    fn parse_literal_only() {
        let t = Template::parse("A quiet path opens.").unwrap();
        assert_eq!(
            t.segments(),
            &[FragmentSegment::Literal("A quiet path opens.".to_string())]
        );
    }

    #[test]
    fn render_placeholders() {
        let t = Template::parse("{name} greets you again ({encounters} times, {stage}).").unwrap();
        assert_eq!(
            t.render(&ctx()),
            "The Elder greets you again (4 times, return)."
        );
    }

    #[test]
    fn parse_escaped_braces() {
        let t = Template::parse("Keep {{this}} literal").unwrap();
        assert_eq!(t.render(&ctx()), "Keep {this} literal");
    }

    #[test]
    fn parse_unknown_placeholder_error() {
        let err = Template::parse("Hello {listener}").unwrap_err();
        assert!(err.to_string().contains("listener"));
    }

    #[test]
    fn parse_empty_braces_error() {
        assert!(Template::parse("Bad {} here").is_err());
    }

    #[test]
    fn parse_nested_braces_error() {
        assert!(Template::parse("Bad {outer{name}} here").is_err());
    }

    #[test]
    fn parse_unclosed_brace_error() {
        assert!(Template::parse("Bad {name here").is_err());
    }

    #[test]
    fn parse_unmatched_close_error() {
        assert!(Template::parse("Bad } here").is_err());
    }

    #[test]
    fn parse_whitespace_only_braces_error() {
        let err = Template::parse("Bad {  } here").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn parse_doubled_braces_around_placeholder() {
        let t = Template::parse("{{{name}}}").unwrap();
        assert_eq!(t.render(&ctx()), "{The Elder}");
    }

    #[test]
    fn display_keeps_source() {
        let t = Template::parse("{family} motif").unwrap();
        assert_eq!(t.to_string(), "{family} motif");
    }
}
