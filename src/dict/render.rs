//! Rendering raw entry markup into the requested output format.
//!
//! Entries are small HTML fragments. Rendering tokenizes the fragment and
//! folds the tokens into the output string; nothing outside the fold is
//! mutated.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

/// Render target for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Markdown with bold/italic markers
    #[default]
    Md,
    /// The raw entry markup plus the dictionary stylesheet
    Html,
    /// Plain text
    Text,
}

impl Format {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Md => "md",
            Self::Html => "html",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md" => Ok(Self::Md),
            "html" => Ok(Self::Html),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Open(&'a str),
    Close(&'a str),
}

/// Split markup into text runs and tags. Tag names are lowercased by the
/// caller; attributes, comments and doctypes are dropped.
fn tokenize(markup: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = markup;
    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(rest));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(&rest[..lt]));
        }
        let Some(gt) = rest[lt..].find('>') else {
            tokens.push(Token::Text(&rest[lt..]));
            break;
        };
        let inner = rest[lt + 1..lt + gt].trim();
        rest = &rest[lt + gt + 1..];

        if inner.starts_with('!') || inner.starts_with('?') {
            continue;
        }
        if let Some(name) = inner.strip_prefix('/') {
            tokens.push(Token::Close(tag_name(name)));
        } else {
            tokens.push(Token::Open(tag_name(inner.trim_end_matches('/'))));
        }
    }
    tokens
}

fn tag_name(inner: &str) -> &str {
    inner.split(|c: char| c.is_whitespace()).next().unwrap_or("")
}

/// Fold state: the text produced so far and how deep inside an element
/// whose contents are never shown (`script`, `style`) we are.
#[derive(Default)]
struct Rendered {
    out: String,
    hidden: usize,
}

fn fold_token(mut acc: Rendered, token: Token<'_>, emphasis: bool) -> Rendered {
    let (bold, italic) = if emphasis { ("**", "*") } else { ("", "") };
    match token {
        Token::Open(name) | Token::Close(name)
            if name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style") =>
        {
            if matches!(token, Token::Open(_)) {
                acc.hidden += 1;
            } else {
                acc.hidden = acc.hidden.saturating_sub(1);
            }
        }
        _ if acc.hidden > 0 => {}
        Token::Text(text) => acc.out.push_str(&decode_entities(text)),
        Token::Open(name) | Token::Close(name) => {
            let open = matches!(token, Token::Open(_));
            match name.to_ascii_lowercase().as_str() {
                "b" | "strong" => acc.out.push_str(bold),
                "i" | "em" => acc.out.push_str(italic),
                "ex" => acc.out.push_str(if open { "> " } else { " <" }),
                "br" => acc.out.push('\n'),
                "div" | "p" | "table" | "tr" | "li" => {
                    if !acc.out.is_empty() && !acc.out.ends_with('\n') {
                        acc.out.push('\n');
                    }
                }
                _ => {}
            }
        }
    }
    acc
}

/// Collapse runs of blank lines and trim trailing spaces on each line.
fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(if line.trim().is_empty() { "" } else { line });
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Render an entry for `format`. HTML is returned untouched.
pub fn render(markup: &str, format: Format) -> String {
    let emphasis = match format {
        Format::Html => return markup.to_string(),
        Format::Md => true,
        Format::Text => false,
    };
    let rendered = tokenize(markup)
        .into_iter()
        .fold(Rendered::default(), |acc, token| fold_token(acc, token, emphasis));
    tidy(&rendered.out)
}
