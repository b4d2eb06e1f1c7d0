//! # Pretty Printing - Markdown Rendering and Syntax Highlighting
//!
//! Terminal output for markdown-formatted replies: headers, bold, italic
//! and inline code become ANSI attributes via Crossterm, while fenced code
//! blocks are highlighted with Syntect (`base16-ocean.dark`, 24-bit
//! color escapes).
//!
//! Replies arrive as complete strings (there is no token streaming), so
//! the whole pipeline is one pass:
//!
//! 1. split the text on ```` ``` ```` fences with a regex,
//! 2. render prose lines through [`print_markdown`]'s line classifier,
//! 3. render each code block with a Syntect [`HighlightLines`] loop.
//!
//! ```no_run
//! use filechat::pretty::print_pretty;
//!
//! let markdown = "# Answer\n\nThe capital is **Paris** (see `a.txt`).\n";
//! print_pretty(markdown).unwrap();
//! ```

use crossterm::{
    ExecutableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::io::{Write, stdout};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

static CODE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(\w+)?\n([\s\S]*?)```").unwrap());
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());

/// Print markdown text with pretty formatting and syntax-highlighted code
/// blocks.
///
/// # Errors
/// Returns IO errors if terminal output fails.
pub fn print_pretty(text: &str) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();

    let ps = SyntaxSet::load_defaults_newlines();
    let ts = ThemeSet::load_defaults();
    let theme = &ts.themes["base16-ocean.dark"];

    let mut last_end = 0;
    for cap in CODE_BLOCK_RE.captures_iter(text) {
        let whole = cap.get(0).unwrap();

        if whole.start() > last_end {
            print_markdown(&text[last_end..whole.start()], &mut out)?;
        }

        let language = cap.get(1).map(|m| m.as_str()).unwrap_or("text");
        let code = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        print_code_block(code, language, &ps, theme, &mut out)?;

        last_end = whole.end();
    }

    if last_end < text.len() {
        print_markdown(&text[last_end..], &mut out)?;
    }

    out.flush()?;
    Ok(())
}

/// Print regular markdown text with formatting.
fn print_markdown(text: &str, out: &mut std::io::Stdout) -> Result<(), Box<dyn Error>> {
    for line in text.lines() {
        if let Some(header) = line
            .strip_prefix("### ")
            .or_else(|| line.strip_prefix("## "))
            .or_else(|| line.strip_prefix("# "))
        {
            out.execute(SetForegroundColor(Color::Cyan))?;
            out.execute(SetAttribute(Attribute::Bold))?;
            writeln!(out, "{header}")?;
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(SetForegroundColor(Color::Reset))?;
        } else {
            writeln!(out, "{}", apply_inline_styles(line))?;
        }
    }
    Ok(())
}

/// Replace inline markdown spans with ANSI escape sequences.
fn apply_inline_styles(line: &str) -> String {
    let line = INLINE_CODE_RE.replace_all(line, "\x1b[33m$1\x1b[39m");
    let line = BOLD_RE.replace_all(&line, "\x1b[1m$1\x1b[22m");
    ITALIC_RE.replace_all(&line, "\x1b[3m$1\x1b[23m").into_owned()
}

fn print_code_block(
    code: &str,
    language: &str,
    ps: &SyntaxSet,
    theme: &Theme,
    out: &mut std::io::Stdout,
) -> Result<(), Box<dyn Error>> {
    let syntax = syntax_for_token(ps, language);
    let mut highlighter = HighlightLines::new(syntax, theme);

    for line in LinesWithEndings::from(code) {
        let ranges: Vec<(Style, &str)> = highlighter.highlight_line(line, ps)?;
        write!(out, "{}", as_24_bit_terminal_escaped(&ranges[..], false))?;
    }
    write!(out, "\x1b[0m")?;
    writeln!(out)?;
    Ok(())
}

/// Resolve a fence language token to a Syntect syntax, falling back to
/// plain text for anything unknown.
fn syntax_for_token<'a>(ps: &'a SyntaxSet, token: &str) -> &'a SyntaxReference {
    let token = match token {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "rs" => "rust",
        "sh" | "bash" | "shell" => "sh",
        "yml" => "yaml",
        "md" => "markdown",
        other => other,
    };

    ps.find_syntax_by_token(token)
        .unwrap_or_else(|| ps.find_syntax_plain_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_styles_become_ansi_sequences() {
        let styled = apply_inline_styles("a **bold** word and `code` here");
        assert!(styled.contains("\x1b[1mbold\x1b[22m"));
        assert!(styled.contains("\x1b[33mcode\x1b[39m"));
        assert!(!styled.contains("**"));
    }

    #[test]
    fn unknown_language_falls_back_to_plain_text() {
        let ps = SyntaxSet::load_defaults_newlines();
        let syntax = syntax_for_token(&ps, "definitely-not-a-language");
        assert_eq!(syntax.name, ps.find_syntax_plain_text().name);
    }

    #[test]
    fn known_aliases_resolve_to_a_syntax() {
        let ps = SyntaxSet::load_defaults_newlines();
        assert_ne!(
            syntax_for_token(&ps, "rs").name,
            ps.find_syntax_plain_text().name
        );
    }

    #[test]
    fn code_fence_regex_captures_language_and_body() {
        let text = "before\n```rust\nfn main() {}\n```\nafter";
        let cap = CODE_BLOCK_RE.captures(text).unwrap();
        assert_eq!(cap.get(1).unwrap().as_str(), "rust");
        assert_eq!(cap.get(2).unwrap().as_str(), "fn main() {}\n");
    }
}
