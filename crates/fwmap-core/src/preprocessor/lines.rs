//! Line classification
//!
//! Source text goes through two steps:
//! 1. block comments are removed, keeping their newlines so line numbers
//!    still point at the original source
//! 2. the text is split into logical lines (backslash continuations joined)
//!    and each line is classified

use super::registry::is_identifier;

/// Remove `/* ... */` comments.
///
/// A comment becomes a single space; newlines inside it are kept. String and
/// character literals and `//` comments are left alone, so a `/*` inside them
/// does not open a block.
pub fn strip_block_comments(text: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Code,
        Str(char),
        LineComment,
        BlockComment,
    }

    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match state {
            State::Code => match ch {
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    out.push(' ');
                    state = State::BlockComment;
                }
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    out.push_str("//");
                    state = State::LineComment;
                }
                '"' | '\'' => {
                    out.push(ch);
                    state = State::Str(ch);
                }
                _ => out.push(ch),
            },
            State::Str(quote) => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                        if next == '\n' {
                            state = State::Code;
                        }
                    }
                } else if ch == quote || ch == '\n' {
                    state = State::Code;
                }
            }
            State::LineComment => {
                out.push(ch);
                if ch == '\n' {
                    state = State::Code;
                }
            }
            State::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                } else if ch == '\n' {
                    out.push('\n');
                }
            }
        }
    }

    out
}

/// Cut a trailing `//` comment, ignoring `//` inside quotes
pub fn strip_line_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = '\0';

    for (i, ch) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
        } else if ch == '"' || ch == '\'' {
            quote = Some(ch);
        } else if ch == '/' && prev == '/' {
            return &line[..i - 1];
        }
        prev = ch;
    }
    line
}

/// A `#define` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineLine {
    /// Macro name
    pub name: String,
    /// Right-hand side with any trailing comment removed; `None` when bare
    pub value: Option<String>,
    /// `#define F(x) ...`
    pub function_like: bool,
}

/// A preprocessor directive other than `#define`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `#undef NAME`
    Undef(String),
    /// `#if EXPR`
    If(String),
    /// `#ifdef NAME`
    Ifdef(String),
    /// `#ifndef NAME`
    Ifndef(String),
    /// `#elif EXPR`
    Elif(String),
    /// `#else`
    Else,
    /// `#endif`
    Endif,
    /// `#include`, `#error`, `#pragma`, ...
    Other { keyword: String, rest: String },
}

/// What a logical line holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty after comment removal
    Blank,
    /// Only a `//` comment
    Comment,
    /// A `#define`
    Define(DefineLine),
    /// Any other directive
    Directive(Directive),
    /// Code or anything else
    Other,
}

/// One logical source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based number of the first physical line
    pub number: usize,
    /// Trimmed text with continuations joined
    pub text: String,
    /// Classification of `text`
    pub kind: LineKind,
}

/// Classify one trimmed logical line
pub fn classify(text: &str) -> LineKind {
    if text.is_empty() {
        return LineKind::Blank;
    }
    if text.starts_with("//") {
        return LineKind::Comment;
    }
    let Some(body) = text.strip_prefix('#') else {
        return LineKind::Other;
    };

    let body = body.trim_start();
    let keyword_len = body
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(body.len());
    let (keyword, rest) = body.split_at(keyword_len);

    if keyword == "define" {
        return match parse_define(rest) {
            Some(define) => LineKind::Define(define),
            None => LineKind::Directive(Directive::Other {
                keyword: keyword.to_string(),
                rest: strip_line_comment(rest).trim().to_string(),
            }),
        };
    }

    let args = strip_line_comment(rest).trim();
    let first_word = || args.split_whitespace().next().unwrap_or("").to_string();

    let directive = match keyword {
        "undef" => Directive::Undef(first_word()),
        "if" => Directive::If(args.to_string()),
        "ifdef" => Directive::Ifdef(first_word()),
        "ifndef" => Directive::Ifndef(first_word()),
        "elif" => Directive::Elif(args.to_string()),
        "else" => Directive::Else,
        "endif" => Directive::Endif,
        "" => return LineKind::Comment,
        _ => Directive::Other {
            keyword: keyword.to_string(),
            rest: args.to_string(),
        },
    };
    LineKind::Directive(directive)
}

/// Parse what follows `#define`
fn parse_define(rest: &str) -> Option<DefineLine> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let name_len = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    let (name, after) = rest.split_at(name_len);
    if !is_identifier(name) {
        return None;
    }

    if after.starts_with('(') {
        return Some(DefineLine {
            name: name.to_string(),
            value: None,
            function_like: true,
        });
    }

    let value = strip_line_comment(after).trim();
    Some(DefineLine {
        name: name.to_string(),
        value: (!value.is_empty()).then(|| value.to_string()),
        function_like: false,
    })
}

/// Lazily yields classified logical lines of already comment-stripped text
pub struct LineClassifier<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> LineClassifier<'a> {
    /// Iterate the logical lines of `text`
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
        }
    }
}

impl Iterator for LineClassifier<'_> {
    type Item = SourceLine;

    fn next(&mut self) -> Option<SourceLine> {
        let (index, first) = self.lines.next()?;
        let mut text = first.trim().to_string();

        while let Some(joined) = text.strip_suffix('\\') {
            let joined = joined.trim_end().to_string();
            match self.lines.next() {
                Some((_, next)) => text = format!("{} {}", joined, next.trim()),
                None => {
                    text = joined;
                    break;
                }
            }
        }

        let text = text.trim().to_string();
        let kind = classify(&text);
        Some(SourceLine {
            number: index + 1,
            text,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_comments_keep_line_numbers() {
        let src = "#define A 1\n/* one\n two */\n#define B 2 /* x */\n";
        let stripped = strip_block_comments(src);
        assert_eq!(stripped.lines().count(), 4);
        let lines: Vec<_> = LineClassifier::new(&stripped).collect();
        assert_eq!(lines[3].number, 4);
        assert_eq!(
            lines[3].kind,
            LineKind::Define(DefineLine {
                name: "B".into(),
                value: Some("2".into()),
                function_like: false,
            })
        );
    }

    #[test]
    fn test_block_comment_inside_string_kept() {
        let src = r#"#define PATH "a/*b*/c""#;
        assert_eq!(strip_block_comments(src), src);
        let src = "#define X 1 // see /* note\n#define Y 2";
        assert_eq!(strip_block_comments(src), src);
    }

    #[test]
    fn test_strip_line_comment_quote_aware() {
        assert_eq!(strip_line_comment(r#""http://x" // url"#), r#""http://x" "#);
        assert_eq!(strip_line_comment("250 // mm/s"), "250 ");
        assert_eq!(strip_line_comment("'/'"), "'/'");
    }

    #[test]
    fn test_classify_directives() {
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(classify("// hi"), LineKind::Comment);
        assert_eq!(classify("int x;"), LineKind::Other);
        assert_eq!(
            classify("#ifdef BLTOUCH // probe"),
            LineKind::Directive(Directive::Ifdef("BLTOUCH".into()))
        );
        assert_eq!(
            classify("#  if ENABLED(A) && B > 2"),
            LineKind::Directive(Directive::If("ENABLED(A) && B > 2".into()))
        );
        assert_eq!(classify("#endif // BLTOUCH"), LineKind::Directive(Directive::Endif));
        assert_eq!(classify("#else"), LineKind::Directive(Directive::Else));
        assert_eq!(
            classify("#undef LCD"),
            LineKind::Directive(Directive::Undef("LCD".into()))
        );
        assert_eq!(
            classify("#error \"bad\""),
            LineKind::Directive(Directive::Other {
                keyword: "error".into(),
                rest: "\"bad\"".into()
            })
        );
    }

    #[test]
    fn test_classify_defines() {
        assert_eq!(
            classify("# define  BAUDRATE 115200 // serial"),
            LineKind::Define(DefineLine {
                name: "BAUDRATE".into(),
                value: Some("115200".into()),
                function_like: false,
            })
        );
        assert_eq!(
            classify("#define BLTOUCH"),
            LineKind::Define(DefineLine {
                name: "BLTOUCH".into(),
                value: None,
                function_like: false,
            })
        );
        assert_eq!(
            classify("#define MAX(a,b) ((a)>(b)?(a):(b))"),
            LineKind::Define(DefineLine {
                name: "MAX".into(),
                value: None,
                function_like: true,
            })
        );
        assert_eq!(
            classify("#define SPACED (1 + 2)"),
            LineKind::Define(DefineLine {
                name: "SPACED".into(),
                value: Some("(1 + 2)".into()),
                function_like: false,
            })
        );
        assert!(matches!(classify("#defineX 1"), LineKind::Directive(_)));
    }

    #[test]
    fn test_continuation_joined() {
        let src = "#define STEPS { 80, \\\n  80, 400 }\n#define NEXT 1";
        let lines: Vec<_> = LineClassifier::new(src).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].text, "#define STEPS { 80, 80, 400 }");
        assert_eq!(lines[1].number, 3);
    }
}
