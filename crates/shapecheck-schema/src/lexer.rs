//! Lexer for declaration sources.
//!
//! Uses logos to tokenize the TypeScript declaration subset understood by the
//! schema compiler. Block comments are kept as tokens so doc comments can be
//! attached to the member that follows them; the parser never sees them.

use std::ops::Range;

use logos::Logos;

/// A declaration token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip(r"//[^\n]*", allow_greedy = true))]
pub enum Token {
    // Keywords
    #[token("interface")]
    Interface,
    #[token("type")]
    Type,
    #[token("import")]
    Import,
    #[token("export")]
    Export,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("declare")]
    Declare,
    #[token("extends")]
    Extends,
    #[token("const")]
    Const,
    #[token("readonly")]
    Readonly,
    #[token("in")]
    In,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("|")]
    Pipe,
    #[token("&")]
    Amp,
    #[token("=")]
    Eq,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,

    // Literals
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| serde_json::from_str::<String>(lex.slice()).ok())]
    #[regex(r"'([^'\\\n]|\\.)*'", |lex| unquote_single(lex.slice()))]
    String(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", |lex| lex.slice().to_string())]
    BlockComment(String),
}

impl Token {
    /// Text of a keyword token, used where keywords are valid property names.
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            Token::Interface => "interface",
            Token::Type => "type",
            Token::Import => "import",
            Token::Export => "export",
            Token::From => "from",
            Token::As => "as",
            Token::Declare => "declare",
            Token::Extends => "extends",
            Token::Const => "const",
            Token::Readonly => "readonly",
            Token::In => "in",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        })
    }

    /// Whether this is a `/** ... */` comment.
    pub fn is_doc_comment(&self) -> bool {
        matches!(self, Token::BlockComment(text) if text.starts_with("/**") && text != "/**/")
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(kw) = self.keyword_text() {
            return write!(f, "{kw}");
        }
        match self {
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Comma => write!(f, ","),
            Token::Semi => write!(f, ";"),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::Pipe => write!(f, "|"),
            Token::Amp => write!(f, "&"),
            Token::Eq => write!(f, "="),
            Token::Dot => write!(f, "."),
            Token::Star => write!(f, "*"),
            Token::String(s) => write!(f, "{s:?}"),
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::BlockComment(_) => write!(f, "comment"),
            _ => write!(f, "keyword"),
        }
    }
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

/// A lexing failure: the offending slice and where it sits.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Range<usize>,
    pub text: String,
}

/// Tokenize a whole source, collecting every unlexable slice.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, Vec<LexError>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push(Spanned { token, span }),
            Err(()) => errors.push(LexError {
                text: source.get(span.clone()).unwrap_or_default().to_string(),
                span,
            }),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// Deepest `{`/`[` nesting in `source`. Unlexable slices are skipped.
pub fn nesting_depth(source: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    for token in Token::lexer(source).flatten() {
        match token {
            Token::LBrace | Token::LBracket => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            Token::RBrace | Token::RBracket => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

fn unquote_single(raw: &str) -> Option<String> {
    let inner = raw.get(1..raw.len().checked_sub(1)?)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            other => out.push(other),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<Token> {
        Token::lexer(source).filter_map(|result| result.ok()).collect()
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            lex("interface Foo extends Bar"),
            vec![
                Token::Interface,
                Token::Ident("Foo".to_string()),
                Token::Extends,
                Token::Ident("Bar".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_ident() {
        assert_eq!(lex("types"), vec![Token::Ident("types".to_string())]);
        assert_eq!(lex("$ref"), vec![Token::Ident("$ref".to_string())]);
    }

    #[test]
    fn test_strings_unescape() {
        assert_eq!(
            lex(r#""a\"b" 'c\'d'"#),
            vec![
                Token::String("a\"b".to_string()),
                Token::String("c'd".to_string()),
            ]
        );
        assert_eq!(lex(r#""é""#), vec![Token::String("é".to_string())]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            lex("42 -3.5 1e3"),
            vec![Token::Number(42.0), Token::Number(-3.5), Token::Number(1000.0)]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = lex("// line\n/** @pattern ^a$ */ a /* plain */");
        assert_eq!(tokens.len(), 3);
        assert!(tokens[0].is_doc_comment());
        assert_eq!(tokens[1], Token::Ident("a".to_string()));
        assert!(!tokens[2].is_doc_comment());
    }

    #[test]
    fn test_angle_brackets_split() {
        assert_eq!(
            lex("A<B<C>>"),
            vec![
                Token::Ident("A".to_string()),
                Token::Lt,
                Token::Ident("B".to_string()),
                Token::Lt,
                Token::Ident("C".to_string()),
                Token::Gt,
                Token::Gt,
            ]
        );
    }

    #[test]
    fn test_tokenize_reports_errors() {
        let errs = tokenize("a # b").unwrap_err();
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].text, "#");
        assert_eq!(errs[0].span, 2..3);
    }

    #[test]
    fn test_line_comment_runs_to_end_of_line() {
        let tokens = lex("a // b { [\nc");
        assert_eq!(
            tokens,
            vec![Token::Ident("a".to_string()), Token::Ident("c".to_string())]
        );
    }

    #[test]
    fn test_nesting_depth() {
        assert_eq!(nesting_depth("type A = string;"), 0);
        assert_eq!(nesting_depth("const v = {a: [1, {b: 2}], c: {}};"), 3);
        assert_eq!(nesting_depth("const v = \"{{{\"; // [[["), 0);
        let deep = format!("{}{}", "[".repeat(1500), "]".repeat(1500));
        assert_eq!(nesting_depth(&deep), 1500);
    }
}
