//! Lexer for the template config document using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Tag delimiters (longer patterns first)
    #[token("</")]
    CloseTagOpen,
    #[token("/>")]
    SelfClose,
    #[token("<")]
    TagOpen,
    #[token(">")]
    TagClose,
    #[token("=")]
    Equals,

    // Element and attribute names
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.:-]*", |lex| lex.slice().to_string())]
    Name(String),

    // Attribute values, with quotes stripped and entities decoded
    #[regex(r#""[^"]*""#, |lex| unquote(lex.slice()))]
    #[regex(r"'[^']*'", |lex| unquote(lex.slice()))]
    String(String),

    // XML prolog `<?xml version="1.0"?>` (skip)
    #[regex(r"<\?[^?]*\?>", logos::skip)]
    Prolog,

    // Comments (skip)
    #[regex(r"<!--([^-]|-[^-])*-->", logos::skip)]
    Comment,
}

fn unquote(slice: &str) -> String {
    decode_entities(&slice[1..slice.len() - 1])
}

/// Decode the predefined XML entities. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
