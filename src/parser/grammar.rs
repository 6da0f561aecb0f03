//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse config source into an element tree
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let name = select! {
        Token::Name(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let string_literal = select! {
        Token::String(s) => s,
    }
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let attribute = name
        .clone()
        .then_ignore(just(Token::Equals))
        .then(string_literal)
        .map(|(name, value)| Attribute { name, value });

    let element = recursive(|element| {
        let start_tag = just(Token::TagOpen)
            .ignore_then(name.clone())
            .then(attribute.clone().repeated().collect::<Vec<_>>());

        // Either `/>` or `> children </name>`
        let content = choice((
            just(Token::SelfClose)
                .map(|_| (Vec::<Spanned<Element>>::new(), None::<Spanned<String>>)),
            just(Token::TagClose)
                .ignore_then(element.clone().repeated().collect::<Vec<_>>())
                .then_ignore(just(Token::CloseTagOpen))
                .then(name.clone())
                .then_ignore(just(Token::TagClose))
                .map(|(children, close)| (children, Some(close))),
        ));

        start_tag
            .then(content)
            .try_map(|((name, attributes), (children, close)), span| {
                if let Some(close) = close {
                    if close.node != name.node {
                        return Err(Rich::custom(
                            span,
                            format!(
                                "closing tag '</{}>' does not match opening tag '<{}>'",
                                close.node, name.node
                            ),
                        ));
                    }
                }
                Ok(Element {
                    name,
                    attributes,
                    children,
                })
            })
            .map_with(|el, e| Spanned::new(el, span_range(&e.span())))
            .boxed()
    });

    // A document is exactly one root element
    element.then_ignore(end()).map(|root| Document { root })
}
