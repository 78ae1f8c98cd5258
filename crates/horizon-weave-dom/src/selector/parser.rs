//! Selector parser using the `cssparser` tokenizer.
//!
//! Supported syntax: type (`div`), universal (`*`), id (`#main`), class
//! (`.item`), attribute presence and equality (`[href]`, `[data-id="7"]`),
//! descendant and child (`>`) combinators, and comma-separated lists.

use cssparser::{ParseError as CssParseError, Parser, ParserInput, Token};

use super::{AttributeSelector, Combinator, Selector, SelectorList, SelectorPart, TypeSelector};
use crate::error::{DomError, Result};

/// Parse a selector list such as `"ul > li.item, #footer a"`.
pub fn parse_selector(source: &str) -> Result<SelectorList> {
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);

    let mut selectors = Vec::new();
    let mut builder = SelectorBuilder::default();

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => {
                builder.end_part(Combinator::Descendant);
            }

            Token::Delim('>') => {
                if !builder.end_part(Combinator::Child) {
                    return Err(DomError::invalid_selector(source, "combinator without a left-hand side"));
                }
            }

            Token::Comma => {
                selectors.push(builder.finish(source)?);
                builder = SelectorBuilder::default();
            }

            Token::Ident(name) => {
                let part = builder.part(source)?;
                if part.type_selector.is_some() || !part.is_empty() {
                    return Err(DomError::invalid_selector(source, "type selector must come first"));
                }
                part.type_selector = Some(TypeSelector::Type(name.to_string()));
            }

            Token::Delim('*') => {
                let part = builder.part(source)?;
                if !part.is_empty() {
                    return Err(DomError::invalid_selector(source, "universal selector must come first"));
                }
                part.type_selector = Some(TypeSelector::Universal);
            }

            Token::Delim('.') => {
                let class = parser
                    .expect_ident()
                    .map_err(|_| DomError::invalid_selector(source, "expected class name after '.'"))?
                    .to_string();
                builder.part(source)?.classes.push(class);
            }

            Token::IDHash(id) | Token::Hash(id) => {
                let part = builder.part(source)?;
                if part.id.is_some() {
                    return Err(DomError::invalid_selector(source, "more than one id in a compound selector"));
                }
                part.id = Some(id.to_string());
            }

            Token::SquareBracketBlock => {
                let attribute = parser
                    .parse_nested_block(|p| parse_attribute(p))
                    .map_err(|_: CssParseError<'_, ()>| {
                        DomError::invalid_selector(source, "invalid attribute selector")
                    })?;
                builder.part(source)?.attributes.push(attribute);
            }

            other => {
                return Err(DomError::invalid_selector(
                    source,
                    format!("unsupported token {other:?}"),
                ));
            }
        }
    }

    selectors.push(builder.finish(source)?);
    Ok(SelectorList(selectors))
}

/// Parse the inside of `[...]`.
fn parse_attribute<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<AttributeSelector, CssParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_string();
    if parser.is_exhausted() {
        return Ok(AttributeSelector::exists(name));
    }
    parser.expect_delim('=')?;
    let value = parser.expect_ident_or_string()?.to_string();
    parser.expect_exhausted()?;
    Ok(AttributeSelector::equals(name, value))
}

/// Accumulates parts and combinators of one selector.
#[derive(Default)]
struct SelectorBuilder {
    parts: Vec<SelectorPart>,
    combinators: Vec<Combinator>,
    current: SelectorPart,
    pending: Option<Combinator>,
}

impl SelectorBuilder {
    /// The compound part being built, starting a new one after a combinator.
    fn part(&mut self, source: &str) -> Result<&mut SelectorPart> {
        if self.current.is_empty()
            && let Some(combinator) = self.pending.take()
        {
            if self.parts.is_empty() {
                return Err(DomError::invalid_selector(source, "combinator without a left-hand side"));
            }
            self.combinators.push(combinator);
        }
        Ok(&mut self.current)
    }

    /// Close the current part. A child combinator overrides a pending
    /// descendant one (`a > b` tokenizes as `a`, space, `>`, space, `b`).
    ///
    /// Returns false if there is nothing to the left of the combinator.
    fn end_part(&mut self, combinator: Combinator) -> bool {
        if !self.current.is_empty() {
            self.parts.push(std::mem::take(&mut self.current));
            self.pending = Some(combinator);
            return true;
        }
        if self.parts.is_empty() {
            return combinator == Combinator::Descendant;
        }
        if combinator == Combinator::Child || self.pending.is_none() {
            self.pending = Some(combinator);
        }
        true
    }

    fn finish(mut self, source: &str) -> Result<Selector> {
        if !self.current.is_empty() {
            self.parts.push(std::mem::take(&mut self.current));
        } else if self.pending == Some(Combinator::Child) {
            return Err(DomError::invalid_selector(source, "dangling combinator"));
        }
        if self.parts.is_empty() {
            return Err(DomError::invalid_selector(source, "empty selector"));
        }
        Ok(Selector {
            parts: self.parts,
            combinators: self.combinators,
        })
    }
}
