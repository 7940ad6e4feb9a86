//! Lenient HTML fragment parser
//!
//! Tokens are recognised with nom, then a small stack machine builds the
//! tree. The parser never fails: a stray `<` becomes text, unmatched close
//! tags are dropped and anything still open at the end is closed implicitly.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till1, take_until, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::arena::DomArena;
use crate::error::Result;
use crate::types::{is_void_element, NodeId, RAW_TEXT_ELEMENTS};
use crate::utils::decode_entities;

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Open {
        name: &'a str,
        attrs: Vec<(&'a str, &'a str)>,
        self_closing: bool,
    },
    Close(&'a str),
    Comment(&'a str),
    Doctype,
    Text(&'a str),
}

fn tag_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-')(input)
}

fn attr_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, '"' | '\'' | '>' | '/' | '='))(input)
}

fn attr_value(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_until("\""), char('"')),
        delimited(char('\''), take_until("'"), char('\'')),
        take_while1(|c: char| {
            !c.is_whitespace() && !matches!(c, '"' | '\'' | '=' | '<' | '>' | '`')
        }),
    ))(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    map(
        pair(
            attr_name,
            opt(preceded(
                tuple((multispace0, char('='), multispace0)),
                attr_value,
            )),
        ),
        |(name, value)| (name, value.unwrap_or("")),
    )(input)
}

/// `<name attr=value ...>` or `<name ... />`
fn open_tag(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, (_, name, attrs, _, slash, _)) = tuple((
        char('<'),
        tag_name,
        many0(preceded(multispace1, attribute)),
        multispace0,
        opt(char('/')),
        char('>'),
    ))(input)?;
    Ok((
        rest,
        Token::Open {
            name,
            attrs,
            self_closing: slash.is_some(),
        },
    ))
}

/// `</name>`
fn close_tag(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("</"), tag_name, preceded(multispace0, char('>'))),
        Token::Close,
    )(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("<!--"), take_until("-->"), tag("-->")),
        Token::Comment,
    )(input)
}

fn doctype(input: &str) -> IResult<&str, Token<'_>> {
    map(
        tuple((tag_no_case("<!doctype"), take_until(">"), char('>'))),
        |_| Token::Doctype,
    )(input)
}

fn text(input: &str) -> IResult<&str, Token<'_>> {
    map(take_till1(|c| c == '<'), Token::Text)(input)
}

fn token(input: &str) -> IResult<&str, Token<'_>> {
    alt((comment, doctype, close_tag, open_tag, text))(input)
}

/// Content of a raw text element up to its close tag (or end of input)
fn raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
    let lower = input.to_ascii_lowercase();
    let close = format!("</{}", name);
    match lower.find(&close) {
        Some(pos) => (&input[pos..], &input[..pos]),
        None => ("", input),
    }
}

/// Parse `html` and append the resulting nodes to `parent`
pub fn parse_fragment(arena: &mut DomArena, parent: NodeId, html: &str) -> Result<()> {
    let mut stack: Vec<(NodeId, String)> = vec![(parent, String::new())];
    let mut input = html;

    while !input.is_empty() {
        let top = stack.last().map(|(id, _)| *id).unwrap_or(parent);
        let (rest, tok) = match token(input) {
            Ok(parsed) => parsed,
            // Only a lone `<` that starts no valid construct gets here
            Err(_) => (&input[1..], Token::Text(&input[..1])),
        };
        input = rest;

        match tok {
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                let id = arena.create_element(name);
                {
                    let node = arena.get_mut(id)?;
                    for (key, value) in attrs {
                        let key = key.to_ascii_lowercase();
                        if !node.attributes.contains(&key) {
                            node.attributes.set(key, decode_entities(value));
                        }
                    }
                }
                arena.append_child(top, id)?;

                let name = name.to_ascii_lowercase();
                if self_closing || is_void_element(&name) {
                    continue;
                }
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    let (rest, content) = raw_text(input, &name);
                    if !content.is_empty() {
                        let text_id = arena.create_text(content);
                        arena.append_child(id, text_id)?;
                    }
                    input = rest;
                }
                stack.push((id, name));
            }
            Token::Close(name) => {
                let name = name.to_ascii_lowercase();
                // Index 0 is the fragment parent and is never closed
                if let Some(pos) = stack.iter().skip(1).rposition(|(_, n)| *n == name) {
                    stack.truncate(pos + 1);
                }
            }
            Token::Comment(data) => {
                let id = arena.create_comment(data);
                arena.append_child(top, id)?;
            }
            Token::Doctype => {}
            Token::Text(data) => {
                let id = arena.create_text(decode_entities(data));
                arena.append_child(top, id)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeType;

    fn parse(html: &str) -> DomArena {
        let mut arena = DomArena::new();
        let root = arena.root_id();
        parse_fragment(&mut arena, root, html).unwrap();
        arena
    }

    #[test]
    fn test_tag_parse() {
        assert_eq!(
            open_tag(r#"<div attr1 attr2=two attr3='three' attr4="number four">"#)
                .unwrap()
                .1,
            Token::Open {
                name: "div",
                attrs: vec![
                    ("attr1", ""),
                    ("attr2", "two"),
                    ("attr3", "three"),
                    ("attr4", "number four")
                ],
                self_closing: false,
            }
        );
        assert_eq!(
            open_tag("<br />").unwrap().1,
            Token::Open {
                name: "br",
                attrs: vec![],
                self_closing: true
            }
        );
        assert_eq!(close_tag("</div >").unwrap().1, Token::Close("div"));
    }

    #[test]
    fn test_nested_structure() {
        let arena = parse(r#"<div class=nothing><h1>Hello, world</h1><p></p></div>"#);
        let root = arena.root_id();
        let div = arena.element_children(root).unwrap()[0];
        assert_eq!(arena.get(div).unwrap().attr("class"), Some("nothing"));

        let children = arena.element_children(div).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(arena.get(children[0]).unwrap().node_name, "h1");
        assert_eq!(arena.text_content(children[0]).unwrap(), "Hello, world");
    }

    #[test]
    fn test_void_and_doctype() {
        let arena = parse(
            "<!DOCTYPE html><head><meta name=\"csrf-token\" content=\"T\"><title>a<b</title></head>",
        );
        let root = arena.root_id();
        let head = arena.element_children(root).unwrap()[0];
        let children = arena.element_children(head).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(arena.get(children[0]).unwrap().attr("content"), Some("T"));
        assert_eq!(arena.text_content(children[1]).unwrap(), "a<b");
    }

    #[test]
    fn test_parse_malformed() {
        let arena = parse("<p>1 < 2</span> &amp; <b>bold");
        let root = arena.root_id();
        let p = arena.element_children(root).unwrap()[0];
        assert_eq!(arena.text_content(p).unwrap(), "1 < 2 & bold");
        let b = arena.element_children(p).unwrap()[0];
        assert_eq!(arena.get(b).unwrap().node_name, "b");
    }

    #[test]
    fn test_comments() {
        let arena = parse("<!-- note --><i></i>");
        let root = arena.root_id();
        let first = arena.get(root).unwrap().children_ids[0];
        assert_eq!(arena.get(first).unwrap().node_type, NodeType::Comment);
        assert_eq!(arena.get(first).unwrap().node_value, " note ");
    }
}
