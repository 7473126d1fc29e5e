//! DOT reader and writer for the subset this tool exchanges: graph and
//! digraph headers, node statements with a `size` attribute, chained edge
//! statements with a `weight` attribute, quoted or bare identifiers, and
//! `//`, `/* */`, and `#` comments. Subgraphs are rejected.

use std::fmt::Write as _;

use crate::error::{ClusterError, Result};
use crate::input::{InputGraph, InputLink, InputNode};

/// A parsed DOT document; `graph` holds the node and edge payloads while
/// the header flags are kept for faithful re-emission.
#[derive(Debug, Clone)]
pub struct DotGraph {
    pub graph: InputGraph,
    pub directed: bool,
    pub strict: bool,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Equal,
    UndirectedEdge,
    DirectedEdge,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' => {
                chars.next();
                match chars.next() {
                    Some('/') => {
                        for c in chars.by_ref() {
                            if c == '\n' {
                                break;
                            }
                        }
                    }
                    Some('*') => {
                        let mut last = ' ';
                        let mut closed = false;
                        for c in chars.by_ref() {
                            if last == '*' && c == '/' {
                                closed = true;
                                break;
                            }
                            last = c;
                        }
                        if !closed {
                            return Err(ClusterError::Input("unterminated DOT comment".into()));
                        }
                    }
                    _ => return Err(ClusterError::Input("stray `/` in DOT input".into())),
                }
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        c => value.push(c),
                    }
                }
                if !closed {
                    return Err(ClusterError::Input("unterminated DOT string".into()));
                }
                tokens.push(Token::Ident(value));
            }
            '{' => {
                chars.next();
                tokens.push(Token::LBrace);
            }
            '}' => {
                chars.next();
                tokens.push(Token::RBrace);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ';' => {
                chars.next();
                tokens.push(Token::Semi);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equal);
            }
            '-' => {
                chars.next();
                match chars.peek() {
                    Some('-') => {
                        chars.next();
                        tokens.push(Token::UndirectedEdge);
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::DirectedEdge);
                    }
                    _ => {
                        // A bare `-` starts a negative numeral.
                        let mut value = String::from("-");
                        while let Some(&c) = chars.peek() {
                            if c.is_alphanumeric() || c == '_' || c == '.' {
                                value.push(c);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        tokens.push(Token::Ident(value));
                    }
                }
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        value.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(value));
            }
            other => {
                return Err(ClusterError::Input(format!(
                    "unexpected character `{other}` in DOT input"
                )))
            }
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Ident(value)) => Ok(value),
            other => Err(ClusterError::Input(format!(
                "expected identifier in DOT input, got {other:?}"
            ))),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn attr_list(&mut self) -> Result<Vec<(String, String)>> {
        let mut attrs = Vec::new();
        if !self.eat(&Token::LBracket) {
            return Ok(attrs);
        }
        loop {
            if self.eat(&Token::RBracket) {
                return Ok(attrs);
            }
            let key = self.expect_ident()?;
            if !self.eat(&Token::Equal) {
                return Err(ClusterError::Input(format!(
                    "attribute `{key}` missing `=` in DOT input"
                )));
            }
            let value = self.expect_ident()?;
            attrs.push((key, value));
            while self.eat(&Token::Comma) || self.eat(&Token::Semi) {}
        }
    }
}

fn numeric_attr(attrs: &[(String, String)], key: &str) -> Result<Option<f64>> {
    for (k, v) in attrs {
        if k == key {
            return v
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ClusterError::Input(format!("attribute `{key}={v}` is not numeric")));
        }
    }
    Ok(None)
}

pub fn parse_dot(text: &str) -> Result<DotGraph> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        position: 0,
    };

    let mut header = parser.expect_ident()?;
    let strict = header == "strict";
    if strict {
        header = parser.expect_ident()?;
    }
    let directed = match header.as_str() {
        "digraph" => true,
        "graph" => false,
        other => {
            return Err(ClusterError::Input(format!(
                "expected `graph` or `digraph`, got `{other}`"
            )))
        }
    };
    let name = match parser.peek() {
        Some(Token::Ident(_)) => Some(parser.expect_ident()?),
        _ => None,
    };
    if !parser.eat(&Token::LBrace) {
        return Err(ClusterError::Input("expected `{` in DOT input".into()));
    }

    let mut graph = InputGraph::default();
    loop {
        match parser.peek() {
            None => return Err(ClusterError::Input("unterminated DOT graph body".into())),
            Some(Token::RBrace) => {
                parser.next();
                break;
            }
            Some(Token::Semi) => {
                parser.next();
            }
            Some(Token::LBrace) => {
                return Err(ClusterError::Input("DOT subgraphs are not supported".into()))
            }
            Some(Token::Ident(_)) => {
                let first = parser.expect_ident()?;
                // Default-attribute statements and graph attributes carry no
                // community-relevant payload; parse and discard them.
                if matches!(first.as_str(), "graph" | "node" | "edge")
                    && parser.peek() == Some(&Token::LBracket)
                {
                    parser.attr_list()?;
                    continue;
                }
                if first == "subgraph" {
                    return Err(ClusterError::Input("DOT subgraphs are not supported".into()));
                }
                if parser.eat(&Token::Equal) {
                    parser.expect_ident()?;
                    continue;
                }

                let mut endpoints = vec![first];
                while matches!(
                    parser.peek(),
                    Some(Token::UndirectedEdge) | Some(Token::DirectedEdge)
                ) {
                    parser.next();
                    endpoints.push(parser.expect_ident()?);
                }
                let attrs = parser.attr_list()?;
                if endpoints.len() == 1 {
                    graph.nodes.push(InputNode {
                        id: endpoints.remove(0),
                        size: numeric_attr(&attrs, "size")?,
                    });
                } else {
                    let weight = numeric_attr(&attrs, "weight")?;
                    for pair in endpoints.windows(2) {
                        graph.links.push(InputLink {
                            source: pair[0].clone(),
                            target: pair[1].clone(),
                            weight,
                        });
                    }
                }
            }
            Some(other) => {
                return Err(ClusterError::Input(format!(
                    "unexpected token {other:?} in DOT body"
                )))
            }
        }
    }

    Ok(DotGraph {
        graph,
        directed,
        strict,
        name,
    })
}

/// Re-emits the parsed graph with a `community` attribute on every node.
pub fn write_dot(dot: &DotGraph, class_of: impl Fn(&str) -> Option<usize>) -> String {
    let mut out = String::new();
    if dot.strict {
        out.push_str("strict ");
    }
    out.push_str(if dot.directed { "digraph" } else { "graph" });
    if let Some(name) = &dot.name {
        let _ = write!(out, " {name}");
    }
    out.push_str(" {\n");

    let declared_sizes: std::collections::HashMap<&str, f64> = dot
        .graph
        .nodes
        .iter()
        .filter_map(|node| node.size.map(|s| (node.id.as_str(), s)))
        .collect();
    for id in dot.graph.node_ids() {
        let mut attrs = Vec::new();
        if let Some(community) = class_of(&id) {
            attrs.push(format!("community={community}"));
        }
        if let Some(size) = declared_sizes.get(id.as_str()) {
            attrs.push(format!("size={size}"));
        }
        let _ = write!(out, "  \"{id}\"");
        if !attrs.is_empty() {
            let _ = write!(out, " [{}]", attrs.join(", "));
        }
        out.push_str(";\n");
    }
    let edge_op = if dot.directed { "->" } else { "--" };
    for link in &dot.graph.links {
        let _ = write!(out, "  \"{}\" {edge_op} \"{}\"", link.source, link.target);
        if let Some(weight) = link.weight {
            let _ = write!(out, " [weight={weight}]");
        }
        out.push_str(";\n");
    }
    out.push_str("}\n");
    out
}
