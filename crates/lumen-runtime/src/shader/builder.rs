// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Shader template parsing and variant generation.
//!
//! Templates are shader source with a small set of directives:
//!
//! ```text
//! @property(USE_NORMAL_MAP && !USE_PARALLAX)   conditional block
//! @else
//! @end
//! @value(NUMBER_OF_LIGHTS)                     inserts the switch value
//! @piece(Lighting) ... @end                    defines a named piece
//! @insertpiece(Lighting)                       inserts a defined piece
//! @includepiece(Example/ShaderPiece/Core/Math) registers the pieces of a piece asset
//! ```
//!
//! Expressions combine switch names with `!`, `&&`, `||` and parentheses. A
//! switch is on iff its value in the [`ShaderProperties`] is non-zero.
//!
//! Generation runs in two phases: the first registers every piece reachable
//! under the active conditions (including pieces of included assets), the
//! second emits the source, so a piece can be inserted before the block that
//! defines it.

use super::properties::ShaderProperties;
use crate::error::ShaderBuilderError;
use ahash::{AHashMap, AHashSet};
use lumen_core::asset::AssetId;
use lumen_core::PropertyId;
use std::sync::Arc;

/// Deepest allowed nesting of `@insertpiece` and `@includepiece`.
pub const MAXIMUM_PIECE_DEPTH: u32 = 32;

/// A boolean combination of shader switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A switch, on iff non-zero.
    Property(PropertyId),
    /// Negation.
    Not(Box<Expression>),
    /// Both operands on.
    And(Box<Expression>, Box<Expression>),
    /// Either operand on.
    Or(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Evaluates the expression against a set of switches.
    pub fn evaluate(&self, properties: &ShaderProperties) -> bool {
        match self {
            Expression::Property(id) => properties.contains(*id),
            Expression::Not(inner) => !inner.evaluate(properties),
            Expression::And(lhs, rhs) => lhs.evaluate(properties) && rhs.evaluate(properties),
            Expression::Or(lhs, rhs) => lhs.evaluate(properties) || rhs.evaluate(properties),
        }
    }

    fn collect_properties(&self, out: &mut Vec<PropertyId>) {
        match self {
            Expression::Property(id) => out.push(*id),
            Expression::Not(inner) => inner.collect_properties(out),
            Expression::And(lhs, rhs) | Expression::Or(lhs, rhs) => {
                lhs.collect_properties(out);
                rhs.collect_properties(out);
            }
        }
    }
}

/// A parsed template node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal source.
    Text(String),
    /// `@property(..) .. @else .. @end`.
    Property {
        /// The condition.
        condition: Expression,
        /// Emitted when the condition holds.
        then: Vec<Node>,
        /// Emitted otherwise.
        otherwise: Vec<Node>,
    },
    /// `@value(NAME)`.
    Value(PropertyId),
    /// `@piece(NAME) .. @end`.
    Piece {
        /// Piece name.
        name: String,
        /// Piece body.
        body: Arc<[Node]>,
    },
    /// `@insertpiece(NAME)`.
    InsertPiece(String),
    /// `@includepiece(ASSET_NAME)`.
    IncludePiece(AssetId),
}

/// Supplies the parsed templates of shader piece assets.
pub trait PieceSource {
    /// The parsed piece asset, if loaded.
    fn piece_template(&self, asset_id: AssetId) -> Option<Arc<ShaderTemplate>>;
}

/// A source without any piece.
pub struct NoPieces;

impl PieceSource for NoPieces {
    fn piece_template(&self, _asset_id: AssetId) -> Option<Arc<ShaderTemplate>> {
        None
    }
}

impl PieceSource for AHashMap<AssetId, Arc<ShaderTemplate>> {
    fn piece_template(&self, asset_id: AssetId) -> Option<Arc<ShaderTemplate>> {
        self.get(&asset_id).cloned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Property,
    Else,
    End,
    Value,
    Piece,
    InsertPiece,
    IncludePiece,
}

impl DirectiveKind {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "property" => Self::Property,
            "else" => Self::Else,
            "end" => Self::End,
            "value" => Self::Value,
            "piece" => Self::Piece,
            "insertpiece" => Self::InsertPiece,
            "includepiece" => Self::IncludePiece,
            _ => return None,
        })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Else => "else",
            Self::End => "end",
            Self::Value => "value",
            Self::Piece => "piece",
            Self::InsertPiece => "insertpiece",
            Self::IncludePiece => "includepiece",
        }
    }

    const fn takes_argument(self) -> bool {
        !matches!(self, Self::Else | Self::End)
    }

    // Block directives sit on their own line; eat the line break after them.
    const fn swallows_newline(self) -> bool {
        !matches!(self, Self::Value | Self::InsertPiece)
    }
}

#[derive(Debug)]
enum Token<'a> {
    Text(&'a str),
    Directive {
        kind: DirectiveKind,
        argument: &'a str,
        line: u32,
    },
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, ShaderBuilderError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut position = 0;
    let mut line = 1u32;
    let mut line_scanned_to = 0;

    while position < bytes.len() {
        if bytes[position] != b'@' {
            position += 1;
            continue;
        }
        let name_start = position + 1;
        let mut name_end = name_start;
        while name_end < bytes.len() && is_identifier_byte(bytes[name_end]) {
            name_end += 1;
        }
        let Some(kind) = DirectiveKind::from_name(&source[name_start..name_end]) else {
            position = name_end;
            continue;
        };

        line += bytes[line_scanned_to..position]
            .iter()
            .filter(|byte| **byte == b'\n')
            .count() as u32;
        line_scanned_to = position;

        if text_start < position {
            tokens.push(Token::Text(&source[text_start..position]));
        }

        let mut end = name_end;
        let mut argument = "";
        if kind.takes_argument() {
            if bytes.get(end) != Some(&b'(') {
                return Err(ShaderBuilderError::MissingArgument {
                    directive: kind.name(),
                    line,
                });
            }
            let mut depth = 0u32;
            let mut cursor = end;
            loop {
                match bytes.get(cursor) {
                    None => {
                        return Err(ShaderBuilderError::UnterminatedArgument {
                            directive: kind.name(),
                            line,
                        })
                    }
                    Some(b'(') => depth += 1,
                    Some(b')') => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    Some(_) => {}
                }
                cursor += 1;
            }
            argument = source[end + 1..cursor].trim();
            end = cursor + 1;
        }
        if kind.swallows_newline() {
            if bytes.get(end) == Some(&b'\r') && bytes.get(end + 1) == Some(&b'\n') {
                end += 2;
            } else if bytes.get(end) == Some(&b'\n') {
                end += 1;
            }
        }
        tokens.push(Token::Directive {
            kind,
            argument,
            line,
        });
        position = end;
        text_start = end;
    }
    if text_start < bytes.len() {
        tokens.push(Token::Text(&source[text_start..]));
    }
    Ok(tokens)
}

struct ExpressionParser<'a> {
    source: &'a str,
    position: usize,
    line: u32,
}

impl<'a> ExpressionParser<'a> {
    fn error(&self, reason: &'static str) -> ShaderBuilderError {
        ShaderBuilderError::InvalidExpression {
            expression: self.source.to_string(),
            reason,
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        while self
            .source
            .as_bytes()
            .get(self.position)
            .is_some_and(u8::is_ascii_whitespace)
        {
            self.position += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.source[self.position..].starts_with(token) {
            self.position += token.len();
            true
        } else {
            false
        }
    }

    fn parse(mut self) -> Result<Expression, ShaderBuilderError> {
        let expression = self.parse_or()?;
        self.skip_whitespace();
        if self.position != self.source.len() {
            return Err(self.error("unexpected trailing characters"));
        }
        Ok(expression)
    }

    fn parse_or(&mut self) -> Result<Expression, ShaderBuilderError> {
        let mut lhs = self.parse_and()?;
        while self.eat("||") {
            let rhs = self.parse_and()?;
            lhs = Expression::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression, ShaderBuilderError> {
        let mut lhs = self.parse_unary()?;
        while self.eat("&&") {
            let rhs = self.parse_unary()?;
            lhs = Expression::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expression, ShaderBuilderError> {
        if self.eat("!") {
            return Ok(Expression::Not(Box::new(self.parse_unary()?)));
        }
        if self.eat("(") {
            let inner = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("missing ')'"));
            }
            return Ok(inner);
        }
        self.skip_whitespace();
        let start = self.position;
        let bytes = self.source.as_bytes();
        while self.position < bytes.len() && is_identifier_byte(bytes[self.position]) {
            self.position += 1;
        }
        if start == self.position {
            return Err(self.error("expected a property name"));
        }
        Ok(Expression::Property(PropertyId::from_name(
            &self.source[start..self.position],
        )))
    }
}

fn parse_identifier(
    argument: &str,
    directive: DirectiveKind,
    line: u32,
) -> Result<String, ShaderBuilderError> {
    if argument.is_empty() || !argument.bytes().all(is_identifier_byte) {
        return Err(ShaderBuilderError::InvalidName {
            directive: directive.name(),
            name: argument.to_string(),
            line,
        });
    }
    Ok(argument.to_string())
}

struct TemplateParser<'a> {
    tokens: std::vec::IntoIter<Token<'a>>,
}

impl TemplateParser<'_> {
    /// Parses nodes up to a closing `@else`/`@end`, or the end of input at top level.
    fn parse_nodes(
        &mut self,
        opener: Option<(DirectiveKind, u32)>,
    ) -> Result<(Vec<Node>, Option<DirectiveKind>), ShaderBuilderError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            let (kind, argument, line) = match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.to_string()));
                    continue;
                }
                Token::Directive {
                    kind,
                    argument,
                    line,
                } => (kind, argument, line),
            };
            match kind {
                DirectiveKind::Else | DirectiveKind::End => {
                    if opener.is_none() {
                        return Err(ShaderBuilderError::UnexpectedDirective {
                            directive: kind.name(),
                            line,
                        });
                    }
                    return Ok((nodes, Some(kind)));
                }
                DirectiveKind::Property => {
                    let condition = ExpressionParser {
                        source: argument,
                        position: 0,
                        line,
                    }
                    .parse()?;
                    let (then, closer) = self.parse_nodes(Some((kind, line)))?;
                    let otherwise = if closer == Some(DirectiveKind::Else) {
                        let (otherwise, closer) = self.parse_nodes(Some((kind, line)))?;
                        if closer != Some(DirectiveKind::End) {
                            return Err(ShaderBuilderError::UnexpectedDirective {
                                directive: DirectiveKind::Else.name(),
                                line,
                            });
                        }
                        otherwise
                    } else {
                        Vec::new()
                    };
                    nodes.push(Node::Property {
                        condition,
                        then,
                        otherwise,
                    });
                }
                DirectiveKind::Piece => {
                    let name = parse_identifier(argument, kind, line)?;
                    let (body, closer) = self.parse_nodes(Some((kind, line)))?;
                    if closer != Some(DirectiveKind::End) {
                        return Err(ShaderBuilderError::UnexpectedDirective {
                            directive: DirectiveKind::Else.name(),
                            line,
                        });
                    }
                    nodes.push(Node::Piece {
                        name,
                        body: body.into(),
                    });
                }
                DirectiveKind::Value => {
                    let name = parse_identifier(argument, kind, line)?;
                    nodes.push(Node::Value(PropertyId::from_name(&name)));
                }
                DirectiveKind::InsertPiece => {
                    nodes.push(Node::InsertPiece(parse_identifier(argument, kind, line)?));
                }
                DirectiveKind::IncludePiece => {
                    let asset_id = AssetId::from_asset_name(argument).map_err(|_| {
                        ShaderBuilderError::InvalidName {
                            directive: kind.name(),
                            name: argument.to_string(),
                            line,
                        }
                    })?;
                    nodes.push(Node::IncludePiece(asset_id));
                }
            }
        }
        match opener {
            Some((kind, line)) => Err(ShaderBuilderError::UnterminatedBlock {
                directive: kind.name(),
                line,
            }),
            None => Ok((nodes, None)),
        }
    }
}

/// A parsed shader template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderTemplate {
    nodes: Vec<Node>,
}

impl ShaderTemplate {
    /// Parses template source.
    pub fn parse(source: &str) -> Result<Self, ShaderBuilderError> {
        let mut parser = TemplateParser {
            tokens: tokenize(source)?.into_iter(),
        };
        let (nodes, _) = parser.parse_nodes(None)?;
        Ok(Self { nodes })
    }

    /// Top level nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every switch the template reads, sorted and deduplicated.
    ///
    /// Switches read only by included piece assets are not part of the result;
    /// see [`ShaderTemplate::included_pieces`].
    pub fn referenced_properties(&self) -> Vec<PropertyId> {
        fn walk(nodes: &[Node], out: &mut Vec<PropertyId>) {
            for node in nodes {
                match node {
                    Node::Property {
                        condition,
                        then,
                        otherwise,
                    } => {
                        condition.collect_properties(out);
                        walk(then, out);
                        walk(otherwise, out);
                    }
                    Node::Value(id) => out.push(*id),
                    Node::Piece { body, .. } => walk(body, out),
                    Node::Text(_) | Node::InsertPiece(_) | Node::IncludePiece(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out.sort();
        out.dedup();
        out
    }

    /// Piece assets included anywhere in the template, sorted and deduplicated.
    pub fn included_pieces(&self) -> Vec<AssetId> {
        fn walk(nodes: &[Node], out: &mut Vec<AssetId>) {
            for node in nodes {
                match node {
                    Node::Property { then, otherwise, .. } => {
                        walk(then, out);
                        walk(otherwise, out);
                    }
                    Node::Piece { body, .. } => walk(body, out),
                    Node::IncludePiece(asset_id) => out.push(*asset_id),
                    Node::Text(_) | Node::Value(_) | Node::InsertPiece(_) => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out.sort();
        out.dedup();
        out
    }
}

/// Generates shader source from templates.
pub struct ShaderBuilder<'a> {
    properties: &'a ShaderProperties,
    piece_source: &'a dyn PieceSource,
    pieces: AHashMap<String, Arc<[Node]>>,
    // Piece assets already registered; also breaks include cycles.
    included: AHashSet<AssetId>,
}

impl<'a> ShaderBuilder<'a> {
    /// Creates a builder for one combination of switches.
    pub fn new(properties: &'a ShaderProperties, piece_source: &'a dyn PieceSource) -> Self {
        Self {
            properties,
            piece_source,
            pieces: AHashMap::new(),
            included: AHashSet::new(),
        }
    }

    /// Generates the source of `template` for the builder's switches.
    pub fn generate(mut self, template: &ShaderTemplate) -> Result<String, ShaderBuilderError> {
        self.register_pieces(template.nodes(), 0)?;
        let mut out = String::new();
        self.emit(template.nodes(), &mut out, 0)?;
        Ok(out)
    }

    fn register_pieces(&mut self, nodes: &[Node], depth: u32) -> Result<(), ShaderBuilderError> {
        for node in nodes {
            match node {
                Node::Property {
                    condition,
                    then,
                    otherwise,
                } => {
                    let branch = if condition.evaluate(self.properties) {
                        then
                    } else {
                        otherwise
                    };
                    self.register_pieces(branch, depth)?;
                }
                Node::Piece { name, body } => {
                    if self.pieces.insert(name.clone(), body.clone()).is_some() {
                        log::trace!("Shader piece '{}' redefined", name);
                    }
                }
                Node::IncludePiece(asset_id) => {
                    if !self.included.insert(*asset_id) {
                        continue;
                    }
                    if depth >= MAXIMUM_PIECE_DEPTH {
                        return Err(ShaderBuilderError::RecursionLimit {
                            name: asset_id.to_string(),
                            limit: MAXIMUM_PIECE_DEPTH,
                        });
                    }
                    let template = self
                        .piece_source
                        .piece_template(*asset_id)
                        .ok_or(ShaderBuilderError::PieceNotFound(*asset_id))?;
                    self.register_pieces(template.nodes(), depth + 1)?;
                }
                Node::Text(_) | Node::Value(_) | Node::InsertPiece(_) => {}
            }
        }
        Ok(())
    }

    fn emit(&self, nodes: &[Node], out: &mut String, depth: u32) -> Result<(), ShaderBuilderError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Property {
                    condition,
                    then,
                    otherwise,
                } => {
                    let branch = if condition.evaluate(self.properties) {
                        then
                    } else {
                        otherwise
                    };
                    self.emit(branch, out, depth)?;
                }
                Node::Value(id) => out.push_str(&self.properties.get(*id).to_string()),
                Node::InsertPiece(name) => match self.pieces.get(name) {
                    Some(body) => {
                        if depth >= MAXIMUM_PIECE_DEPTH {
                            return Err(ShaderBuilderError::RecursionLimit {
                                name: name.clone(),
                                limit: MAXIMUM_PIECE_DEPTH,
                            });
                        }
                        self.emit(body, out, depth + 1)?;
                    }
                    None => log::trace!("Inserting undefined shader piece '{}'", name),
                },
                Node::Piece { .. } | Node::IncludePiece(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(source: &str, pairs: &[(&str, i32)]) -> String {
        let properties = ShaderProperties::from_pairs(
            pairs
                .iter()
                .map(|(name, value)| (PropertyId::from_name(name), *value)),
        );
        let template = ShaderTemplate::parse(source).unwrap();
        ShaderBuilder::new(&properties, &NoPieces)
            .generate(&template)
            .unwrap()
    }

    #[test]
    fn conditional_blocks() {
        let source = "a\n@property(USE_NORMAL_MAP)\nnormal\n@else\nflat\n@end\nb";
        assert_eq!(generate(source, &[("USE_NORMAL_MAP", 1)]), "a\nnormal\nb");
        assert_eq!(generate(source, &[]), "a\nflat\nb");
    }

    #[test]
    fn expressions() {
        let source = "@property(A && (!B || C))\nyes\n@end\n";
        assert_eq!(generate(source, &[("A", 1)]), "yes\n");
        assert_eq!(generate(source, &[("A", 1), ("B", 1)]), "");
        assert_eq!(generate(source, &[("A", 1), ("B", 1), ("C", 2)]), "yes\n");
        assert_eq!(generate(source, &[("B", 1), ("C", 1)]), "");
    }

    #[test]
    fn values_and_pieces() {
        let source = "@insertpiece(Body)\n@piece(Body)\nlights = @value(NUMBER_OF_LIGHTS);\n@end\n";
        assert_eq!(generate(source, &[("NUMBER_OF_LIGHTS", 4)]), "lights = 4;\n\n");
    }

    #[test]
    fn undefined_pieces_insert_nothing() {
        assert_eq!(generate("x@insertpiece(Missing)y", &[]), "xy");
    }

    #[test]
    fn unknown_at_words_are_text() {
        assert_eq!(generate("float4 x = y; // @todo", &[]), "float4 x = y; // @todo");
    }

    #[test]
    fn included_pieces_are_registered() {
        let piece_id = AssetId::from_name("Example/ShaderPiece/Core/Math");
        let mut pieces = AHashMap::new();
        pieces.insert(
            piece_id,
            Arc::new(ShaderTemplate::parse("@piece(Square)x * x@end").unwrap()),
        );
        let template = ShaderTemplate::parse(
            "@includepiece(Example/ShaderPiece/Core/Math)\ny = @insertpiece(Square);",
        )
        .unwrap();
        assert_eq!(template.included_pieces(), vec![piece_id]);
        let properties = ShaderProperties::new();
        let source = ShaderBuilder::new(&properties, &pieces)
            .generate(&template)
            .unwrap();
        assert_eq!(source, "y = x * x;");

        let error = ShaderBuilder::new(&properties, &NoPieces)
            .generate(&template)
            .unwrap_err();
        assert_eq!(error, ShaderBuilderError::PieceNotFound(piece_id));
    }

    #[test]
    fn recursive_pieces_hit_the_limit() {
        let template = ShaderTemplate::parse("@piece(Loop)@insertpiece(Loop)@end@insertpiece(Loop)").unwrap();
        let properties = ShaderProperties::new();
        let error = ShaderBuilder::new(&properties, &NoPieces)
            .generate(&template)
            .unwrap_err();
        assert!(matches!(error, ShaderBuilderError::RecursionLimit { .. }));
    }

    #[test]
    fn referenced_properties_cover_every_branch_and_piece() {
        let template = ShaderTemplate::parse(
            "@property(A)@property(B)@end@else@value(C)@end@piece(P)@property(!D)@end@end",
        )
        .unwrap();
        let mut expected: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|name| PropertyId::from_name(name))
            .collect();
        expected.sort();
        assert_eq!(template.referenced_properties(), expected);
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert!(matches!(
            ShaderTemplate::parse("@property(A)\nno end"),
            Err(ShaderBuilderError::UnterminatedBlock { line: 1, .. })
        ));
        assert!(matches!(
            ShaderTemplate::parse("x\n@end"),
            Err(ShaderBuilderError::UnexpectedDirective { line: 2, .. })
        ));
        assert!(matches!(
            ShaderTemplate::parse("@property A"),
            Err(ShaderBuilderError::MissingArgument { .. })
        ));
        assert!(matches!(
            ShaderTemplate::parse("@property(A &&)x@end"),
            Err(ShaderBuilderError::InvalidExpression { .. })
        ));
        assert!(matches!(
            ShaderTemplate::parse("@includepiece(NotAnAsset)"),
            Err(ShaderBuilderError::InvalidName { .. })
        ));
    }
}
