//! Recursive-descent parser from specification text to [`TypestateGraph`].

use super::error::SpecificationError;
use super::lexer::{tokenize, Token, TokenKind};
use crate::core::{
    base_name, split_top_level, Bridge, GenericParam, GraphFlags, Location, State, Transition,
    TypestateGraph,
};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parser for typestate specification blocks.
///
/// A block names the typestate, optionally with generic parameters, and lists
/// its sections:
///
/// ```text
/// File {
///     strict_transitions = true
///     states { Closed, Open, Failed }
///     initial: Closed
///     terminal: Failed
///     transitions {
///         Closed -> (Open | Failed) as OpenResult
///         Open -> Closed
///         * -> Failed
///     }
///     bridges {
///         Open -> io.Stream.Ready
///     }
/// }
/// ```
///
/// Every parsed graph is checked against the structural invariants before it
/// is returned.
#[derive(Debug, Clone, Default)]
pub struct SpecParser {
    file: Option<PathBuf>,
    module: String,
}

impl SpecParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute locations to `file`.
    pub fn file(mut self, file: impl AsRef<Path>) -> Self {
        self.file = Some(file.as_ref().to_path_buf());
        self
    }

    /// Record `module` as the declaring module of parsed graphs.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    /// Parse exactly one typestate block.
    pub fn parse(&self, source: &str) -> Result<TypestateGraph> {
        let mut graphs = self.parse_all(source)?;
        match graphs.len() {
            1 => Ok(graphs.remove(0)),
            0 => Err(self
                .relocate(SpecificationError::UnexpectedEof {
                    expected: "a typestate block".into(),
                    location: Location::new(1, 1),
                })
                .into()),
            _ => {
                let location = graphs[1].location.clone().unwrap_or_default();
                Err(SpecificationError::UnexpectedToken {
                    expected: "end of input".into(),
                    found: format!("typestate '{}'", graphs[1].name),
                    location,
                }
                .into())
            }
        }
    }

    /// Parse a sequence of typestate blocks.
    pub fn parse_all(&self, source: &str) -> Result<Vec<TypestateGraph>> {
        let tokens = tokenize(source).map_err(|e| self.relocate(e))?;
        let mut cursor = Cursor {
            source,
            tokens: &tokens,
            pos: 0,
        };

        let mut graphs = Vec::new();
        loop {
            cursor.skip_separators();
            if cursor.at_end() {
                break;
            }
            let mut graph = cursor.block().map_err(|e| self.relocate(e))?;
            graph.module = self.module.clone();
            if let Some(file) = &self.file {
                graph.location = graph.location.map(|l| l.with_file(file));
                for transition in &mut graph.transitions {
                    transition.location = transition.location.take().map(|l| l.with_file(file));
                }
                for bridge in &mut graph.bridges {
                    bridge.location = bridge.location.take().map(|l| l.with_file(file));
                }
            }
            graph.check_invariants()?;
            debug!(
                typestate = %graph.name,
                states = graph.states.len(),
                transitions = graph.transitions.len(),
                "parsed typestate"
            );
            graphs.push(graph);
        }
        Ok(graphs)
    }

    fn relocate(&self, mut error: SpecificationError) -> SpecificationError {
        if let Some(file) = &self.file {
            error.location_mut().file = Some(file.clone());
        }
        error
    }
}

/// Parse one typestate block with default options.
///
/// ```rust
/// use typestates::spec::parse_typestate;
///
/// let graph = parse_typestate(
///     "File { states { Closed, Open } transitions { Closed -> Open\n Open -> Closed } }",
/// )
/// .unwrap();
/// assert!(graph.has_transition("Closed", "Open"));
/// ```
pub fn parse_typestate(source: &str) -> Result<TypestateGraph> {
    SpecParser::new().parse(source)
}

/// Parse every typestate block in `source`.
pub fn parse_typestates(source: &str) -> Result<Vec<TypestateGraph>> {
    SpecParser::new().parse_all(source)
}

type ParseResult<T> = std::result::Result<T, SpecificationError>;

struct Cursor<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'a TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eof_location(&self) -> Location {
        self.tokens
            .last()
            .map(|t| Location::new(t.line, t.column + (t.end - t.start)))
            .unwrap_or_else(|| Location::new(1, 1))
    }

    fn unexpected(&self, expected: &str) -> SpecificationError {
        match self.peek() {
            Some(token) => SpecificationError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.kind.describe(),
                location: token.location(),
            },
            None => SpecificationError::UnexpectedEof {
                expected: expected.to_string(),
                location: self.eof_location(),
            },
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<&'a Token> {
        self.skip_newlines();
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_is(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self, expected: &str) -> ParseResult<(String, &'a Token)> {
        self.skip_newlines();
        if let Some(token) = self.peek() {
            if let TokenKind::Ident(name) = &token.kind {
                self.pos += 1;
                return Ok((name.clone(), token));
            }
        }
        Err(self.unexpected(expected))
    }

    fn peek_ident(&self) -> Option<&'a str> {
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn skip_separators(&mut self) {
        while matches!(
            self.peek_kind(),
            Some(TokenKind::Newline | TokenKind::Comma | TokenKind::Semi)
        ) {
            self.pos += 1;
        }
    }

    fn block(&mut self) -> ParseResult<TypestateGraph> {
        if self.peek_ident() == Some("typestate") {
            self.pos += 1;
        }
        let (name, name_token) = self.ident("a typestate name")?;
        let mut graph = TypestateGraph::new(name);
        graph.location = Some(name_token.location());

        if self.peek_is(&TokenKind::Lt) {
            graph.generics = self.generic_params()?;
        }
        self.expect(TokenKind::LBrace, "'{' opening the typestate body")?;

        loop {
            self.skip_separators();
            match self.peek_kind() {
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.section(&mut graph)?,
                None => return Err(self.unexpected("'}' closing the typestate body")),
            }
        }

        if graph.states.is_empty() {
            return Err(SpecificationError::EmptyBlock {
                name: graph.name.clone(),
                location: name_token.location(),
            });
        }
        Ok(graph)
    }

    fn generic_params(&mut self) -> ParseResult<Vec<GenericParam>> {
        let open = self.expect(TokenKind::Lt, "'<'")?;
        let close = self.balanced_angle_close()?;
        let inner = &self.source[open.end..close.start];
        Ok(split_top_level(inner, ',')
            .into_iter()
            .map(|param| match param.split_once(':') {
                Some((name, bound)) => GenericParam::bounded(name.trim(), bound.trim()),
                None => GenericParam::new(param),
            })
            .collect())
    }

    /// Consume tokens up to the `>` closing an already consumed `<`.
    fn balanced_angle_close(&mut self) -> ParseResult<&'a Token> {
        let mut depth = 1usize;
        while let Some(token) = self.next() {
            match token.kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(token);
                    }
                }
                TokenKind::LBrace | TokenKind::RBrace => {
                    self.pos -= 1;
                    return Err(self.unexpected("'>' closing the generic arguments"));
                }
                _ => {}
            }
        }
        Err(self.unexpected("'>' closing the generic arguments"))
    }

    fn section(&mut self, graph: &mut TypestateGraph) -> ParseResult<()> {
        let (key, key_token) = self.ident("a section or flag")?;
        match key.as_str() {
            "states" => {
                self.eat(&TokenKind::Colon);
                let states = self.state_list()?;
                graph
                    .states
                    .extend(states.iter().map(|(repr, _)| State::parse(repr)));
            }
            "initial" => {
                self.eat(&TokenKind::Colon);
                let states = self.state_list()?;
                graph
                    .initial_states
                    .extend(states.iter().map(|(repr, _)| base_name(repr)));
            }
            "terminal" => {
                self.eat(&TokenKind::Colon);
                let states = self.state_list()?;
                graph
                    .terminal_states
                    .extend(states.iter().map(|(repr, _)| base_name(repr)));
            }
            "transitions" => {
                self.eat(&TokenKind::Colon);
                self.expect(TokenKind::LBrace, "'{' opening transitions")?;
                while let Some(transition) = self.entry(Self::transition)? {
                    graph.transitions.push(transition);
                }
            }
            "bridges" => {
                self.eat(&TokenKind::Colon);
                self.expect(TokenKind::LBrace, "'{' opening bridges")?;
                while let Some(bridge) = self.entry(Self::bridge)? {
                    graph.bridges.push(bridge);
                }
            }
            _ if self.peek_is(&TokenKind::Eq) => {
                self.pos += 1;
                let value = self.flag_value(&key)?;
                set_flag(&mut graph.flags, &key, value).ok_or_else(|| {
                    SpecificationError::UnknownFlag {
                        name: key.clone(),
                        location: key_token.location(),
                    }
                })?;
            }
            _ => {
                return Err(SpecificationError::UnknownSection {
                    name: key,
                    location: key_token.location(),
                })
            }
        }
        Ok(())
    }

    /// Parse one entry of a braced section, or `None` at the closing brace.
    fn entry<T>(&mut self, parse: fn(&mut Self) -> ParseResult<T>) -> ParseResult<Option<T>> {
        self.skip_separators();
        match self.peek_kind() {
            Some(TokenKind::RBrace) => {
                self.pos += 1;
                Ok(None)
            }
            Some(_) => parse(self).map(Some),
            None => Err(self.unexpected("'}'")),
        }
    }

    fn flag_value(&mut self, name: &str) -> ParseResult<bool> {
        let (value, token) = self.ident("true or false")?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(SpecificationError::InvalidFlagValue {
                name: name.to_string(),
                value,
                location: token.location(),
            }),
        }
    }

    /// A braced list, or an inline comma list ending at a newline or `;`.
    fn state_list(&mut self) -> ParseResult<Vec<(String, Location)>> {
        let mut states = Vec::new();
        if self.peek_is(&TokenKind::LBrace) {
            self.pos += 1;
            while let Some(state) = self.entry(Self::state_ref)? {
                states.push(state);
            }
            return Ok(states);
        }

        states.push(self.state_ref()?);
        while self.eat(&TokenKind::Comma) {
            states.push(self.state_ref()?);
        }
        Ok(states)
    }

    /// A state type expression: `[&['a] [mut]] path [<args>]`, returned as
    /// written in the source.
    fn state_ref(&mut self) -> ParseResult<(String, Location)> {
        self.skip_newlines();
        let first = self.peek().ok_or_else(|| self.unexpected("a state"))?;
        if self.eat(&TokenKind::Amp) {
            if matches!(self.peek_kind(), Some(TokenKind::Lifetime(_))) {
                self.pos += 1;
            }
            if self.peek_ident() == Some("mut") {
                self.pos += 1;
            }
        }
        let (_, mut last) = self.ident("a state")?;
        while self.eat(&TokenKind::PathSep) {
            last = self.ident("a path segment")?.1;
        }
        if self.eat(&TokenKind::Lt) {
            last = self.balanced_angle_close()?;
        }
        let repr = self.source[first.start..last.end].to_string();
        Ok((repr, first.location()))
    }

    fn transition(&mut self) -> ParseResult<Transition> {
        let start = self.peek().ok_or_else(|| self.unexpected("a transition"))?;
        let location = start.location();

        let is_wildcard = self.eat(&TokenKind::Star);
        let from = if is_wildcard {
            crate::core::WILDCARD.to_string()
        } else {
            base_name(&self.state_ref()?.0)
        };
        self.expect(TokenKind::Arrow, "'->'")?;

        let mut to = Vec::new();
        if self.eat(&TokenKind::LParen) {
            to.push(base_name(&self.state_ref()?.0));
            self.skip_newlines();
            while self.eat(&TokenKind::Pipe) {
                to.push(base_name(&self.state_ref()?.0));
                self.skip_newlines();
            }
            self.expect(TokenKind::RParen, "')' closing the destinations")?;
        } else {
            to.push(base_name(&self.state_ref()?.0));
            while self.eat(&TokenKind::Pipe) {
                to.push(base_name(&self.state_ref()?.0));
            }
        }

        let branch_type = if self.peek_ident() == Some("as") {
            self.pos += 1;
            Some(self.ident("a result type name after 'as'")?.0)
        } else {
            None
        };

        let transition = Transition {
            from,
            to,
            is_wildcard,
            branch_type,
            location: Some(location.clone()),
        };

        match (&transition.branch_type, transition.is_branching()) {
            (None, true) => Err(SpecificationError::MissingBranchName {
                transition: transition.to_string(),
                location,
            }),
            (Some(name), false) => Err(SpecificationError::UnexpectedBranchName {
                transition: format!("{} -> {}", transition.from, transition.to.join(" | ")),
                name: name.clone(),
                location,
            }),
            _ => Ok(transition),
        }
    }

    fn bridge(&mut self) -> ParseResult<Bridge> {
        let (from, location) = self.state_ref()?;
        self.expect(TokenKind::Arrow, "'->'")?;

        let (first, first_token) = self.ident("a bridge destination")?;
        let mut segments = vec![first];
        let mut last = first_token;
        while self.eat(&TokenKind::Dot) {
            let (segment, token) = self.ident("a bridge destination segment")?;
            segments.push(segment);
            last = token;
        }

        if segments.len() < 2 {
            return Err(SpecificationError::InvalidBridge {
                text: self.source[first_token.start..last.end].to_string(),
                location: first_token.location(),
            });
        }

        let to_state = segments.pop().unwrap_or_default();
        let to_graph = segments.pop().unwrap_or_default();
        let mut bridge = Bridge::new(base_name(&from), to_graph, to_state).at(location);
        if !segments.is_empty() {
            bridge = bridge.with_module(segments.join("."));
        }
        Ok(bridge)
    }
}

fn set_flag(flags: &mut GraphFlags, name: &str, value: bool) -> Option<()> {
    match name {
        "strict_transitions" => flags.strict_transitions = value,
        "sealed" => flags.sealed = value,
        "consume_on_transition" => flags.consume_on_transition = value,
        _ => return None,
    }
    Some(())
}
