use cssparser::{
    AtRuleParser, BasicParseErrorKind, CowRcStr, DeclarationParser, ParseError, Parser,
    ParserInput, ParserState, QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
    StyleSheetParser, Token,
};
use indextree::NodeId;
use tracing::{debug, warn};

use crate::{
    error::{ErrorAction, ErrorKind, UtilityModulesError},
    stylesheet::{CssNode, Stylesheet},
    UtilityModulesResult,
};

/// Reads CSS text into a fresh `Stylesheet`.
///
/// Tokenizing and block matching are left to `cssparser`; every rule,
/// at-rule and declaration is appended to the arena as soon as it is read.
/// Invalid items inside a block are skipped the way browsers do, while an
/// invalid item at the root fails the whole document.
pub(crate) fn parse(css: &str) -> UtilityModulesResult<Stylesheet> {
    let mut stylesheet = Stylesheet::new();
    let root = stylesheet.root();
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut builder = TreeBuilder {
        stylesheet: &mut stylesheet,
        parent: root,
    };

    for item in StyleSheetParser::new(&mut parser, &mut builder) {
        if let Err((error, slice)) = item {
            return Err(UtilityModulesError::raise_critical_stylesheet_error(
                ErrorKind::StylesheetParsingError,
                &format!(
                    "Invalid CSS at line {}, column {}: `{}`",
                    error.location.line + 1,
                    error.location.column,
                    slice.trim()
                ),
                ErrorAction::Fix,
            ));
        }
    }

    debug!(
        num_nodes = stylesheet.descendants(root).len(),
        "Stylesheet parsed"
    );

    Ok(stylesheet)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Consumes what is left of the current item and returns its source text.
fn consume_remaining<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();

    while input.next_including_whitespace_and_comments().is_ok() {}

    input.slice_from(start)
}

/// Appends what it reads under `parent`.
struct TreeBuilder<'a> {
    stylesheet: &'a mut Stylesheet,
    parent: NodeId,
}

impl<'a> TreeBuilder<'a> {
    fn append(&mut self, node: NodeId) {
        self.stylesheet.append(self.parent, node);
    }

    /// Reads a block body (declarations, nested rules and at-rules) into `parent`.
    fn parse_body(&mut self, parent: NodeId, input: &mut Parser<'_, '_>) {
        let mut body = TreeBuilder {
            stylesheet: &mut *self.stylesheet,
            parent,
        };

        for item in RuleBodyParser::new(input, &mut body) {
            if let Err((error, slice)) = item {
                warn!(
                    text = %slice.trim(),
                    line = error.location.line + 1,
                    "Skipping invalid CSS"
                );
            }
        }
    }
}

impl<'i, 'a> QualifiedRuleParser<'i> for TreeBuilder<'a> {
    type Prelude = String;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let selector = collapse_whitespace(consume_remaining(input));

        if selector.is_empty() {
            return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
        }

        Ok(selector)
    }

    fn parse_block<'t>(
        &mut self,
        selector: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let rule = self.stylesheet.create_rule(&selector);

        self.append(rule);
        self.parse_body(rule, input);

        Ok(())
    }
}

impl<'i, 'a> AtRuleParser<'i> for TreeBuilder<'a> {
    type Prelude = (String, String);
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Ok((name.to_string(), collapse_whitespace(consume_remaining(input))))
    }

    fn rule_without_block(
        &mut self,
        (name, params): Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        let at_rule = self.stylesheet.create_node(CssNode::AtRule {
            name,
            params,
            has_block: false,
        });

        self.append(at_rule);

        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        (name, params): Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        let at_rule = self.stylesheet.create_at_rule(&name, &params);

        self.append(at_rule);
        self.parse_body(at_rule, input);

        Ok(())
    }
}

impl<'i, 'a> DeclarationParser<'i> for TreeBuilder<'a> {
    type Declaration = ();
    type Error = ();

    /// Keeps the raw value text, priority flag included.
    ///
    /// A value holding a `{}` block is rejected so that the body parser
    /// retries the item as a nested rule (`a:hover { ... }`).
    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();

        loop {
            let is_block = match input.next_including_whitespace_and_comments() {
                Ok(token) => matches!(token, Token::CurlyBracketBlock),
                Err(_) => break,
            };

            if is_block {
                return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
            }
        }

        let value = input.slice_from(start).trim();
        let declaration = self.stylesheet.create_declaration(&name, value);

        self.append(declaration);

        Ok(())
    }
}

impl<'i, 'a> RuleBodyItemParser<'i, (), ()> for TreeBuilder<'a> {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        true
    }
}
