//! CSS Parser per [§ 5 Parsing](https://www.w3.org/TR/css-syntax-3/#parsing).
//!
//! This parser works directly on the source text rather than on a token
//! stream. It recognizes the block structure of a stylesheet (rules, at-rules,
//! declarations) and keeps selector preludes and declaration values as
//! trimmed source text. Values are interpreted later by the property schema.
//!
//! Parsing never fails; malformed constructs are skipped the way the syntax
//! module's error recovery skips them.

/// [§ 5.4.6 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
///
/// A CSS declaration (e.g., `color: red`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The property name, lowercased unless it is a custom property.
    pub name: String,
    /// The property value as trimmed source text, without `!important`.
    pub value: String,
    /// Whether the declaration has `!important`.
    pub important: bool,
}

impl Declaration {
    /// Build a declaration by hand.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            important: false,
        }
    }
}

/// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
///
/// A CSS style rule (selector list + declarations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// The comma-separated selectors of the prelude, trimmed.
    pub selectors: Vec<String>,
    /// The declarations in this rule block, in source order.
    pub declarations: Vec<Declaration>,
}

/// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    /// The at-keyword name (without the `@`), lowercased.
    pub name: String,
    /// The prelude source text, trimmed.
    pub prelude: String,
    /// The raw block contents, if the rule has a block.
    pub block: Option<String>,
}

impl AtRule {
    /// Parse the block as a nested list of rules (`@media`, `@supports`).
    #[must_use]
    pub fn nested_rules(&self) -> Vec<Rule> {
        self.block
            .as_deref()
            .map(|block| CSSParser::new(block).consume_list_of_rules(false))
            .unwrap_or_default()
    }
}

/// [§ 5.3.3 Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// A style rule (qualified rule).
    Style(StyleRule),
    /// An at-rule.
    At(AtRule),
}

/// [§ 5.3.2 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stylesheet {
    /// The list of rules in the stylesheet.
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    /// Parse a stylesheet from source text.
    #[must_use]
    pub fn parse(css: &str) -> Self {
        CSSParser::new(css).parse_stylesheet()
    }
}

/// CSS parser over comment-free source characters.
#[derive(Debug)]
pub struct CSSParser {
    input: Vec<char>,
    position: usize,
}

impl CSSParser {
    /// Create a new parser over `css`. Comments are removed up front.
    #[must_use]
    pub fn new(css: &str) -> Self {
        Self {
            input: strip_comments(css).chars().collect(),
            position: 0,
        }
    }

    /// [§ 5.3.3 Parse a stylesheet](https://www.w3.org/TR/css-syntax-3/#parse-stylesheet)
    ///
    /// "To parse a stylesheet from input..."
    pub fn parse_stylesheet(&mut self) -> Stylesheet {
        // "Consume a list of rules from input, with the top-level flag set."
        Stylesheet {
            rules: self.consume_list_of_rules(true),
        }
    }

    /// [§ 5.3.6 Parse a list of declarations](https://www.w3.org/TR/css-syntax-3/#parse-list-of-declarations)
    ///
    /// Parse declarations from a `style` attribute or a rule block.
    pub fn parse_declaration_list(&mut self) -> Vec<Declaration> {
        let text: String = self.input[self.position..].iter().collect();
        self.position = self.input.len();
        parse_declarations(&text)
    }

    /// [§ 5.4.1 Consume a list of rules](https://www.w3.org/TR/css-syntax-3/#consume-list-of-rules)
    fn consume_list_of_rules(&mut self, top_level: bool) -> Vec<Rule> {
        let mut rules = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                // "<EOF-token>"
                // "Return the list of rules."
                None => return rules,

                // "<CDO-token>" or "<CDC-token>"
                // "If the top-level flag is set, do nothing."
                Some('<') if top_level && self.starts_with("<!--") => self.position += 4,
                Some('-') if top_level && self.starts_with("-->") => self.position += 3,

                // "<at-keyword-token>"
                // "Reconsume the current input token. Consume an at-rule, and append
                // the returned value to the list of rules."
                Some('@') => {
                    if let Some(at_rule) = self.consume_at_rule() {
                        rules.push(Rule::At(at_rule));
                    }
                }

                // A stray close brace left over from broken nesting.
                Some('}') => self.position += 1,

                // "anything else"
                // "Reconsume the current input token. Consume a qualified rule. If
                // anything is returned, append it to the list of rules."
                Some(_) => {
                    if let Some(rule) = self.consume_qualified_rule() {
                        rules.push(Rule::Style(rule));
                    }
                }
            }
        }
    }

    /// [§ 5.4.2 Consume an at-rule](https://www.w3.org/TR/css-syntax-3/#consume-at-rule)
    fn consume_at_rule(&mut self) -> Option<AtRule> {
        // Consume the '@' and the keyword that follows.
        self.position += 1;
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_char(c)) {
            name.push(c);
            self.position += 1;
        }
        if name.is_empty() {
            // Not an at-keyword: recover like an unknown qualified rule.
            let _ = self.consume_qualified_rule();
            return None;
        }

        let mut prelude = String::new();
        loop {
            match self.peek() {
                // "<semicolon-token>"
                // "Return the at-rule."
                Some(';') => {
                    self.position += 1;
                    return Some(AtRule {
                        name: name.to_ascii_lowercase(),
                        prelude: prelude.trim().to_string(),
                        block: None,
                    });
                }

                // "<EOF-token>"
                // "This is a parse error. Return the at-rule."
                None => {
                    return Some(AtRule {
                        name: name.to_ascii_lowercase(),
                        prelude: prelude.trim().to_string(),
                        block: None,
                    });
                }

                // "<{-token>"
                // "Consume a simple block and assign it to the at-rule's block."
                Some('{') => {
                    let block = self.consume_simple_block();
                    return Some(AtRule {
                        name: name.to_ascii_lowercase(),
                        prelude: prelude.trim().to_string(),
                        block: Some(block),
                    });
                }

                // "anything else"
                // "Consume a component value. Append the returned value to the
                // at-rule's prelude."
                Some(_) => self.consume_component_into(&mut prelude),
            }
        }
    }

    /// [§ 5.4.3 Consume a qualified rule](https://www.w3.org/TR/css-syntax-3/#consume-qualified-rule)
    fn consume_qualified_rule(&mut self) -> Option<StyleRule> {
        let mut prelude = String::new();

        loop {
            match self.peek() {
                // "<EOF-token>"
                // "This is a parse error. Return nothing."
                None => return None,

                // "<{-token>"
                // "Consume a simple block and assign it to the qualified rule's block.
                // Return the qualified rule."
                Some('{') => {
                    let block = self.consume_simple_block();
                    return Some(StyleRule {
                        // [§ 5.1 Selector Lists](https://www.w3.org/TR/selectors-4/#selector-list)
                        // "A selector list is a comma-separated list of selectors"
                        selectors: split_top_level(&prelude, ',')
                            .into_iter()
                            .map(|s| s.trim().to_string())
                            .collect(),
                        declarations: parse_declarations(&block),
                    });
                }

                // "anything else"
                // "Consume a component value. Append the returned value to the
                // qualified rule's prelude."
                Some(_) => self.consume_component_into(&mut prelude),
            }
        }
    }

    /// [§ 5.4.7 Consume a simple block](https://www.w3.org/TR/css-syntax-3/#consume-simple-block)
    ///
    /// Consumes a `{ ... }` block and returns its inner text. Nested blocks
    /// and strings are kept intact.
    fn consume_simple_block(&mut self) -> String {
        // '{'
        self.position += 1;
        let mut depth = 1usize;
        let mut out = String::new();

        while let Some(c) = self.peek() {
            match c {
                '"' | '\'' => {
                    self.consume_string_into(&mut out);
                    continue;
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.position += 1;
                        return out;
                    }
                }
                _ => {}
            }
            out.push(c);
            self.position += 1;
        }
        // "<EOF-token>": "This is a parse error. Return the block."
        out
    }

    /// [§ 5.4.8 Consume a component value](https://www.w3.org/TR/css-syntax-3/#consume-component-value)
    ///
    /// Copies one component (a character, a whole string or a whole
    /// bracketed group) into `out`.
    fn consume_component_into(&mut self, out: &mut String) {
        match self.peek() {
            Some('"' | '\'') => self.consume_string_into(out),
            Some(open @ ('(' | '[')) => {
                let close = if open == '(' { ')' } else { ']' };
                out.push(open);
                self.position += 1;
                while let Some(c) = self.peek() {
                    if c == close {
                        out.push(c);
                        self.position += 1;
                        return;
                    }
                    if c == '{' || c == ';' {
                        // Unbalanced group; let the caller see the block start.
                        return;
                    }
                    self.consume_component_into(out);
                }
            }
            Some(c) => {
                out.push(c);
                self.position += 1;
                // Escaped character is part of the same component.
                if c == '\\'
                    && let Some(next) = self.peek()
                {
                    out.push(next);
                    self.position += 1;
                }
            }
            None => {}
        }
    }

    /// [§ 4.3.5 Consume a string token](https://www.w3.org/TR/css-syntax-3/#consume-string-token)
    fn consume_string_into(&mut self, out: &mut String) {
        let Some(quote) = self.peek() else { return };
        out.push(quote);
        self.position += 1;
        while let Some(c) = self.peek() {
            out.push(c);
            self.position += 1;
            if c == '\\' {
                if let Some(next) = self.peek() {
                    out.push(next);
                    self.position += 1;
                }
            } else if c == quote || c == '\n' {
                // "newline": "This is a parse error. Return the <bad-string-token>."
                return;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars()
            .enumerate()
            .all(|(i, c)| self.input.get(self.position + i) == Some(&c))
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }
}

/// [§ 5.4.5 Consume a list of declarations](https://www.w3.org/TR/css-syntax-3/#consume-list-of-declarations)
///
/// Split a block on top-level semicolons and parse each piece. Pieces that
/// are not `name: value` are dropped ("This is a parse error").
#[must_use]
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    let block = strip_comments(block);
    split_top_level(&block, ';')
        .into_iter()
        .filter_map(consume_declaration)
        .collect()
}

/// [§ 5.4.6 Consume a declaration](https://www.w3.org/TR/css-syntax-3/#consume-declaration)
fn consume_declaration(text: &str) -> Option<Declaration> {
    let (name, value) = text.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| is_ident_char(c) || c == '\\') {
        return None;
    }

    let (value, important) = strip_important(value.trim());
    if value.is_empty() {
        return None;
    }

    // Custom property names are case-sensitive.
    let name = if name.starts_with("--") {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    };

    Some(Declaration {
        name,
        value: value.to_string(),
        important,
    })
}

/// [§ 6.4.2 Important declarations](https://www.w3.org/TR/css-cascade-4/#importance)
///
/// "A declaration is important if it has a !important annotation, i.e.
/// if the last two (non-whitespace, non-comment) tokens in its value are
/// a <delim-token> with the value "!" followed by an <ident-token> with
/// a value that is an ASCII case-insensitive match for "important"."
fn strip_important(value: &str) -> (&str, bool) {
    let lower_tail = value.len().checked_sub("important".len()).and_then(|start| {
        value
            .get(start..)
            .filter(|tail| tail.eq_ignore_ascii_case("important"))
            .map(|_| start)
    });
    let Some(start) = lower_tail else {
        return (value, false);
    };
    let before = value[..start].trim_end();
    match before.strip_suffix('!') {
        Some(rest) => (rest.trim_end(), true),
        None => (value, false),
    }
}

/// Split `text` on `separator` where it appears outside strings, brackets
/// and parentheses.
#[must_use]
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, _) if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts.retain(|p| !p.trim().is_empty());
    parts
}

/// [§ 4.3.2 Consume comments](https://www.w3.org/TR/css-syntax-3/#consume-comment)
///
/// Remove `/* ... */` comments that appear outside strings.
fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None if c == '/' && chars.peek() == Some(&'*') => {
                let _ = chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                // A comment separates tokens.
                out.push(' ');
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                }
                out.push(c);
            }
        }
    }
    out
}

/// [§ 4.2 Definitions](https://www.w3.org/TR/css-syntax-3/#ident-code-point)
const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}
