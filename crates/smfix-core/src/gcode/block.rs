//! G-Code blocks: one source line split into command, parameters and comment

use std::sync::OnceLock;

use regex::Regex;

use super::token::{validate_word, AddressValue, FromAddress, Token};
use crate::error::GcodeError;

/// Separator between sections when a block is written back out
pub const GCODE_SEPARATOR: &str = " ";

/// One G-code line
///
/// `G1 X10 E0.5 ; perimeter` has command `G1`, params `[X10, E0.5]` and
/// comment `; perimeter`. The comment keeps its leading `;`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    command: Option<Token>,
    params: Vec<Token>,
    comment: String,
}

impl Block {
    pub fn new(command: Option<Token>, params: Vec<Token>, comment: impl Into<String>) -> Self {
        Self {
            command,
            params,
            comment: comment.into(),
        }
    }

    /// A comment-only line; `text` should include its leading `;`
    pub fn comment_line(text: impl Into<String>) -> Self {
        Self::new(None, Vec::new(), text.into().trim())
    }

    /// Parse one line of G-code
    ///
    /// Everything from the first `;` is the comment. Whitespace separated
    /// fields that start with a valid word become tokens, the first of them
    /// the command; anything else (checksums, stray lowercase) is dropped.
    pub fn parse(line: &str) -> Result<Self, GcodeError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(GcodeError::EmptyInput);
        }

        let (code, comment) = match line.find(';') {
            Some(i) => (&line[..i], line[i..].trim()),
            None => (line, ""),
        };

        let mut tokens = Vec::with_capacity(8);
        for field in code.split_whitespace() {
            let starts_with_word = field
                .chars()
                .next()
                .is_some_and(|c| validate_word(c).is_ok());
            if starts_with_word {
                tokens.push(Token::parse(field)?);
            }
        }

        let mut tokens = tokens.into_iter();
        let command = tokens.next();
        Ok(Self {
            command,
            params: tokens.collect(),
            comment: comment.to_string(),
        })
    }

    pub fn command(&self) -> Option<&Token> {
        self.command.as_ref()
    }

    pub fn command_mut(&mut self) -> Option<&mut Token> {
        self.command.as_mut()
    }

    /// Word of the command, if any
    pub fn word(&self) -> Option<char> {
        self.command.as_ref().map(Token::word)
    }

    pub fn params(&self) -> &[Token] {
        &self.params
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Append to the comment, starting one with `;` if there was none
    pub fn append_comment(&mut self, text: &str) {
        if self.comment.is_empty() {
            self.comment.push(';');
        }
        self.comment.push_str(text);
    }

    /// No command, no params, non-empty comment
    pub fn is_comment(&self) -> bool {
        self.command.is_none() && self.params.is_empty() && !self.comment.is_empty()
    }

    pub fn in_comment(&self, needle: &str) -> bool {
        self.comment.contains(needle)
    }

    /// True when the command equals the literal, e.g. `block.is("M104")`
    pub fn is(&self, literal: &str) -> bool {
        self.command.as_ref().is_some_and(|c| c.is(literal))
    }

    pub fn has_param(&self, word: char) -> bool {
        self.params.iter().any(|p| p.word() == word)
    }

    /// First parameter with this word
    pub fn param(&self, word: char) -> Option<&Token> {
        self.params.iter().find(|p| p.word() == word)
    }

    /// Typed value of the first parameter with this word
    pub fn param_as<T: FromAddress>(&self, word: char) -> Result<T, GcodeError> {
        self.param(word)
            .ok_or(GcodeError::MissingParameter(word))?
            .address_as()
    }

    /// Overwrite the first matching parameter, or append a new one
    pub fn set_param(
        &mut self,
        word: char,
        value: impl Into<AddressValue>,
    ) -> Result<(), GcodeError> {
        if let Some(param) = self.params.iter_mut().find(|p| p.word() == word) {
            param.set_address(value);
            return Ok(());
        }
        let mut param = Token::new(word, "")?;
        param.set_address(value);
        self.params.push(param);
        Ok(())
    }

    /// Remove every parameter with this word
    pub fn remove_param(&mut self, word: char) {
        self.params.retain(|p| p.word() != word);
    }

    /// Resolve which tool this block addresses
    ///
    /// `Tn` is the tool itself; `M106/M107` use `P`, `M301/M303` use `E`,
    /// any other `M` uses `T`. When that fails, or yields -1, a `T<n>` in
    /// the comment is used instead.
    pub fn tool_number(&self) -> Result<i32, GcodeError> {
        let resolved = match &self.command {
            Some(cmd) if cmd.word() == 'T' => cmd.address_as::<i32>(),
            Some(cmd) if cmd.word() == 'M' => match cmd.address() {
                "106" | "107" => self.param_as::<i32>('P'),
                "301" | "303" => self.param_as::<i32>('E'),
                _ => self.param_as::<i32>('T'),
            },
            Some(cmd) => Err(GcodeError::UnsupportedCommand(cmd.to_string())),
            None => Err(GcodeError::UnsupportedCommand(String::new())),
        };

        match resolved {
            Ok(tool) if tool != -1 => Ok(tool),
            other => {
                if self.comment.len() > 2 {
                    if let Some(tool) = tool_in_comment(&self.comment) {
                        return Ok(tool);
                    }
                }
                match other {
                    Ok(_) => Err(GcodeError::MissingParameter('T')),
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Render the block with a template
    ///
    /// `%c` is the command, `%p` the space separated params, `%m` the
    /// comment. Any other `%x` is written as `x`.
    pub fn format(&self, template: &str) -> String {
        let mut out = String::with_capacity(128);
        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.next() {
                Some('c') => {
                    if let Some(cmd) = &self.command {
                        out.push_str(&cmd.to_string());
                    }
                }
                Some('p') => out.push_str(&self.params_string()),
                Some('m') => out.push_str(&self.comment),
                Some(other) => out.push(other),
                None => {}
            }
        }
        out
    }

    fn params_string(&self) -> String {
        self.params
            .iter()
            .map(Token::to_string)
            .collect::<Vec<_>>()
            .join(GCODE_SEPARATOR)
    }
}

fn tool_in_comment(comment: &str) -> Option<i32> {
    static TOOL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TOOL_REGEX.get_or_init(|| Regex::new(r"T(\d+)").expect("invalid regex pattern"));
    regex
        .captures(comment)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let command = self.command.as_ref().map(Token::to_string);
        let params = self.params_string();
        let sections = [
            command.as_deref().unwrap_or(""),
            params.as_str(),
            self.comment.as_str(),
        ];
        let mut first = true;
        for section in sections.iter().filter(|s| !s.is_empty()) {
            if !first {
                f.write_str(GCODE_SEPARATOR)?;
            }
            f.write_str(section)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Block {
    type Err = GcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
