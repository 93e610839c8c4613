//! Command parsing and validation.
//!
//! The message subject picks the command; the body is a YAML (or JSON)
//! mapping. `add` payloads are checked against [`ADD_RULES`], an ordered
//! field → constraints table. Every violation is collected so the user gets
//! the full list in one reply.

use std::sync::OnceLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::{domain::InboundMessage, errors::CommandError};

/// A parsed inbox command. Built per message and consumed by the dispatcher.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Add(AddPayload),
    List,
    Remove,
    Unknown(String),
}

impl Command {
    /// Parse an inbound message.
    ///
    /// The body is parsed before the subject is looked at, so a malformed body
    /// is reported as such whatever the subject says.
    pub fn parse(msg: &InboundMessage) -> Result<Self, CommandError> {
        let payload = parse_payload(&msg.body)?;

        let subject = msg.subject.trim().to_lowercase();
        Ok(match subject.as_str() {
            "add" => Command::Add(AddPayload::from_mapping(&payload)),
            "list" => Command::List,
            "remove" => Command::Remove,
            _ => Command::Unknown(msg.subject.trim().to_string()),
        })
    }
}

fn parse_payload(body: &str) -> Result<Mapping, CommandError> {
    let value: Value =
        serde_yaml::from_str(body).map_err(|e| CommandError::Parse(e.to_string()))?;
    match value {
        Value::Mapping(m) => Ok(m),
        Value::Null => Err(CommandError::Parse("message body is empty".to_string())),
        other => Err(CommandError::Parse(format!(
            "expected a mapping of fields, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// One raw payload field, before validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Present but not a string; holds a description of what it was.
    Other(&'static str),
}

impl FieldValue {
    fn from_yaml(v: &Value) -> Option<Self> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            other => Some(FieldValue::Other(kind_of(other))),
        }
    }
}

/// Raw `add` payload. Unknown fields are dropped here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddPayload {
    pub subreddit: Option<FieldValue>,
    pub channel_id: Option<FieldValue>,
    pub channel: Option<FieldValue>,
}

impl AddPayload {
    fn from_mapping(m: &Mapping) -> Self {
        let field = |name: &str| m.get(name).and_then(FieldValue::from_yaml);
        Self {
            subreddit: field("subreddit"),
            channel_id: field("channel_id"),
            channel: field("channel"),
        }
    }

    fn field(&self, name: &str) -> Option<&FieldValue> {
        match name {
            "subreddit" => self.subreddit.as_ref(),
            "channel_id" => self.channel_id.as_ref(),
            "channel" => self.channel.as_ref(),
            _ => None,
        }
    }

    fn text(&self, name: &str) -> Option<&str> {
        match self.field(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Check the payload against [`ADD_RULES`] and the cross-field rule.
    pub fn validate(&self) -> Result<AddRequest, CommandError> {
        let mut errors = Vec::new();
        for (name, rules) in ADD_RULES {
            check_field(name, self.field(name), rules, &mut errors);
        }

        if self.channel_id.is_none() && self.channel.is_none() {
            errors.push("Please provide either 'channel' or 'channel_id'".to_string());
        }

        if !errors.is_empty() {
            return Err(CommandError::Validation(errors));
        }

        // Both present: the id is unambiguous, so it wins.
        let target = match (self.text("channel_id"), self.text("channel")) {
            (Some(id), _) => ChannelRef::Id(id.to_string()),
            (None, Some(name)) => ChannelRef::Name(name.to_string()),
            (None, None) => {
                return Err(CommandError::Validation(vec![
                    "Please provide either 'channel' or 'channel_id'".to_string(),
                ]))
            }
        };
        let subreddit = self.text("subreddit").unwrap_or_default().to_string();

        Ok(AddRequest { subreddit, target })
    }
}

/// A validated `add` command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddRequest {
    pub subreddit: String,
    pub target: ChannelRef,
}

/// How the user identified the channel to watch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelRef {
    Id(String),
    Name(String),
}

impl ChannelRef {
    pub fn identifier(&self) -> &str {
        match self {
            ChannelRef::Id(s) | ChannelRef::Name(s) => s,
        }
    }

    pub fn by_id(&self) -> bool {
        matches!(self, ChannelRef::Id(_))
    }
}

// === Rule table ===

#[derive(Clone, Copy, Debug)]
pub enum Rule {
    Required,
    IsString,
    MinLength(usize),
    MaxLength(usize),
    Charset(Charset),
}

#[derive(Clone, Copy, Debug)]
pub enum Charset {
    /// `[A-Za-z0-9_]`
    Word,
    /// `[A-Za-z0-9_-]`
    ChannelId,
    /// `[A-Za-z0-9]`
    Alphanumeric,
}

impl Charset {
    fn regex(self) -> &'static Regex {
        static WORD: OnceLock<Regex> = OnceLock::new();
        static CHANNEL_ID: OnceLock<Regex> = OnceLock::new();
        static ALNUM: OnceLock<Regex> = OnceLock::new();

        let (cell, pattern) = match self {
            Charset::Word => (&WORD, r"^[A-Za-z0-9_]+$"),
            Charset::ChannelId => (&CHANNEL_ID, r"^[A-Za-z0-9_-]+$"),
            Charset::Alphanumeric => (&ALNUM, r"^[A-Za-z0-9]+$"),
        };
        cell.get_or_init(|| Regex::new(pattern).expect("valid regex"))
    }

    fn describe(self) -> &'static str {
        match self {
            Charset::Word => "letters, digits and underscores",
            Charset::ChannelId => "letters, digits, dashes and underscores",
            Charset::Alphanumeric => "letters and digits",
        }
    }
}

pub const ADD_RULES: &[(&str, &[Rule])] = &[
    (
        "subreddit",
        &[
            Rule::Required,
            Rule::IsString,
            Rule::MinLength(1),
            Rule::Charset(Charset::Word),
        ],
    ),
    (
        "channel_id",
        &[
            Rule::IsString,
            Rule::MinLength(24),
            Rule::MaxLength(24),
            Rule::Charset(Charset::ChannelId),
        ],
    ),
    (
        "channel",
        &[
            Rule::IsString,
            Rule::MinLength(1),
            Rule::Charset(Charset::Alphanumeric),
        ],
    ),
];

/// Apply `rules` to one field, appending a message per violation.
///
/// An absent optional field passes. A missing required field or a non-string
/// value stops the remaining checks for that field, since they only make
/// sense on text.
fn check_field(name: &str, value: Option<&FieldValue>, rules: &[Rule], errors: &mut Vec<String>) {
    let Some(value) = value else {
        if rules.iter().any(|r| matches!(r, Rule::Required)) {
            errors.push(format!("{name} is required"));
        }
        return;
    };

    let text = match value {
        FieldValue::Text(s) => s.as_str(),
        FieldValue::Other(kind) => {
            if rules.iter().any(|r| matches!(r, Rule::IsString)) {
                errors.push(format!("{name} must be a string, got {kind}"));
            }
            return;
        }
    };

    let len = text.chars().count();
    for rule in rules {
        match *rule {
            Rule::Required | Rule::IsString => {}
            Rule::MinLength(1) if len == 0 => errors.push(format!("{name} must not be empty")),
            Rule::MinLength(min) if len < min => {
                errors.push(format!("{name} must be at least {min} characters long"))
            }
            Rule::MaxLength(max) if len > max => {
                errors.push(format!("{name} must be at most {max} characters long"))
            }
            Rule::Charset(cs) if len > 0 && !cs.regex().is_match(text) => errors.push(format!(
                "{name} may only contain {}",
                cs.describe()
            )),
            _ => {}
        }
    }
}
