//! XML-RPC value tree: rendering to wire XML and parsing back.
//!
//! The wire format is the subset of <http://xmlrpc.scripting.com/spec.html>
//! the Gravatar service speaks: scalars, `<array>`, `<struct>` and the
//! `<nil/>` extension. `<dateTime.iso8601>` is rejected as unsupported.

use std::collections::BTreeMap;
use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;
use xml::escape::escape_str_pcdata;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

pub type Array = Vec<Value>;
pub type Struct = BTreeMap<String, Value>;

/// A single XML-RPC data value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i32),
    Bool(bool),
    String(String),
    Double(f64),
    Base64(Vec<u8>),
    Array(Array),
    Struct(Struct),
    Nil,
}

impl Value {
    /// Renders the value as a `<value>...</value>` element.
    pub fn write_xml(&self, out: &mut String) {
        out.push_str("<value>");
        match self {
            Value::Int(v) => {
                out.push_str("<int>");
                out.push_str(&v.to_string());
                out.push_str("</int>");
            }
            Value::Bool(v) => {
                out.push_str("<boolean>");
                out.push_str(if *v { "1" } else { "0" });
                out.push_str("</boolean>");
            }
            Value::String(v) => {
                out.push_str("<string>");
                out.push_str(&escape_str_pcdata(v));
                out.push_str("</string>");
            }
            Value::Double(v) => {
                out.push_str("<double>");
                out.push_str(&v.to_string());
                out.push_str("</double>");
            }
            Value::Base64(v) => {
                out.push_str("<base64>");
                out.push_str(&BASE64.encode(v));
                out.push_str("</base64>");
            }
            Value::Array(items) => {
                out.push_str("<array><data>");
                for item in items {
                    item.write_xml(out);
                }
                out.push_str("</data></array>");
            }
            Value::Struct(members) => {
                out.push_str("<struct>");
                for (name, value) in members {
                    out.push_str("<member><name>");
                    out.push_str(&escape_str_pcdata(name));
                    out.push_str("</name>");
                    value.write_xml(out);
                    out.push_str("</member>");
                }
                out.push_str("</struct>");
            }
            Value::Nil => out.push_str("<nil/>"),
        }
        out.push_str("</value>");
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Value {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::String(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Double(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Value {
        Value::Array(v)
    }
}

impl From<Struct> for Value {
    fn from(v: Struct) -> Value {
        Value::Struct(v)
    }
}

/// The errors that can arise while parsing an XML-RPC document.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("malformed XML: {0}")]
    Syntax(#[from] xml::reader::Error),
    #[error("unexpected end of document")]
    UnexpectedEof,
    #[error("expected <{expected}>, found {found}")]
    Mismatch { expected: String, found: String },
    #[error("invalid {kind} value {text:?}")]
    InvalidScalar { kind: &'static str, text: String },
    #[error("unsupported value type <{0}>")]
    UnsupportedType(String),
}

/// Pull parser over an XML event stream.
///
/// Callers drive it with the `expect_*`/`parse_value` combinators; the
/// response framing on top lives in [`crate::xmlrpc::protocol`].
pub struct Parser<R: Read> {
    reader: EventReader<R>,
}

impl<R: Read> Parser<R> {
    pub fn new(source: R) -> Parser<R> {
        let config = ParserConfig::new()
            .cdata_to_characters(true)
            .ignore_comments(true);
        Parser {
            reader: EventReader::new_with_config(source, config),
        }
    }

    /// Next event, with inter-element whitespace and document noise skipped.
    fn next_event(&mut self) -> Result<XmlEvent, ParserError> {
        loop {
            match self.reader.next()? {
                XmlEvent::StartDocument { .. }
                | XmlEvent::ProcessingInstruction { .. }
                | XmlEvent::Comment(_)
                | XmlEvent::Whitespace(_) => continue,
                event => return Ok(event),
            }
        }
    }

    pub(crate) fn expect_open(&mut self, expected: &str) -> Result<(), ParserError> {
        match self.next_event()? {
            XmlEvent::StartElement { name, .. } if name.local_name == expected => Ok(()),
            other => Err(mismatch(expected, &other)),
        }
    }

    pub(crate) fn expect_close(&mut self, expected: &str) -> Result<(), ParserError> {
        match self.next_event()? {
            XmlEvent::EndElement { name } if name.local_name == expected => Ok(()),
            other => Err(mismatch(expected, &other)),
        }
    }

    /// Opens the next element and returns its local name.
    pub(crate) fn open_any(&mut self) -> Result<String, ParserError> {
        match self.next_event()? {
            XmlEvent::StartElement { name, .. } => Ok(name.local_name),
            other => Err(mismatch("element", &other)),
        }
    }

    /// Parses a full `<value>...</value>` element.
    pub(crate) fn parse_value(&mut self) -> Result<Value, ParserError> {
        self.expect_open("value")?;
        self.parse_value_body()
    }

    /// Parses the content of a `<value>` whose opening tag is consumed.
    fn parse_value_body(&mut self) -> Result<Value, ParserError> {
        let mut text = String::new();
        loop {
            match self.next_event()? {
                XmlEvent::Characters(chunk) => text.push_str(&chunk),
                // A value without a type element is a string.
                XmlEvent::EndElement { name } if name.local_name == "value" => {
                    return Ok(Value::String(text));
                }
                XmlEvent::StartElement { name, .. } => {
                    let value = self.parse_typed(&name.local_name)?;
                    self.expect_close("value")?;
                    return Ok(value);
                }
                other => return Err(mismatch("value content", &other)),
            }
        }
    }

    fn parse_typed(&mut self, tag: &str) -> Result<Value, ParserError> {
        match tag {
            "int" | "i4" => {
                let text = self.take_text(tag)?;
                text.trim()
                    .parse::<i32>()
                    .map(Value::Int)
                    .map_err(|_| ParserError::InvalidScalar { kind: "int", text })
            }
            "boolean" => {
                let text = self.take_text("boolean")?;
                match text.trim() {
                    "1" => Ok(Value::Bool(true)),
                    "0" => Ok(Value::Bool(false)),
                    _ => Err(ParserError::InvalidScalar {
                        kind: "boolean",
                        text,
                    }),
                }
            }
            "string" => self.take_text("string").map(Value::String),
            "double" => {
                let text = self.take_text("double")?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| ParserError::InvalidScalar {
                        kind: "double",
                        text,
                    })
            }
            "base64" => {
                let text = self.take_text("base64")?;
                let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
                BASE64
                    .decode(compact.as_bytes())
                    .map(Value::Base64)
                    .map_err(|_| ParserError::InvalidScalar {
                        kind: "base64",
                        text,
                    })
            }
            "array" => self.parse_array(),
            "struct" => self.parse_struct(),
            "nil" => {
                self.take_text("nil")?;
                Ok(Value::Nil)
            }
            other => Err(ParserError::UnsupportedType(other.to_string())),
        }
    }

    /// Collects character data up to the matching end tag.
    fn take_text(&mut self, tag: &str) -> Result<String, ParserError> {
        let mut text = String::new();
        loop {
            match self.next_event()? {
                XmlEvent::Characters(chunk) => text.push_str(&chunk),
                XmlEvent::EndElement { name } if name.local_name == tag => return Ok(text),
                other => return Err(mismatch(tag, &other)),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, ParserError> {
        self.expect_open("data")?;
        let mut items = Array::new();
        loop {
            match self.next_event()? {
                XmlEvent::StartElement { name, .. } if name.local_name == "value" => {
                    items.push(self.parse_value_body()?);
                }
                XmlEvent::EndElement { name } if name.local_name == "data" => break,
                other => return Err(mismatch("value", &other)),
            }
        }
        self.expect_close("array")?;
        Ok(Value::Array(items))
    }

    fn parse_struct(&mut self) -> Result<Value, ParserError> {
        let mut members = Struct::new();
        loop {
            match self.next_event()? {
                XmlEvent::StartElement { name, .. } if name.local_name == "member" => {
                    self.expect_open("name")?;
                    let member_name = self.take_text("name")?;
                    let value = self.parse_value()?;
                    self.expect_close("member")?;
                    members.insert(member_name, value);
                }
                XmlEvent::EndElement { name } if name.local_name == "struct" => {
                    return Ok(Value::Struct(members));
                }
                other => return Err(mismatch("member", &other)),
            }
        }
    }
}

fn mismatch(expected: &str, found: &XmlEvent) -> ParserError {
    let found = match found {
        XmlEvent::StartElement { name, .. } => format!("<{}>", name.local_name),
        XmlEvent::EndElement { name } => format!("</{}>", name.local_name),
        XmlEvent::Characters(text) => format!("text {:?}", text),
        XmlEvent::EndDocument => return ParserError::UnexpectedEof,
        other => format!("{:?}", other),
    };
    ParserError::Mismatch {
        expected: expected.to_string(),
        found,
    }
}
