// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::convert::Infallible;
use std::fmt::Write;

use jsonreel::{NumberResult, ParseError, Reader, StateMachine, Token, Tokens};

/// A generic JSON document tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
}

impl Value {
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }

    fn write_json(&self, out: &mut String) {
        match self {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(i) => write!(out, "{}", i).unwrap(),
            Value::Float(f) => write!(out, "{:?}", f).unwrap(),
            Value::Str(s) => write_string(s, out),
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            Value::Object(members) => {
                out.push('{');
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_string(key, out);
                    out.push_str(": ");
                    value.write_json(out);
                }
                out.push('}');
            }
        }
    }
}

/// Escapes quotes, backslashes and control characters, and writes characters
/// outside the basic plane as surrogate pair escapes.
fn write_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32).unwrap(),
            c if (c as u32) > 0xFFFF => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(out, "\\u{:04X}", unit).unwrap();
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

enum Frame {
    Array(Vec<Value>),
    Object(Vec<(String, Value)>, Option<String>),
}

/// Builds a [`Value`] from any document.
///
/// Open containers live on the builder's own stack; `cursor` counts
/// completed root values.
#[derive(Default)]
pub struct ValueBuilder {
    stack: Vec<Frame>,
}

impl StateMachine<Value> for ValueBuilder {
    fn resume(
        &mut self,
        target: &mut Value,
        tokens: &mut Tokens<'_>,
        cursor: &mut i32,
    ) -> Result<bool, ParseError> {
        while let Some(token) = tokens.next_token()? {
            let value = match token {
                Token::StartObject => {
                    self.stack.push(Frame::Object(Vec::new(), None));
                    continue;
                }
                Token::StartArray => {
                    self.stack.push(Frame::Array(Vec::new()));
                    continue;
                }
                Token::PropertyName(name) => match self.stack.last_mut() {
                    Some(Frame::Object(_, key)) => {
                        *key = Some(name.into_owned());
                        continue;
                    }
                    _ => return Err(tokens.unexpected("a value")),
                },
                Token::EndObject => match self.stack.pop() {
                    Some(Frame::Object(members, _)) => Value::Object(members),
                    _ => return Err(tokens.unexpected("end of array")),
                },
                Token::EndArray => match self.stack.pop() {
                    Some(Frame::Array(items)) => Value::Array(items),
                    _ => return Err(tokens.unexpected("end of object")),
                },
                Token::String(s) => Value::Str(s.into_owned()),
                Token::Number(n) => match n.parsed() {
                    NumberResult::Integer(i) => Value::Int(i),
                    NumberResult::Float(f) => Value::Float(f),
                    NumberResult::IntegerOverflow => return Err(tokens.overflow()),
                },
                Token::Bool(b) => Value::Bool(b),
                Token::Null => Value::Null,
            };
            match self.stack.last_mut() {
                None => {
                    *target = value;
                    *cursor += 1;
                    return Ok(true);
                }
                Some(Frame::Array(items)) => items.push(value),
                Some(Frame::Object(members, key)) => {
                    let key = key.take().ok_or_else(|| tokens.unexpected("a property name"))?;
                    members.push((key, value));
                }
            }
        }
        Ok(false)
    }
}

/// A document exercising every token kind, escapes, multi-byte UTF-8 and a
/// string long enough to outgrow small buffers.
pub fn sample_document() -> Value {
    let long: String = "streaming json ".repeat(20);
    Value::Object(vec![
        ("id".to_string(), Value::Int(9_007_199_254_740_993)),
        ("name".to_string(), Value::Str("reel \"one\"\n\tcafé".to_string())),
        ("ratio".to_string(), Value::Float(-0.015625)),
        ("big".to_string(), Value::Float(6.02e23)),
        ("flags".to_string(), Value::Array(vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Null,
        ])),
        ("nested".to_string(), Value::Array(vec![
            Value::Array(vec![]),
            Value::Object(vec![]),
            Value::Array(vec![Value::Int(-1), Value::Int(0), Value::Int(42)]),
        ])),
        ("clef \u{1D11E}".to_string(), Value::Str("\u{1}\\ 中文 \u{1F600}".to_string())),
        ("long".to_string(), Value::Str(long)),
        ("tail".to_string(), Value::Object(vec![(
            "deep".to_string(),
            Value::Array(vec![Value::Str(String::new()), Value::Int(7)]),
        )])),
    ])
}

/// Reads slices of pseudo-random length between 1 and 17 bytes.
pub struct RandomChunks<'a> {
    data: &'a [u8],
    state: u64,
}

impl<'a> RandomChunks<'a> {
    pub fn new(data: &'a [u8], seed: u64) -> Self {
        Self {
            data,
            state: seed | 1,
        }
    }

    fn next_len(&mut self) -> usize {
        // xorshift64
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        1 + (self.state % 17) as usize
    }
}

impl Reader for RandomChunks<'_> {
    type Error = Infallible;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = self.next_len().min(buf.len()).min(self.data.len());
        let (head, rest) = self.data.split_at(n);
        buf[..n].copy_from_slice(head);
        self.data = rest;
        Ok(n)
    }
}
