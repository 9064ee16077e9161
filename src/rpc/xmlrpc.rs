/*!
 * XML-RPC codec.
 *
 * Values travel as `serde_json::Value`. `base64` and `dateTime.iso8601`
 * payloads are kept as their raw text; callers decode them where the meaning
 * is known.
 */

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::errors::TransportError;
use crate::rpc::{Record, Value};

/// Build a `methodCall` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");
    for param in params {
        xml.push_str("<param>");
        encode_value(param, &mut xml);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>");
    xml
}

fn encode_value(value: &Value, out: &mut String) {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(flag) => {
            out.push_str(if *flag { "<boolean>1</boolean>" } else { "<boolean>0</boolean>" });
        }
        Value::Number(number) => match number.as_i64() {
            Some(int) if i32::try_from(int).is_ok() => out.push_str(&format!("<int>{}</int>", int)),
            // XML-RPC ints are 32-bit; wider integers go over as text
            Some(int) => out.push_str(&format!("<string>{}</string>", int)),
            None => out.push_str(&format!("<double>{}</double>", number.as_f64().unwrap_or_default())),
        },
        Value::String(text) => {
            out.push_str("<string>");
            out.push_str(&escape(text.as_str()));
            out.push_str("</string>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(item, out);
            }
            out.push_str("</data></array>");
        }
        Value::Object(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                encode_value(member, out);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Parse a `methodResponse` document into its single value
///
/// A `<fault>` response comes back as `TransportError::Fault`.
pub fn decode_response(body: &str) -> Result<Value, TransportError> {
    let root = parse_tree(body)?;
    if root.name != "methodResponse" {
        return Err(malformed(format!("expected <methodResponse>, found <{}>", root.name)));
    }

    if let Some(fault) = root.child("fault") {
        let value = value_of(fault.require("value")?)?;
        let code = match value.get("faultCode") {
            Some(Value::Number(code)) => code.as_i64().unwrap_or_default(),
            Some(Value::String(code)) => code.trim().parse().unwrap_or_default(),
            _ => 0,
        };
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(TransportError::Fault { code, message });
    }

    let params = root.require("params")?;
    match params.child("param") {
        Some(param) => value_of(param.require("value")?),
        None => Ok(Value::Null),
    }
}

/// Minimal element tree, enough for XML-RPC's shape
#[derive(Debug, Default)]
struct Node {
    name: String,
    children: Vec<Node>,
    text: String,
}

impl Node {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn require(&self, name: &str) -> Result<&Node, TransportError> {
        self.child(name)
            .ok_or_else(|| malformed(format!("<{}> is missing <{}>", self.name, name)))
    }
}

fn malformed(detail: impl Into<String>) -> TransportError {
    TransportError::Malformed(detail.into())
}

fn parse_tree(body: &str) -> Result<Node, TransportError> {
    let mut reader = Reader::from_str(body);
    let mut stack = vec![Node::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(Node::named(start.name().as_ref())),
            Ok(Event::Empty(empty)) => {
                let node = Node::named(empty.name().as_ref());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or_else(|| malformed("unbalanced closing tag"))?;
                let parent = stack.last_mut().ok_or_else(|| malformed("unbalanced closing tag"))?;
                parent.children.push(node);
            }
            Ok(Event::Text(text)) => {
                let text = text
                    .unescape()
                    .map_err(|e| malformed(format!("bad text content: {}", e)))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(malformed(format!(
                    "invalid XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if stack.len() != 1 {
        return Err(malformed("document ended inside an element"));
    }
    let document = stack.pop().unwrap_or_default();
    document
        .children
        .into_iter()
        .next()
        .ok_or_else(|| malformed("empty document"))
}

/// Convert a `<value>` element
fn value_of(node: &Node) -> Result<Value, TransportError> {
    let typed = match node.children.first() {
        Some(typed) => typed,
        // Untyped values are strings
        None => return Ok(Value::String(node.text.clone())),
    };

    match typed.name.as_str() {
        "int" | "i4" | "i8" => typed
            .text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| malformed(format!("bad integer '{}': {}", typed.text, e))),
        "double" => {
            let float = typed
                .text
                .trim()
                .parse::<f64>()
                .map_err(|e| malformed(format!("bad double '{}': {}", typed.text, e)))?;
            serde_json::Number::from_f64(float)
                .map(Value::Number)
                .ok_or_else(|| malformed(format!("non-finite double '{}'", typed.text)))
        }
        "boolean" => match typed.text.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(malformed(format!("bad boolean '{}'", other))),
        },
        "string" | "base64" | "dateTime.iso8601" => Ok(Value::String(typed.text.clone())),
        "nil" => Ok(Value::Null),
        "array" => {
            let data = typed.require("data")?;
            data.children
                .iter()
                .filter(|c| c.name == "value")
                .map(value_of)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut record = Record::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.require("name")?.text.clone();
                let value = value_of(member.require("value")?)?;
                record.insert(name, value);
            }
            Ok(Value::Object(record))
        }
        other => Err(malformed(format!("unknown value type <{}>", other))),
    }
}
