//! Literals, identifiers and `this`.

use super::{
    evaluate_arguments, list_json, node_field, node_list, str_field, union, ExprNode,
    ExpressionNode, Node,
};
use super::access::resolve_callee;
use crate::registry::DeserializerRegistry;
use crate::scope::DeclarationKind;
use crate::stack::Stack;
use core_types::{number_to_string, string_to_number, JsError, JsRegExp, JsResult, PreferredType, Value};
use num_bigint::BigInt;
use serde_json::json;
use std::fmt;
use std::rc::Rc;

/// Write `value` as a quoted source string.
pub(crate) fn quote_string(f: &mut fmt::Formatter<'_>, value: &str, quote: char) -> fmt::Result {
    use fmt::Write;
    f.write_char(quote)?;
    for c in value.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            '\0' => f.write_str("\\0")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c if (c as u32) < 0x20 => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

/// `"text"` or `'text'`.
pub struct StringLiteral {
    /// Decoded value
    pub value: String,
    /// Quote character used in the source
    pub quote: char,
}

impl StringLiteral {
    /// Double-quoted string literal.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote: '"',
        }
    }
}

impl fmt::Display for StringLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        quote_string(f, &self.value, self.quote)
    }
}

impl ExpressionNode for StringLiteral {
    const TYPE: &'static str = "StringLiteral";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Ok(Value::String(self.value.clone()))
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "value": self.value, "quote": self.quote.to_string() })
    }

    fn from_json(json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        let quote = match json.get("quote").and_then(serde_json::Value::as_str) {
            Some("'") => '\'',
            _ => '"',
        };
        Ok(Self {
            value: str_field(json, "value")?,
            quote,
        })
    }
}

/// Numeric literal.
pub struct NumberLiteral {
    /// Numeric value
    pub value: f64,
    /// Source spelling, kept so `0xff` renders as written
    pub raw: Option<String>,
}

impl NumberLiteral {
    /// Literal without a recorded spelling.
    pub fn new(value: f64) -> Self {
        Self { value, raw: None }
    }
}

impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw {
            Some(raw) => f.write_str(raw),
            None => f.write_str(&number_to_string(self.value)),
        }
    }
}

impl ExpressionNode for NumberLiteral {
    const TYPE: &'static str = "NumberLiteral";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Ok(Value::Number(self.value))
    }

    fn to_json(&self) -> serde_json::Value {
        let value = serde_json::Number::from_f64(self.value)
            .map_or(serde_json::Value::Null, serde_json::Value::Number);
        json!({ "type": Self::TYPE, "value": value, "raw": self.raw })
    }

    fn from_json(json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        let raw = super::opt_str_field(json, "raw");
        // Non-finite values are written as null and recovered from `raw`.
        let value = match json.get("value") {
            Some(serde_json::Value::Number(number)) => number.as_f64().unwrap_or(f64::NAN),
            None | Some(serde_json::Value::Null) => raw
                .as_deref()
                .map_or(f64::NAN, |raw| string_to_number(&raw.replace('_', ""))),
            Some(other) => {
                return Err(JsError::deserialize(format!(
                    "NumberLiteral value must be a number, found {}",
                    other
                )))
            }
        };
        Ok(Self { value, raw })
    }
}

/// `123n`.
pub struct BigIntLiteral {
    /// Value of the literal
    pub value: BigInt,
}

impl fmt::Display for BigIntLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}n", self.value)
    }
}

impl ExpressionNode for BigIntLiteral {
    const TYPE: &'static str = "BigIntLiteral";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Ok(Value::BigInt(self.value.clone()))
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "digits": self.value.to_string() })
    }

    fn from_json(json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        let digits = str_field(json, "digits")?;
        let value = digits
            .parse::<BigInt>()
            .map_err(|_| JsError::deserialize(format!("invalid bigint digits '{}'", digits)))?;
        Ok(Self { value })
    }
}

/// `true` / `false`.
pub struct BooleanLiteral {
    /// Value of the literal
    pub value: bool,
}

impl fmt::Display for BooleanLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl ExpressionNode for BooleanLiteral {
    const TYPE: &'static str = "BooleanLiteral";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Ok(Value::Boolean(self.value))
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "value": self.value })
    }

    fn from_json(json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            value: super::bool_field(json, "value"),
        })
    }
}

/// `null`.
pub struct NullLiteral;

impl fmt::Display for NullLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null")
    }
}

impl ExpressionNode for NullLiteral {
    const TYPE: &'static str = "NullLiteral";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Ok(Value::Null)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE })
    }

    fn from_json(_json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self)
    }
}

/// `/pattern/flags`. Every evaluation creates a fresh regex value.
pub struct RegExpLiteral {
    /// Pattern source
    pub pattern: String,
    /// Flag letters
    pub flags: String,
}

impl fmt::Display for RegExpLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.pattern, self.flags)
    }
}

impl ExpressionNode for RegExpLiteral {
    const TYPE: &'static str = "RegExpLiteral";

    fn get(&self, _stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        Ok(Value::RegExp(Rc::new(JsRegExp::new(&self.pattern, &self.flags)?)))
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "pattern": self.pattern, "flags": self.flags })
    }

    fn from_json(json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            pattern: str_field(json, "pattern")?,
            flags: super::opt_str_field(json, "flags").unwrap_or_default(),
        })
    }
}

fn escape_template(cooked: &str) -> String {
    cooked
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

/// `` `text ${expr} text` ``.
pub struct TemplateLiteral {
    /// Cooked text parts; always one more than `expressions`
    pub quasis: Vec<String>,
    /// Raw text parts as written in the source
    pub raws: Vec<String>,
    /// Substitutions
    pub expressions: Vec<ExprNode>,
}

impl TemplateLiteral {
    /// Cooked strings for a tag function.
    pub(crate) fn strings(&self) -> Value {
        Value::new_array(self.quasis.iter().cloned().map(Value::String).collect())
    }
}

impl fmt::Display for TemplateLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("`")?;
        for (i, quasi) in self.quasis.iter().enumerate() {
            match self.raws.get(i) {
                Some(raw) => f.write_str(raw)?,
                None => f.write_str(&escape_template(quasi))?,
            }
            if let Some(expr) = self.expressions.get(i) {
                write!(f, "${{{}}}", expr)?;
            }
        }
        f.write_str("`")
    }
}

impl ExpressionNode for TemplateLiteral {
    const TYPE: &'static str = "TemplateLiteral";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let mut out = String::new();
        for (i, quasi) in self.quasis.iter().enumerate() {
            out.push_str(quasi);
            if let Some(expr) = self.expressions.get(i) {
                let value = expr.get(stack, this)?;
                out.push_str(&value.to_primitive(PreferredType::String)?.to_string());
            }
        }
        Ok(Value::String(out))
    }

    fn entry(&self) -> Vec<String> {
        union(&self.expressions, Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union(&self.expressions, Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "type": Self::TYPE,
            "quasis": self.quasis,
            "raws": self.raws,
            "expressions": list_json(&self.expressions),
        })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        let strings = |key: &str| -> Vec<String> {
            json.get(key)
                .and_then(serde_json::Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().unwrap_or_default().to_string())
                        .collect()
                })
                .unwrap_or_default()
        };
        let quasis = strings("quasis");
        let expressions = node_list(json, "expressions", registry)?;
        if quasis.len() != expressions.len() + 1 {
            return Err(JsError::deserialize(
                "TemplateLiteral needs exactly one more quasi than expressions",
            ));
        }
        Ok(Self {
            quasis,
            raws: strings("raws"),
            expressions,
        })
    }
}

/// `` tag`text ${expr}` ``.
pub struct TaggedTemplateExpression {
    /// Tag function expression
    pub tag: ExprNode,
    /// The `TemplateLiteral`
    pub quasi: ExprNode,
}

impl fmt::Display for TaggedTemplateExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tag, self.quasi)
    }
}

impl ExpressionNode for TaggedTemplateExpression {
    const TYPE: &'static str = "TaggedTemplateExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        let Node::TemplateLiteral(template) = &*self.quasi else {
            return Err(JsError::type_error("tagged template without a template literal"));
        };
        let (callee, receiver) = resolve_callee(&self.tag, stack, this)?;
        let mut args = vec![template.strings()];
        args.extend(evaluate_arguments(&template.expressions, stack, this)?);
        match callee {
            Value::Function(f) => f.call(receiver, args),
            _ => Err(JsError::not_callable(&self.tag)),
        }
    }

    fn entry(&self) -> Vec<String> {
        union([&self.tag, &self.quasi], Node::entry)
    }

    fn events(&self) -> Vec<String> {
        union([&self.tag, &self.quasi], Node::events)
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "tag": self.tag.to_json(), "quasi": self.quasi.to_json() })
    }

    fn from_json(json: &serde_json::Value, registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            tag: node_field(json, "tag", registry)?,
            quasi: node_field(json, "quasi", registry)?,
        })
    }
}

/// A variable reference.
pub struct Identifier {
    /// Variable name
    pub name: String,
}

impl Identifier {
    /// Identifier node for `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl ExpressionNode for Identifier {
    const TYPE: &'static str = "Identifier";

    fn get(&self, stack: &mut Stack, _this: Option<&Value>) -> JsResult<Value> {
        stack.get(&self.name)
    }

    fn set(&self, stack: &mut Stack, value: Value) -> JsResult<()> {
        stack.set(&self.name, value)
    }

    fn declare(&self, stack: &mut Stack, value: Value, kind: DeclarationKind) -> JsResult<()> {
        stack.declare_variable(&self.name, value, kind)
    }

    fn entry(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn events(&self) -> Vec<String> {
        vec![self.name.clone()]
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE, "name": self.name })
    }

    fn from_json(json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self {
            name: str_field(json, "name")?,
        })
    }
}

/// `this`.
pub struct ThisExpression;

impl fmt::Display for ThisExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("this")
    }
}

impl ExpressionNode for ThisExpression {
    const TYPE: &'static str = "ThisExpression";

    fn get(&self, stack: &mut Stack, this: Option<&Value>) -> JsResult<Value> {
        // Function bodies bind `this` in their scope; outside any function
        // the caller-supplied context applies.
        if stack.has("this") {
            stack.get("this")
        } else {
            Ok(this.cloned().unwrap_or(Value::Undefined))
        }
    }

    fn to_json(&self) -> serde_json::Value {
        json!({ "type": Self::TYPE })
    }

    fn from_json(_json: &serde_json::Value, _registry: &DeserializerRegistry) -> JsResult<Self> {
        Ok(Self)
    }
}
