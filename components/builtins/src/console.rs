//! Console object methods and value inspection.

use core_types::{arg, number_to_string, NativeFunction, PromiseState, Property, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

/// Which stream a console message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    /// `log`, `info`, `debug`
    Out,
    /// `warn`, `error`, failed `assert`
    Err,
}

/// Console output writer trait
pub trait ConsoleWriter {
    /// Write a message to the console output
    fn write(&self, stream: ConsoleStream, message: &str);
}

/// Default console writer that prints to stdout and stderr
struct StdioWriter;

impl ConsoleWriter for StdioWriter {
    fn write(&self, stream: ConsoleStream, message: &str) {
        match stream {
            ConsoleStream::Out => println!("{}", message),
            ConsoleStream::Err => eprintln!("{}", message),
        }
    }
}

/// Writer that discards messages; the console keeps its own copy.
struct CaptureWriter;

impl ConsoleWriter for CaptureWriter {
    fn write(&self, _stream: ConsoleStream, _message: &str) {}
}

/// Console object
pub struct ConsoleObject {
    output: Rc<RefCell<Vec<String>>>,
    timers: RefCell<HashMap<String, Instant>>,
    counters: RefCell<HashMap<String, usize>>,
    writer: Box<dyn ConsoleWriter>,
}

impl ConsoleObject {
    /// Create a new console printing to stdout/stderr
    pub fn new() -> Self {
        Self::with_writer(Box::new(StdioWriter))
    }

    /// Create a console that only records messages into `output`
    pub fn new_with_output(output: Rc<RefCell<Vec<String>>>) -> Self {
        ConsoleObject {
            output,
            timers: RefCell::new(HashMap::new()),
            counters: RefCell::new(HashMap::new()),
            writer: Box::new(CaptureWriter),
        }
    }

    /// Create a console with a custom writer
    pub fn with_writer(writer: Box<dyn ConsoleWriter>) -> Self {
        ConsoleObject {
            output: Rc::new(RefCell::new(Vec::new())),
            timers: RefCell::new(HashMap::new()),
            counters: RefCell::new(HashMap::new()),
            writer,
        }
    }

    /// Messages written so far.
    pub fn messages(&self) -> Vec<String> {
        self.output.borrow().clone()
    }

    /// Format values for output: strings print raw, everything else
    /// goes through [`inspect`].
    pub fn format_values(values: &[Value]) -> String {
        values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => inspect(other),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn emit(&self, stream: ConsoleStream, message: String) {
        self.writer.write(stream, &message);
        self.output.borrow_mut().push(message);
    }

    /// console.log(...values)
    pub fn log(&self, values: &[Value]) {
        self.emit(ConsoleStream::Out, Self::format_values(values));
    }

    /// console.error(...values)
    pub fn error(&self, values: &[Value]) {
        self.emit(ConsoleStream::Err, Self::format_values(values));
    }

    /// console.assert(condition, ...values)
    pub fn assert(&self, condition: bool, values: &[Value]) {
        if !condition {
            let message = if values.is_empty() {
                "Assertion failed".to_string()
            } else {
                format!("Assertion failed: {}", Self::format_values(values))
            };
            self.emit(ConsoleStream::Err, message);
        }
    }

    /// console.count(label)
    pub fn count(&self, label: &str) {
        let count = {
            let mut counters = self.counters.borrow_mut();
            let entry = counters.entry(label.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.emit(ConsoleStream::Out, format!("{}: {}", label, count));
    }

    /// console.time(label)
    pub fn time(&self, label: &str) {
        self.timers.borrow_mut().insert(label.to_string(), Instant::now());
    }

    /// console.timeEnd(label)
    pub fn time_end(&self, label: &str) {
        let start = self.timers.borrow_mut().remove(label);
        if let Some(start) = start {
            let elapsed = start.elapsed();
            self.emit(
                ConsoleStream::Out,
                format!("{}: {:.3}ms", label, elapsed.as_secs_f64() * 1000.0),
            );
        }
    }

    /// Build the script-visible `console` object.
    pub fn object(self: &Rc<Self>) -> Value {
        let mut methods: Vec<(&str, Value)> = Vec::new();
        for (name, stream) in [
            ("log", ConsoleStream::Out),
            ("info", ConsoleStream::Out),
            ("debug", ConsoleStream::Out),
            ("warn", ConsoleStream::Err),
            ("error", ConsoleStream::Err),
        ] {
            let console = self.clone();
            methods.push((
                name,
                NativeFunction::value(name, move |_, args| {
                    console.emit(stream, Self::format_values(&args));
                    Ok(Value::Undefined)
                }),
            ));
        }
        let console = self.clone();
        methods.push((
            "assert",
            NativeFunction::value("assert", move |_, args| {
                console.assert(arg(&args, 0).is_truthy(), args.get(1..).unwrap_or(&[]));
                Ok(Value::Undefined)
            }),
        ));
        let label = |args: &[Value]| match arg(args, 0) {
            Value::Undefined => "default".to_string(),
            other => other.to_string(),
        };
        let console = self.clone();
        methods.push((
            "count",
            NativeFunction::value("count", move |_, args| {
                console.count(&label(&args));
                Ok(Value::Undefined)
            }),
        ));
        let console = self.clone();
        methods.push((
            "time",
            NativeFunction::value("time", move |_, args| {
                console.time(&label(&args));
                Ok(Value::Undefined)
            }),
        ));
        let console = self.clone();
        methods.push((
            "timeEnd",
            NativeFunction::value("timeEnd", move |_, args| {
                console.time_end(&label(&args));
                Ok(Value::Undefined)
            }),
        ));
        Value::object_from(methods)
    }
}

impl Default for ConsoleObject {
    fn default() -> Self {
        Self::new()
    }
}

const MAX_INSPECT_DEPTH: usize = 2;

/// Render a value the way an interactive console shows it.
///
/// # Examples
///
/// ```
/// use builtins::inspect;
/// use core_types::Value;
///
/// let value = Value::object_from([("a", Value::Number(1.0)), ("b", Value::from("x"))]);
/// assert_eq!(inspect(&value), "{ a: 1, b: 'x' }");
/// ```
pub fn inspect(value: &Value) -> String {
    let mut seen = Vec::new();
    inspect_nested(value, 0, &mut seen)
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'").replace('\n', "\\n"))
}

fn inspect_nested(value: &Value, depth: usize, seen: &mut Vec<Value>) -> String {
    match value {
        Value::String(s) if depth > 0 => quote(s),
        Value::Number(n) if *n == 0.0 && n.is_sign_negative() => "-0".to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::BigInt(n) => format!("{}n", n),
        Value::Function(f) => {
            let name = f.name();
            if name.is_empty() {
                "[Function (anonymous)]".to_string()
            } else {
                format!("[Function: {}]", name)
            }
        }
        Value::Promise(p) => match p.state() {
            PromiseState::Pending => "Promise { <pending> }".to_string(),
            PromiseState::Fulfilled(v) => {
                format!("Promise {{ {} }}", inspect_nested(&v, depth + 1, seen))
            }
            PromiseState::Rejected(v) => {
                format!("Promise {{ <rejected> {} }}", inspect_nested(&v, depth + 1, seen))
            }
        },
        Value::Array(items) => {
            if seen.iter().any(|v| v.same_reference(value)) {
                return "[Circular]".to_string();
            }
            let items = items.borrow().clone();
            if items.is_empty() {
                return "[]".to_string();
            }
            if depth > MAX_INSPECT_DEPTH {
                return "[Array]".to_string();
            }
            seen.push(value.clone());
            let parts: Vec<String> = items
                .iter()
                .map(|item| inspect_nested(item, depth + 1, seen))
                .collect();
            seen.pop();
            format!("[ {} ]", parts.join(", "))
        }
        Value::Object(obj) => {
            if value.is_error() {
                return value.to_string();
            }
            if seen.iter().any(|v| v.same_reference(value)) {
                return "[Circular]".to_string();
            }
            let (prefix, properties) = {
                let obj = obj.borrow();
                let name = obj.class_name.clone().or_else(|| {
                    let proto = obj.prototype.as_ref()?;
                    let constructor = proto.borrow().get_own("constructor")?;
                    Some(constructor.as_function()?.name())
                });
                let prefix = match name {
                    Some(name) if !name.is_empty() && name != "Object" => format!("{} ", name),
                    _ => String::new(),
                };
                (prefix, obj.properties.clone())
            };
            if properties.is_empty() {
                return format!("{}{{}}", prefix);
            }
            if depth > MAX_INSPECT_DEPTH {
                return "[Object]".to_string();
            }
            seen.push(value.clone());
            let parts: Vec<String> = properties
                .iter()
                .map(|(key, property)| {
                    let key = if is_identifier(key) { key.clone() } else { quote(key) };
                    let rendered = match property {
                        Property::Data(v) => inspect_nested(v, depth + 1, seen),
                        Property::Accessor { getter: Some(_), setter: Some(_) } => {
                            "[Getter/Setter]".to_string()
                        }
                        Property::Accessor { getter: Some(_), .. } => "[Getter]".to_string(),
                        Property::Accessor { .. } => "[Setter]".to_string(),
                    };
                    format!("{}: {}", key, rendered)
                })
                .collect();
            seen.pop();
            format!("{}{{ {} }}", prefix, parts.join(", "))
        }
        other => other.to_string(),
    }
}
