//! REPL (Read-Eval-Print Loop) implementation

use crate::error::{CliError, CliResult};
use crate::runtime::{Outcome, Runtime};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the interactive REPL
///
/// Declarations persist between entries. Input with open brackets, quotes
/// or template literals continues on the next line.
pub fn run_repl(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| CliError::Repl(format!("Failed to initialize editor: {}", e)))?;

    println!("expr {}", env!("CARGO_PKG_VERSION"));
    println!("Type an expression, .help for commands, or .exit to quit.");

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "... " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if buffer.is_empty() && trimmed.starts_with('.') {
                    if handle_repl_command(trimmed, runtime) {
                        break;
                    }
                    continue;
                }

                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if !is_input_complete(&buffer) {
                    continue;
                }

                let _ = editor.add_history_entry(buffer.as_str());
                if let Some(text) = evaluate_entry(runtime, &buffer) {
                    println!("{}", text);
                }
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                if buffer.is_empty() {
                    println!("Press Ctrl-D or type .exit to quit");
                } else {
                    println!("^C");
                    buffer.clear();
                }
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                return Err(CliError::Repl(format!("Readline error: {}", err)));
            }
        }
    }

    Ok(())
}

/// Text to print for one entry, or None for an undefined completion.
fn evaluate_entry(runtime: &mut Runtime, source: &str) -> Option<String> {
    match runtime.execute_string(source) {
        Ok(Outcome::Value(value)) if matches!(value, core_types::Value::Undefined) => None,
        Ok(Outcome::Value(value)) => Some(builtins::inspect(&value)),
        Ok(listing) => Some(listing.to_string()),
        Err(err) => Some(format!("Uncaught {}", strip_uncaught(&err.to_string()))),
    }
}

fn strip_uncaught(message: &str) -> &str {
    message.strip_prefix("Uncaught ").unwrap_or(message)
}

/// Handle special REPL commands. Returns true to leave the loop.
fn handle_repl_command(command: &str, runtime: &Runtime) -> bool {
    match command {
        ".exit" => return true,
        ".help" => {
            println!("REPL Commands:");
            println!("  .help     - Show this help message");
            println!("  .clear    - Clear the screen");
            println!("  .time     - Show the event loop's virtual clock");
            println!("  .exit     - Exit the REPL");
        }
        ".clear" => print!("\x1B[2J\x1B[1;1H"),
        ".time" => println!("{} ms", runtime.event_loop().now()),
        _ => {
            println!("Unknown command: {}", command);
            println!("Type .help for available commands");
        }
    }
    false
}

/// Check whether the input has balanced brackets and closed literals.
fn is_input_complete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(_) if c == '\\' => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' | '`' => quote = Some(c),
                '{' | '[' | '(' => depth += 1,
                '}' | ']' | ')' => depth -= 1,
                _ => {}
            },
        }
    }

    // A surplus closer is a syntax error worth reporting right away
    depth <= 0 && quote.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_input_complete_simple() {
        assert!(is_input_complete("let x = 42;"));
        assert!(is_input_complete("a ? b : c"));
    }

    #[test]
    fn test_is_input_complete_open_brackets() {
        assert!(!is_input_complete("function test() {"));
        assert!(!is_input_complete("[1, 2,"));
        assert!(is_input_complete("function test() { return [42]; }"));
        assert!(is_input_complete("f())"));
    }

    #[test]
    fn test_is_input_complete_with_literals() {
        assert!(is_input_complete(r#"let s = "hello {"; "#));
        assert!(!is_input_complete(r#"let s = "unclosed"#));
        assert!(!is_input_complete("`line ${x}"));
        assert!(is_input_complete(r#"'it\'s'"#));
    }

    #[test]
    fn test_evaluate_entry() {
        let mut runtime = Runtime::new();
        assert_eq!(evaluate_entry(&mut runtime, "let x = 'a'"), None);
        assert_eq!(evaluate_entry(&mut runtime, "x + 'b'").as_deref(), Some("ab"));
        assert_eq!(
            evaluate_entry(&mut runtime, "throw 'boom'").as_deref(),
            Some("Uncaught boom")
        );
    }
}
