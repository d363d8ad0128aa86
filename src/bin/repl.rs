use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use edlisp::{Interpreter, TokenKind, cli::ReplArgs, lexer::tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};

struct LispCompleter {
    interpreter: Rc<RefCell<Interpreter>>,
}

impl LispCompleter {
    fn new(interpreter: Rc<RefCell<Interpreter>>) -> Self {
        LispCompleter { interpreter }
    }
}

impl rustyline::completion::Completer for LispCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let before = &line[..pos];
        let prefix = match tokenize(before) {
            // Only complete an atom the cursor is still touching.
            Ok(tokens) => match tokens.last() {
                Some(token) if token.span.end == pos => match &token.kind {
                    TokenKind::Atom(text) if !text.starts_with('"') => text.clone(),
                    _ => return Ok((pos, vec![])),
                },
                _ => return Ok((pos, vec![])),
            },
            Err(_) => return Ok((pos, vec![])),
        };
        let mut candidates: Vec<String> = self
            .interpreter
            .borrow()
            .identifiers()
            .into_iter()
            .filter(|id| id.starts_with(&prefix) && id.len() > prefix.len())
            .map(|id| id[prefix.len()..].to_string())
            .collect();
        candidates.sort();
        Ok((pos, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputHelper {
    #[rustyline(Validator)]
    validator: ParenValidator,
    #[rustyline(Highlighter)]
    highlighter: ParenHighlighter,
    #[rustyline(Completer)]
    completer: LispCompleter,
}

struct ParenValidator;

impl Validator for ParenValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut in_comment = false;

        for (i, c) in ctx.input().chars().enumerate() {
            if in_comment {
                in_comment = c != '\n';
                continue;
            }
            if in_string {
                // No escapes: the next quote always closes.
                in_string = c != '"';
                continue;
            }
            match c {
                '"' => in_string = true,
                ';' => in_comment = true,
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched ')' at position {}",
                            i
                        ))));
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }

        if in_string || depth > 0 {
            Ok(ValidationResult::Incomplete)
        } else {
            Ok(ValidationResult::Valid(None))
        }
    }
}

struct ParenHighlighter;

impl Highlighter for ParenHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let mut stack: Vec<(usize, usize)> = Vec::new();
        let mut highlighted = String::new();
        let mut in_string = false;
        let mut in_comment = false;
        let cursor_left = pos.checked_sub(1);

        for (i, c) in line.char_indices() {
            if in_comment || (!in_string && c == ';') {
                in_comment = c != '\n';
                highlighted.push_str(&format!("\x1b[90m{}\x1b[0m", c)); // Grey for comments
                continue;
            }
            if in_string || c == '"' {
                in_string = if in_string { c != '"' } else { true };
                highlighted.push_str(&format!("\x1b[32m{}\x1b[0m", c)); // Green for strings
                continue;
            }

            match c {
                '(' => {
                    stack.push((i, highlighted.len()));
                    highlighted.push(c);
                }
                ')' => match stack.pop() {
                    Some((open_pos, matching_pos))
                        if cursor_left == Some(open_pos) || cursor_left == Some(i) =>
                    {
                        highlighted.push_str(&format!("\x1b[34m{}\x1b[0m", c)); // Blue for matching parens
                        highlighted.replace_range(matching_pos..=matching_pos, "\x1b[1;34m(\x1b[0m");
                    }
                    Some(_) => highlighted.push(c),
                    None => highlighted.push_str(&format!("\x1b[31m{}\x1b[0m", c)), // Red for unmatched
                },
                _ => highlighted.push(c),
            }
        }

        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn main() -> rustyline::Result<()> {
    env_logger::init();
    let args = ReplArgs::parse();

    println!("edlisp REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let interpreter = Rc::new(RefCell::new(Interpreter::with_config(args.config())));
    let helper = InputHelper {
        highlighter: ParenHighlighter,
        validator: ParenValidator,
        completer: LispCompleter::new(Rc::clone(&interpreter)),
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(args.edit_mode.into())
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(helper));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(&args.history_path).is_err() {
        println!("No previous history.");
    }

    loop {
        match rl.readline("edlisp> ") {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("exit") {
                    break;
                }

                let result = interpreter.borrow_mut().evaluate(input);
                match result {
                    Ok(value) => println!("{}", value),
                    Err(err) => {
                        if err.pretty_print("REPL", input).is_err() {
                            eprintln!("Error: {}", err);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(&args.history_path)
}
