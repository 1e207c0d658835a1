//! Interactive session
//!
//! A line-at-a-time loop over one persistent context: definitions and
//! imports accumulate in the top scope, bare code runs immediately
//! against a persistent stack, and the stack is shown after every line.
//! Imports echo their re-exported names (the interactive flag).

use crate::interp::Interp;
use alma_runtime::stack::Stack;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

pub fn run(interp: &mut Interp) -> Result<(), String> {
    let mut editor = DefaultEditor::new().map_err(|e| e.to_string())?;
    let mut stack = Stack::new();

    println!("alma {} (ctrl-d to exit)", env!("CARGO_PKG_VERSION"));

    loop {
        match editor.readline("alma> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(&line).ok();
                match interp.compile_source(&line, true) {
                    Ok(program) => {
                        for seq in &program.code {
                            interp.eval_seq(seq, &mut stack);
                        }
                        if !stack.is_empty() {
                            println!("{}", stack);
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.to_string()),
        }
    }

    Ok(())
}
