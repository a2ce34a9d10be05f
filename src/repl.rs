use crate::error::Xerr;
use crate::state::*;
use rustyline::error::ReadlineError;
use rustyline::Editor;

const HISTORY_FILE: &str = "history.txt";

pub fn console_repl(xs: &mut State, load_history: bool) {
    let mut rl = Editor::<()>::new();
    if load_history {
        let _ = rl.load_history(HISTORY_FILE);
    }
    loop {
        let readline = rl.readline("> ");
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str());
                match xs.interpret_line(line.as_str()) {
                    Ok(()) => xs.print(" OK\n"),
                    Err(Xerr::Exit(_)) => break,
                    // loop state of an aborted word stays on the control stack
                    Err(_) => xs.data_stack_mut().clear(),
                }
                if xs.is_about_to_stop() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    if load_history {
        if let Err(e) = rl.save_history(HISTORY_FILE) {
            println!("history save failed: {:}", e);
        }
    }
}
