use tilth::error::Xerr;
use tilth::state::*;

use getopts::Options;

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let mut opts = Options::new();
    opts.optopt("s", "", "set script file name", "NAME");
    opts.optflag("x", "", "exit after running the script");
    opts.optflag("h", "help", "print this help");
    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            print_usage(&args[0], &opts);
            std::process::exit(2);
        }
    };
    if matches.opt_present("h") {
        print_usage(&args[0], &opts);
        return;
    }
    let mut xs = match State::boot() {
        Ok(xs) => xs,
        Err(e) => {
            eprintln!("boot failed: {:?}", e);
            std::process::exit(1);
        }
    };
    if let Some(filename) = matches.opt_str("s") {
        match xs.load_file(&filename) {
            Err(Xerr::Exit(code)) => std::process::exit(code as i32),
            Err(_) if matches.opt_present("x") => std::process::exit(1),
            Err(_) => xs.data_stack_mut().clear(),
            Ok(()) => (),
        }
        if matches.opt_present("x") {
            return;
        }
    }
    tilth::repl::console_repl(&mut xs, true);
}
