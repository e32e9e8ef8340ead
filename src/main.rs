//! CLI entry point: assemble a file, then either run it straight through or
//! drop into the line debugger (spec.md §6, §7).

use std::io::Write;

use owo_colors::OwoColorize;

use rvasm::config::CONFIG;
use rvasm::debugger::{CommandResult, Debugger, Event, ShowResult};
use rvasm::error::Error;
use rvasm::interpreter::{Interpreter, StepOutcome};
use rvasm::{ecall, parser, preprocessor};

fn main() {
    let source = match std::fs::read_to_string(&CONFIG.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("can't read '{}': {}", CONFIG.file, e);
            std::process::exit(1);
        }
    };

    let preprocessed = match preprocessor::preprocess(&source) {
        Ok(p) => p,
        Err(e) => fatal(&e),
    };

    let code = match parser::parse_all(&preprocessed.lines) {
        Ok(c) => c,
        Err(e) => fatal(&e.into()),
    };

    let mut interp = Interpreter::new(code.clone(), preprocessed.labels);
    ecall::stdlib::register_defaults(&mut interp);

    if CONFIG.debug {
        run_debug_session(&source, preprocessed.source_map, code.len(), &mut interp);
    } else {
        run_to_completion(&mut interp);
    }
}

fn fatal(e: &Error) -> ! {
    if CONFIG.color {
        eprintln!("{} {}", "error:".red().bold(), e);
    } else {
        eprintln!("error: {}", e);
    }
    std::process::exit(1);
}

fn run_to_completion(interp: &mut Interpreter) {
    loop {
        match interp.step() {
            Ok(StepOutcome::Continued) => {}
            Ok(StepOutcome::Finished) => break,
            Err(e) => {
                fatal(&e.into());
            }
        }
    }
}

fn run_debug_session(
    source: &str,
    source_map: rvasm::source_map::SourceMap,
    instruction_count: usize,
    interp: &mut Interpreter,
) {
    let mut debugger = Debugger::new(source, source_map, instruction_count);

    print_event(&debugger.initial_event(interp));

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let (result, auto_help) = debugger.process_command(line, interp);
        match result {
            CommandResult::Resume => print_event(&debugger.run_until_break(interp)),
            CommandResult::Show(show) => print_show(&show),
            CommandResult::Exit => break,
            CommandResult::Err(e) => eprintln!("{}", e),
        }
        if auto_help {
            print_show(&ShowResult::Help);
        }
    }
}

fn print_event(event: &Event) {
    match event {
        Event::Stopped { orig_line, .. } => {
            if let Some(line) = orig_line {
                println!("stopped at line {}", line + 1);
            } else {
                println!("stopped");
            }
        }
        Event::Finished => println!("program finished"),
        Event::Runtime(e) => eprintln!("{}", e),
    }
}

fn print_show(show: &ShowResult) {
    match show {
        ShowResult::Registers(regs) => {
            for (r, v) in regs {
                println!("{:<5}: {:#018x}", r.name(), v);
            }
        }
        ShowResult::Register(r, v) => println!("[{}]: {:#018x}", r.name(), v),
        ShowResult::Memory { from, words } => {
            for (i, w) in words.iter().enumerate() {
                println!("[{}]: {:#018x}", (*from as usize + i) * 8, w);
            }
        }
        ShowResult::Context { lines, current } => {
            println!();
            for (i, text) in lines {
                let marker = if i == current { " --> " } else { "     " };
                println!("{}{:>3}|{}", marker, i + 1, text);
            }
        }
        ShowResult::Help => {
            println!("Available commands:");
            println!("- continue (c): continue until the next breakpoint or the end of the program");
            println!("- exit (q): exit the debugger");
            println!("- show memory <from> <to>: show the words at addresses <from>[..to)");
            println!("- show registers (sr): show every register");
            println!("- show register <name>: show one register");
            println!("- show context: show the source around the current line");
            println!("- step in (s): execute the next instruction, entering any call");
            println!("- step over (n): execute the next instruction, skipping over calls");
            println!("- step out (o): run until the current function returns");
            println!("- breakpoint set/delete --name <label> / --line <n>");
            println!("- help: show this message");
        }
    }
}
