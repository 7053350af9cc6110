use crate::gate::GateSignal;
use console::style;
use std::io::{self, BufRead, Write};

/// Show the generated command in a bordered block.
pub fn display_command(command: &str) {
    let term = console::Term::stdout();
    let terminal_width = term.size().1 as usize;
    let width = std::cmp::min(terminal_width.saturating_sub(4), 100).max(40);

    let header = "┌─ command ".to_string() + &"─".repeat(width.saturating_sub(12)) + "┐";
    let footer = "└".to_string() + &"─".repeat(width - 2) + "┘";

    println!("\n{}", style(&header).dim().green());
    for (i, line) in command.lines().enumerate() {
        let prompt = if i == 0 { "$ " } else { "  " };
        println!(
            "  {}{}",
            style(prompt).bold().green(),
            style(line).bold().white()
        );
    }
    println!("{}", style(&footer).dim().green());
}

/// Read one gate signal from the user. Anything unrecognised aborts.
pub fn prompt_gate_signal() -> io::Result<GateSignal> {
    print!(
        "{} ",
        style("[E]xecute, [D]escribe, [A]bort:").bold().cyan()
    );
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;

    Ok(parse_gate_signal(&input))
}

pub fn parse_gate_signal(input: &str) -> GateSignal {
    match input.trim().to_lowercase().as_str() {
        "e" | "y" | "execute" | "yes" => GateSignal::Execute,
        "d" | "describe" => GateSignal::Describe,
        _ => GateSignal::Abort,
    }
}

pub fn display_response(response: &str) {
    println!("{}", response);
}

/// Render a markdown-looking answer with termimad, plain text otherwise.
pub fn display_markdown(response: &str) {
    let skin = termimad::MadSkin::default();
    skin.print_text(response);
}

pub fn looks_like_markdown(text: &str) -> bool {
    text.contains("```") || text.contains('*') || text.contains('`') || text.contains('#')
}

pub fn display_execution_status(success: bool) {
    if success {
        println!("{}", style("✔ completed").bold().green());
    } else {
        println!("{}", style("✘ failed").bold().red());
    }
}

pub fn display_aborted() {
    println!("{}", style("Command execution aborted").bold().red());
}
