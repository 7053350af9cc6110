use crate::config::Config;
use crate::core::error::AishError;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Line editor for REPL mode with persistent input history.
pub fn create_editor() -> Result<DefaultEditor, AishError> {
    let mut editor = DefaultEditor::new()
        .map_err(|e| AishError::Input(format!("Failed to initialize editor: {}", e)))?;

    // A missing history file on first run is expected
    let _ = editor.load_history(&Config::history_path());

    Ok(editor)
}

/// Read one line. `None` means the user is done (Ctrl-D / Ctrl-C).
pub fn read_input(editor: &mut DefaultEditor, prompt: &str) -> Result<Option<String>, AishError> {
    match editor.readline(prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                let _ = editor.add_history_entry(&line);
            }
            Ok(Some(line))
        }
        Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
        Err(e) => Err(AishError::Input(format!("Failed to read input: {}", e))),
    }
}

pub fn save_history(editor: &mut DefaultEditor) -> Result<(), AishError> {
    let path = Config::history_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    editor
        .save_history(&path)
        .map_err(|e| AishError::Input(format!("Failed to save history: {}", e)))
}
