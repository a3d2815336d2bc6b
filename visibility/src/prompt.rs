//! Line-oriented prompts for the interactive (`-v`) mode of the tools.
//!
//! Each question shows the current value; an empty answer, end of input or
//! Ctrl-C keeps it.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("terminal input failed")]
    Readline(#[from] ReadlineError),
    #[error("prompt I/O failed")]
    Io(#[from] std::io::Error),
}

/// Where answers come from.
pub trait LineSource {
    /// Show `prompt` and read one line; `None` when there is nothing to read.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, PromptError>;

    /// Tell the user something without expecting an answer.
    fn notice(&mut self, message: &str);
}

/// Terminal input through rustyline, with line editing.
pub struct TerminalLines {
    editor: DefaultEditor,
}

impl TerminalLines {
    pub fn new() -> Result<Self, PromptError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineSource for TerminalLines {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, PromptError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

pub struct Prompter<S> {
    source: S,
}

impl Prompter<TerminalLines> {
    pub fn terminal() -> Result<Self, PromptError> {
        Ok(Self::new(TerminalLines::new()?))
    }
}

impl<S: LineSource> Prompter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    fn ask(
        &mut self,
        question: &str,
        current: &dyn Display,
    ) -> Result<Option<String>, PromptError> {
        let answer = self.source.read_line(&format!("{question} [{current}]: "))?;
        Ok(answer
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()))
    }

    /// Ask for a value parsed with `FromStr`; unparsable answers keep `current`.
    pub fn ask_value<T>(&mut self, question: &str, current: T) -> Result<T, PromptError>
    where
        T: FromStr + Display,
    {
        let Some(answer) = self.ask(question, &current)? else {
            return Ok(current);
        };
        match answer.parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                self.source.notice(&format!("could not read {answer:?}, keeping {current}"));
                Ok(current)
            }
        }
    }

    /// Ask for a padding size; an answer of 0 keeps `current` too.
    pub fn ask_pad_size(&mut self, current: usize) -> Result<usize, PromptError> {
        let value = self.ask_value("Number of padding points (0 for none)", current)?;
        Ok(if value == 0 { current } else { value })
    }

    pub fn ask_yes_no(&mut self, question: &str, current: bool) -> Result<bool, PromptError> {
        let shown = if current { "y" } else { "n" };
        let Some(answer) = self.ask(question, &shown)? else {
            return Ok(current);
        };
        match answer.to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            _ => {
                self.source.notice(&format!("please answer y or n, keeping {shown}"));
                Ok(current)
            }
        }
    }

    pub fn ask_text(&mut self, question: &str, current: &str) -> Result<String, PromptError> {
        Ok(self.ask(question, &current)?.unwrap_or_else(|| current.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, Cursor};

    /// Answers from a buffer; prompts and notices are recorded.
    struct ScriptedLines {
        input: Cursor<Vec<u8>>,
        transcript: String,
    }

    impl LineSource for ScriptedLines {
        fn read_line(&mut self, prompt: &str) -> Result<Option<String>, PromptError> {
            self.transcript.push_str(prompt);
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            Ok(Some(line))
        }

        fn notice(&mut self, message: &str) {
            self.transcript.push_str(message);
            self.transcript.push('\n');
        }
    }

    fn prompter(answers: &str) -> Prompter<ScriptedLines> {
        Prompter::new(ScriptedLines {
            input: Cursor::new(answers.as_bytes().to_vec()),
            transcript: String::new(),
        })
    }

    #[test]
    fn test_empty_answers_keep_current_values() {
        let mut p = prompter("\n\n\n");
        assert_eq!(p.ask_pad_size(64).unwrap(), 64);
        assert!(p.ask_yes_no("Center on brightness?", true).unwrap());
        assert_eq!(p.ask_text("Output file", "uvout.fits").unwrap(), "uvout.fits");
    }

    #[test]
    fn test_answers_replace_current_values() {
        let mut p = prompter("256\nn\nvis.fits\n");
        assert_eq!(p.ask_pad_size(0).unwrap(), 256);
        assert!(!p.ask_yes_no("Center on brightness?", true).unwrap());
        assert_eq!(p.ask_text("Output file", "uvout.fits").unwrap(), "vis.fits");
    }

    #[test]
    fn test_zero_padding_answer_keeps_current() {
        let mut p = prompter("0\n");
        assert_eq!(p.ask_pad_size(128).unwrap(), 128);
    }

    #[test]
    fn test_unparsable_answer_keeps_current() {
        let mut p = prompter("lots\nmaybe\n");
        assert_eq!(p.ask_value("Pixel size (uas)", 1.5).unwrap(), 1.5);
        assert!(!p.ask_yes_no("Center on brightness?", false).unwrap());

        let shown = &p.source.transcript;
        assert!(shown.contains("Pixel size (uas) [1.5]: "));
        assert!(shown.contains("keeping 1.5"));
        assert!(shown.contains("keeping n"));
    }

    #[test]
    fn test_end_of_input_keeps_current() {
        let mut p = prompter("");
        assert_eq!(p.ask_value("Number of pixels", 512usize).unwrap(), 512);
        assert!(p.ask_yes_no("Center on brightness?", true).unwrap());
    }
}
