//! Line-oriented operator prompts
//!
//! `Prompter` is the only channel the controller talks to the operator
//! through. It is generic over its reader and writer so tests can drive a
//! whole run from a string.

use crate::error::PromptError;
use std::io::{self, BufRead, Write};

pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
    closed: bool,
}

/// Prompter bound to the process terminal
pub type StdPrompter = Prompter<io::StdinLock<'static>, io::Stdout>;

impl StdPrompter {
    pub fn stdio() -> Self {
        Prompter::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            closed: false,
        }
    }

    /// Ask a free-text question; an empty answer takes `default`.
    pub fn ask(&mut self, question: &str, default: &str) -> Result<String, PromptError> {
        if default.is_empty() {
            self.prompt(&format!("{question}: "))?;
        } else {
            self.prompt(&format!("{question} (default: {default}): "))?;
        }

        let answer = self.read_answer()?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    /// Ask a y/n question. Only `y`/`yes` count as yes.
    pub fn ask_yes_no(&mut self, question: &str, default_yes: bool) -> Result<bool, PromptError> {
        let default = if default_yes { "yes" } else { "no" };
        self.prompt(&format!("{question} (y/n, default: {default}): "))?;

        let answer = self.read_answer()?.to_lowercase();
        if answer.is_empty() {
            return Ok(default_yes);
        }
        Ok(answer == "y" || answer == "yes")
    }

    /// Print one line to the operator.
    pub fn say(&mut self, line: impl AsRef<str>) -> Result<(), PromptError> {
        self.ensure_open()?;
        writeln!(self.output, "{}", line.as_ref())?;
        Ok(())
    }

    /// Flush and close the channel. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), PromptError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.output.flush()?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn prompt(&mut self, text: &str) -> Result<(), PromptError> {
        self.ensure_open()?;
        write!(self.output, "{text}")?;
        self.output.flush()?;
        Ok(())
    }

    /// One trimmed line; end of input reads as an empty answer.
    fn read_answer(&mut self) -> Result<String, PromptError> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line)?;
        if read == 0 {
            // keep the terminal transcript readable when stdin is exhausted
            writeln!(self.output)?;
        }
        Ok(line.trim().to_string())
    }

    fn ensure_open(&self) -> Result<(), PromptError> {
        if self.closed {
            Err(PromptError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<R: BufRead, W: Write> Drop for Prompter<R, W> {
    fn drop(&mut self) {
        // nowhere left to report a failed final flush
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_answer_takes_default() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new("\n".as_bytes(), &mut out);

        let answer = prompter.ask("Initial interval (ms)", "1000").unwrap();
        assert_eq!(answer, "1000");
        drop(prompter);
        assert_eq!(transcript(out), "Initial interval (ms) (default: 1000): ");
    }

    #[test]
    fn answer_is_trimmed() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new("  250 \n".as_bytes(), &mut out);
        assert_eq!(prompter.ask("Initial interval (ms)", "1000").unwrap(), "250");
    }

    #[test]
    fn no_default_suffix_when_default_is_empty() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new("x\n".as_bytes(), &mut out);
        prompter.ask("Name", "").unwrap();
        drop(prompter);
        assert_eq!(transcript(out), "Name: ");
    }

    #[test]
    fn yes_no_normalization() {
        let cases = [
            ("\n", true, true),
            ("\n", false, false),
            ("y\n", false, true),
            ("YES\n", false, true),
            ("Yes\n", false, true),
            ("n\n", true, false),
            ("sure\n", true, false),
            ("yep\n", true, false),
        ];
        for (input, default_yes, expected) in cases {
            let mut out = Vec::new();
            let mut prompter = Prompter::new(input.as_bytes(), &mut out);
            let answer = prompter.ask_yes_no("Modify workflow \"a\"?", default_yes).unwrap();
            assert_eq!(answer, expected, "input {input:?} default_yes {default_yes}");
        }
    }

    #[test]
    fn yes_no_prompt_format() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new("\n".as_bytes(), &mut out);
        prompter.ask_yes_no("Modify workflow \"orders\"?", true).unwrap();
        drop(prompter);
        assert_eq!(
            transcript(out),
            "Modify workflow \"orders\"? (y/n, default: yes): "
        );
    }

    #[test]
    fn end_of_input_takes_default() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new("".as_bytes(), &mut out);
        assert_eq!(prompter.ask("Number of attempts", "6").unwrap(), "6");
        assert!(prompter.ask_yes_no("Continue?", true).unwrap());
    }

    #[test]
    fn close_is_idempotent_and_blocks_prompts() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new("1\n".as_bytes(), &mut out);
        prompter.close().unwrap();
        prompter.close().unwrap();
        assert!(prompter.is_closed());
        assert!(matches!(prompter.ask("Q", "d"), Err(PromptError::Closed)));
        assert!(matches!(prompter.say("hi"), Err(PromptError::Closed)));
    }

    #[test]
    fn say_writes_a_line() {
        let mut out = Vec::new();
        let mut prompter = Prompter::new("".as_bytes(), &mut out);
        prompter.say("Found 2 workflow(s):").unwrap();
        drop(prompter);
        assert_eq!(transcript(out), "Found 2 workflow(s):\n");
    }
}
