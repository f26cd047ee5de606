//! Interactive confirmation.

use std::io::{BufRead, Write};

use crate::error::Result;

/// Asks the operator whether a rendered diff should be applied.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm: Send + Sync {
    /// Shows `rendered_diff` and returns true if the operator accepts it.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read or written.
    fn confirm(&self, rendered_diff: &str) -> Result<bool>;
}

/// Prompts on stderr and reads the answer from stdin.
///
/// An empty line counts as yes; end of input counts as no.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Creates a terminal prompt.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn ask(
        rendered_diff: &str,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<bool> {
        writeln!(output, "The following CloudFormation changes will be made:")?;
        writeln!(output, "{rendered_diff}")?;
        write!(output, "\nDo you wish to continue? [Y/n]: ")?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 {
            // Closed stdin: nobody answered.
            writeln!(output)?;
            return Ok(false);
        }

        Ok(is_yes(&answer))
    }
}

impl Confirm for TerminalPrompt {
    fn confirm(&self, rendered_diff: &str) -> Result<bool> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stderr();
        Self::ask(rendered_diff, &mut input, &mut output)
    }
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(text: &str) -> (bool, String) {
        let mut input = Cursor::new(text.as_bytes().to_vec());
        let mut output = Vec::new();
        let accepted = TerminalPrompt::ask("Stack app:", &mut input, &mut output).unwrap();
        (accepted, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_default_answer_is_yes() {
        let (accepted, shown) = answer("\n");
        assert!(accepted);
        assert!(shown.starts_with("The following CloudFormation changes will be made:\nStack app:\n"));
        assert!(shown.ends_with("Do you wish to continue? [Y/n]: "));
    }

    #[test]
    fn test_explicit_answers() {
        assert!(answer("y\n").0);
        assert!(answer("YES\n").0);
        assert!(!answer("n\n").0);
        assert!(!answer("nope\n").0);
    }

    #[test]
    fn test_closed_stdin_declines() {
        let (accepted, shown) = answer("");
        assert!(!accepted);
        assert!(shown.contains("Do you wish to continue? [Y/n]: "));
    }
}
