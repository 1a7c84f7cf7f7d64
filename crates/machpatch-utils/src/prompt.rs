//! # Confirmation Prompts
//!
//! Yes/no questions on the terminal. Answers are read the way Python's
//! `strtobool` reads them:
//!
//! - yes: `y`, `yes`, `t`, `true`, `on`, `1`
//! - no: `n`, `no`, `f`, `false`, `off`, `0`
//!
//! Matching ignores case and surrounding whitespace. Anything else asks
//! again; end of input answers "no".

use std::io::{self, BufRead, Write};

use tracing::debug;

/// Interpret one answer, `None` when it is neither yes nor no
pub fn parse_bool_answer(answer: &str) -> Option<bool>
{
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Ask `question` on `output` until `input` yields a yes or no answer
///
/// ## Errors
///
/// I/O errors from either stream.
pub fn confirm_with<R, W>(question: &str, input: &mut R, output: &mut W) -> io::Result<bool>
where
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(output, "{question} ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            // EOF
            writeln!(output)?;
            return Ok(false);
        }

        match parse_bool_answer(&line) {
            Some(answer) => return Ok(answer),
            None => {
                debug!(answer = line.trim(), "unrecognized answer");
                writeln!(output, "Please answer yes or no.")?;
            }
        }
    }
}

/// [`confirm_with`] on stdin and stdout
///
/// ## Errors
///
/// I/O errors from the terminal.
pub fn confirm(question: &str) -> io::Result<bool>
{
    let stdin = io::stdin();
    let stdout = io::stdout();
    confirm_with(question, &mut stdin.lock(), &mut stdout.lock())
}
