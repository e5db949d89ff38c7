//! Yes/no confirmation prompts.

use crate::output::Printer;
use std::io::BufRead;

/// Ask `message` and read one answer line from `input`.
///
/// Only `y` and `yes` confirm; end of input counts as a refusal.
pub fn confirm(printer: &Printer, input: &mut dyn BufRead, message: &str) -> std::io::Result<bool> {
    printer.print(format_args!("? {message} [y/N]: "));

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        printer.println("");
        return Ok(false);
    }

    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CapturedOutput;
    use std::io::Cursor;

    #[test]
    fn test_confirm_accepts_yes() {
        let (printer, out) = CapturedOutput::printer(false);
        let mut input = Cursor::new(b"Yes\n".to_vec());
        assert!(confirm(&printer, &mut input, "Really?").unwrap());
        assert_eq!(out.stdout(), "? Really? [y/N]: ");
    }

    #[test]
    fn test_confirm_defaults_to_no() {
        let (printer, _) = CapturedOutput::printer(false);
        assert!(!confirm(&printer, &mut Cursor::new(b"\n".to_vec()), "Really?").unwrap());
        assert!(!confirm(&printer, &mut Cursor::new(Vec::new()), "Really?").unwrap());
    }
}
