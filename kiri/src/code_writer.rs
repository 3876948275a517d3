use thiserror::Error;

use std::fmt;

pub struct CodeWriter<'a, W: fmt::Write> {
    w: &'a mut W,
    indent_level: u32,
}

impl<'a, W: fmt::Write> CodeWriter<'a, W> {
    pub fn new(w: &'a mut W) -> CodeWriter<'a, W> {
        CodeWriter {
            w,
            indent_level: 0,
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn unindent(&mut self) -> Result<(), Error> {
        if self.indent_level == 0 {
            return Err(Error::IndentUnderflow);
        }
        self.indent_level -= 1;
        Ok(())
    }

    pub fn append_indent(&mut self) -> Result<(), Error> {
        for _ in 0..self.indent_level {
            self.w.write_str("    ")?;
        }
        Ok(())
    }

    pub fn append_newline(&mut self) -> Result<(), Error> {
        self.w.write_char('\n')?;
        Ok(())
    }

    pub fn append(&mut self, s: &str) -> Result<(), Error> {
        self.w.write_str(s)?;
        Ok(())
    }

    pub fn append_line(&mut self, s: &str) -> Result<(), Error> {
        self.append_indent()?;
        self.append(s)?;
        self.append_newline()?;
        Ok(())
    }

    /// Appends `lines` as one `begin`/`end` block opened by `header`.
    pub fn append_block<I, S>(&mut self, header: &str, lines: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.append_line(&format!("{} begin", header))?;
        self.indent();
        for line in lines {
            self.append_line(line.as_ref())?;
        }
        self.unindent()?;
        self.append_line("end")
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Attempted to unindent past the first column.")]
    IndentUnderflow,
    #[error(transparent)]
    Format(#[from] fmt::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_indented_by_four_spaces() {
        let mut s = String::new();
        let mut w = CodeWriter::new(&mut s);

        w.append_line("a").unwrap();
        w.indent();
        w.append_line("b").unwrap();
        w.indent();
        w.append_block("c", &["d"]).unwrap();
        w.unindent().unwrap();
        w.unindent().unwrap();
        w.append_line("e").unwrap();

        assert_eq!(s, "a\n    b\n        c begin\n            d\n        end\ne\n");
    }

    #[test]
    fn unindent_underflow_error() {
        let mut s = String::new();
        let mut w = CodeWriter::new(&mut s);

        assert!(matches!(w.unindent(), Err(Error::IndentUnderflow)));
    }
}
