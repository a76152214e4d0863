use std::fmt::Display;
use std::io::{self, Stdout, Write};

use console::StyledObject;

use super::styling::{bright, bright_green, bright_red};

/// User-facing transcript of a run.
///
/// Progress markers share one line; the next message starts on a fresh line.
/// Styling is applied only when `colors` is set, so captured transcripts stay
/// plain text.
pub struct Reporter<W: Write> {
    out: W,
    colors: bool,
    mid_line: bool,
}

impl Reporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), console::colors_enabled())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, colors: bool) -> Self {
        Self {
            out,
            colors,
            mid_line: false,
        }
    }

    pub fn colors(&self) -> bool {
        self.colors
    }

    pub fn line(&mut self, message: impl Display) -> io::Result<()> {
        self.end_progress()?;
        writeln!(self.out, "{message}")?;
        self.out.flush()
    }

    pub fn blank(&mut self) -> io::Result<()> {
        self.line("")
    }

    /// One progress marker, flushed immediately.
    pub fn progress(&mut self) -> io::Result<()> {
        write!(self.out, ".")?;
        self.mid_line = true;
        self.out.flush()
    }

    pub fn success(&mut self, message: impl Display) -> io::Result<()> {
        let styled = self.paint(bright_green(message));
        self.line(styled)
    }

    pub fn failure(&mut self, message: impl Display) -> io::Result<()> {
        let styled = self.paint(bright_red(message));
        self.line(styled)
    }

    pub fn heading(&mut self, message: impl Display) -> io::Result<()> {
        let styled = self.paint(bright(message));
        self.line(styled)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn end_progress(&mut self) -> io::Result<()> {
        if self.mid_line {
            self.mid_line = false;
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn paint(&self, styled: StyledObject<String>) -> StyledObject<String> {
        styled.force_styling(self.colors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_progress_markers_share_a_line() {
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.line("Waiting for pipeline 1 to finish ...").unwrap();
        reporter.progress().unwrap();
        reporter.progress().unwrap();
        reporter.success("Pipeline succeeded").unwrap();

        assert_eq!(
            transcript(reporter),
            "Waiting for pipeline 1 to finish ...\n..\nPipeline succeeded\n"
        );
    }

    #[test]
    fn test_blank_closes_progress_line() {
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.progress().unwrap();
        reporter.blank().unwrap();
        reporter.line("next").unwrap();

        assert_eq!(transcript(reporter), ".\n\nnext\n");
    }

    #[test]
    fn test_colors_disabled_is_plain() {
        let mut reporter = Reporter::new(Vec::new(), false);
        reporter.failure("Pipeline failed!").unwrap();
        assert_eq!(transcript(reporter), "Pipeline failed!\n");
    }

    #[test]
    fn test_colors_enabled_is_styled() {
        let mut reporter = Reporter::new(Vec::new(), true);
        reporter.failure("Pipeline failed!").unwrap();
        let output = transcript(reporter);
        assert_ne!(output, "Pipeline failed!\n");
        assert_eq!(console::strip_ansi_codes(&output), "Pipeline failed!\n");
    }
}
