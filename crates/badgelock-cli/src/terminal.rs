//! Terminal rendering of the lock overlay.

use std::io::{self, Write};

use badgelock_engine::{DisplayDirective, OverlayDisplay, Presentation};
use tracing::debug;

/// Overlay width in characters.
pub const OVERLAY_WIDTH: usize = 48;

/// Draws the overlay to a writer whenever its content changes.
///
/// Unchanged directives are absorbed by the inner [`OverlayDisplay`], so the
/// terminal is only written when something visible differs.
#[derive(Debug)]
pub struct TerminalPresentation<W: Write> {
    overlay: OverlayDisplay,
    out: W,
}

impl TerminalPresentation<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresentation<W> {
    pub fn new(out: W) -> Self {
        Self {
            overlay: OverlayDisplay::new(OVERLAY_WIDTH),
            out,
        }
    }

    pub fn overlay(&self) -> &OverlayDisplay {
        &self.overlay
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self) -> io::Result<()> {
        if !self.overlay.is_visible() {
            writeln!(self.out, "[overlay hidden]")?;
            return self.out.flush();
        }

        let border = format!("+{}+", "-".repeat(self.overlay.width()));
        writeln!(self.out, "{border}")?;
        for line in self.overlay.render() {
            writeln!(self.out, "|{line}|")?;
        }
        writeln!(self.out, "{border}")?;
        self.out.flush()
    }
}

impl<W: Write> Presentation for TerminalPresentation<W> {
    fn present(&mut self, directive: &DisplayDirective) {
        if !self.overlay.apply(directive) {
            return;
        }
        if let Err(e) = self.draw() {
            debug!("Failed to draw overlay: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(presentation: TerminalPresentation<Vec<u8>>) -> String {
        String::from_utf8(presentation.into_inner()).unwrap()
    }

    #[test]
    fn test_draws_visible_overlay() {
        let mut terminal = TerminalPresentation::new(Vec::new());
        terminal.present(&DisplayDirective::shown(
            "Please place card",
            "Auto Lock in: 10".into(),
            true,
        ));

        let text = output(terminal);
        assert!(text.contains("Please place card"));
        assert!(text.contains("Auto Lock in: 10"));
        assert!(text.starts_with('+'));
    }

    #[test]
    fn test_unchanged_directive_not_redrawn() {
        let mut terminal = TerminalPresentation::new(Vec::new());
        let directive = DisplayDirective::shown("Body", "Auto Lock in: 5".into(), true);

        terminal.present(&directive);
        terminal.present(&directive);

        assert_eq!(output(terminal).matches("Auto Lock in: 5").count(), 1);
    }

    #[test]
    fn test_hide_written_once() {
        let mut terminal = TerminalPresentation::new(Vec::new());
        terminal.present(&DisplayDirective::shown("Body", "Auto Lock in: 5".into(), true));
        terminal.present(&DisplayDirective::hidden());
        terminal.present(&DisplayDirective::hidden());

        assert!(!terminal.overlay().is_visible());
        assert_eq!(output(terminal).matches("[overlay hidden]").count(), 1);
    }

    #[test]
    fn test_initial_hide_draws_nothing() {
        let mut terminal = TerminalPresentation::new(Vec::new());
        terminal.present(&DisplayDirective::hidden());
        assert!(output(terminal).is_empty());
    }
}
