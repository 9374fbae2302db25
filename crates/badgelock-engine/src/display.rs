//! Overlay display model.
//!
//! The state machine emits a [`DisplayDirective`] every tick. A
//! [`Presentation`] turns directives into something the user sees; the
//! [`OverlayDisplay`] keeps the rendered overlay in memory so it can be drawn
//! by a terminal front end or inspected in tests.
//!
//! Body text may contain several lines and non-ASCII text, so widths are
//! counted in `char`s.

use serde::{Deserialize, Serialize};

/// What the overlay should show after a tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplayDirective {
    /// Whether the overlay is shown.
    pub visible: bool,

    /// Main message, empty when hidden.
    pub body_text: String,

    /// Countdown line, empty when hidden.
    pub timer_text: String,

    /// Set when the body differs from the last body pushed to the overlay.
    pub body_changed: bool,
}

impl DisplayDirective {
    /// Overlay hidden.
    pub fn hidden() -> Self {
        Self::default()
    }

    /// Overlay shown with the given body and countdown.
    pub fn shown(body_text: &str, timer_text: String, body_changed: bool) -> Self {
        Self {
            visible: true,
            body_text: body_text.to_string(),
            timer_text,
            body_changed,
        }
    }
}

/// Sink for display directives.
pub trait Presentation {
    fn present(&mut self, directive: &DisplayDirective);
}

/// Horizontal text alignment within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

/// In-memory overlay with a fixed character width.
///
/// # Examples
///
/// ```
/// use badgelock_engine::{DisplayDirective, OverlayDisplay};
///
/// let mut overlay = OverlayDisplay::new(20);
/// overlay.apply(&DisplayDirective::shown("Hello", "Auto Lock in: 9".into(), true));
///
/// assert!(overlay.is_visible());
/// assert_eq!(overlay.render()[0].trim(), "Hello");
/// ```
#[derive(Debug, Clone)]
pub struct OverlayDisplay {
    width: usize,
    alignment: Alignment,
    visible: bool,
    body: Vec<String>,
    timer: String,
}

impl OverlayDisplay {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            alignment: Alignment::Center,
            visible: false,
            body: Vec::new(),
            timer: String::new(),
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Body lines as last set.
    pub fn body_lines(&self) -> &[String] {
        &self.body
    }

    pub fn timer(&self) -> &str {
        &self.timer
    }

    /// Apply a directive.
    ///
    /// Returns `true` if anything visible changed. The body is only replaced
    /// when the directive marks it as changed; hiding keeps the last body.
    pub fn apply(&mut self, directive: &DisplayDirective) -> bool {
        if !directive.visible {
            let changed = self.visible;
            self.visible = false;
            return changed;
        }

        let mut changed = !self.visible;
        self.visible = true;

        if directive.body_changed || self.body.is_empty() {
            let body: Vec<String> = directive.body_text.lines().map(sanitize_line).collect();
            if body != self.body {
                self.body = body;
                changed = true;
            }
        }

        if directive.timer_text != self.timer {
            self.timer = directive.timer_text.clone();
            changed = true;
        }

        changed
    }

    /// Render the overlay as aligned lines, body first then the countdown.
    ///
    /// A hidden overlay renders no lines.
    pub fn render(&self) -> Vec<String> {
        if !self.visible {
            return Vec::new();
        }

        self.body
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(""))
            .chain(std::iter::once(self.timer.as_str()))
            .map(|line| align_text(line, self.width, self.alignment))
            .collect()
    }
}

impl Presentation for OverlayDisplay {
    fn present(&mut self, directive: &DisplayDirective) {
        self.apply(directive);
    }
}

/// Truncate text to at most `max_chars` characters.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Align text within a fixed width, padding with spaces.
///
/// # Examples
///
/// ```
/// use badgelock_engine::{align_text, Alignment};
///
/// assert_eq!(align_text("HELLO", 10, Alignment::Left), "HELLO     ");
/// assert_eq!(align_text("HELLO", 10, Alignment::Center), "  HELLO   ");
/// assert_eq!(align_text("HELLO", 10, Alignment::Right), "     HELLO");
/// ```
pub fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let char_count = text.chars().count();

    if char_count >= width {
        return truncate_text(text, width);
    }

    let padding = width - char_count;

    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

fn sanitize_line(line: &str) -> String {
    line.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
