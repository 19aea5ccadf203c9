use owo_colors::{OwoColorize, Style};

use crate::transport::ConnectionState;

/// Applies terminal colour when stdout is interactive.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading(self, text: &str) -> String {
        self.paint(text, Style::new().bold().cyan())
    }

    pub(crate) fn muted(self, text: &str) -> String {
        self.paint(text, Style::new().dimmed())
    }

    pub(crate) fn state(self, state: ConnectionState) -> String {
        let style = match state {
            ConnectionState::Connected => Style::new().bold().green(),
            ConnectionState::Connecting => Style::new().cyan(),
            ConnectionState::Reconnecting => Style::new().bold().yellow(),
            ConnectionState::Disconnected => Style::new().bold().red(),
        };
        self.paint(&state.to_string(), style)
    }

    fn paint(self, text: &str, style: Style) -> String {
        if self.use_colour {
            text.style(style).to_string()
        } else {
            text.to_string()
        }
    }
}
