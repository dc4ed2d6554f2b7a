//! Status bar widget - mode indicator, command line and help overlay

use crate::app::{InputMode, MessageType};
use crate::theme::Theme;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// One-line footer: input mode, message or command line, key hint
pub struct StatusBarWidget<'a> {
    mode: InputMode,
    command_buffer: &'a str,
    message: Option<&'a str>,
    message_type: MessageType,
    chain: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(mode: InputMode, command_buffer: &'a str, theme: &'a Theme) -> Self {
        Self {
            mode,
            command_buffer,
            message: None,
            message_type: MessageType::Info,
            chain: None,
            theme,
        }
    }

    pub fn message(mut self, text: Option<&'a str>, kind: MessageType) -> Self {
        self.message = text;
        self.message_type = kind;
        self
    }

    /// Active processing chain, shown when there is no message
    pub fn chain(mut self, chain: &'a str) -> Self {
        self.chain = Some(chain);
        self
    }

    fn mode_string(&self) -> (&'static str, Style) {
        match self.mode {
            InputMode::Normal => ("NORMAL", self.theme.highlight()),
            InputMode::Command => ("COMMAND", Style::from(self.theme.accent)),
            InputMode::Help => ("HELP", self.theme.highlight()),
        }
    }
}

impl StatusBarWidget<'_> {
    /// Middle section: command line, then message, then chain
    fn body(&self) -> Line<'_> {
        if self.mode == InputMode::Command {
            return Line::from(vec![
                Span::styled(":", Style::from(self.theme.accent)),
                Span::styled(self.command_buffer, self.theme.normal()),
                Span::styled("█", self.theme.highlight()),
            ]);
        }
        if let Some(text) = self.message {
            let color = match self.message_type {
                MessageType::Info => self.theme.fg_dim,
                MessageType::Success => self.theme.accent,
                MessageType::Warning => self.theme.warning,
                MessageType::Error => self.theme.danger,
            };
            return Line::styled(text, Style::default().fg(color));
        }
        match self.chain {
            Some(chain) => Line::from(vec![
                Span::styled("chain: ", self.theme.dim()),
                Span::styled(chain, self.theme.normal()),
            ]),
            None => Line::styled("? help  : command", self.theme.dim()),
        }
    }

    fn hint(&self) -> &'static str {
        match self.mode {
            InputMode::Normal => "Space:play  ?:help",
            InputMode::Command => "Enter:run  Esc:cancel",
            InputMode::Help => "Esc:close help",
        }
    }
}

impl Widget for StatusBarWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }

        let [badge, body, hint] = Layout::horizontal([
            Constraint::Length(10),
            Constraint::Min(20),
            Constraint::Length(24),
        ])
        .areas(area);

        let (label, style) = self.mode_string();
        Line::from(vec![Span::raw("["), Span::styled(label, style), Span::raw("]")])
            .render(badge, buf);
        self.body().render(body, buf);
        Line::styled(self.hint(), self.theme.dim()).render(hint, buf);
    }
}

const HELP_WIDTH: u16 = 52;

/// Scrollable key reference
pub struct HelpWidget<'a> {
    theme: &'a Theme,
    scroll: u16,
}

impl<'a> HelpWidget<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        Self { theme, scroll: 0 }
    }

    pub fn scroll(mut self, scroll: u16) -> Self {
        self.scroll = scroll;
        self
    }

    fn help_lines() -> Vec<&'static str> {
        vec![
            "╔══════════════════════════════════════════════════╗",
            "║            TINAMP - retro media player           ║",
            "║               ↑/↓ or j/k to scroll               ║",
            "╠══════════════════════════════════════════════════╣",
            "║ TRANSPORT                                        ║",
            "║   Space / x     Play / pause                     ║",
            "║   s             Stop                             ║",
            "║   n / b         Next / previous track            ║",
            "║   ← / →         Seek -5s / +5s                   ║",
            "║   0-9           Seek to 0% .. 90%                ║",
            "║   - / =         Volume down / up                 ║",
            "║   z / r         Shuffle / repeat                 ║",
            "╠──────────────────────────────────────────────────╣",
            "║ PANELS                                           ║",
            "║   e             Equalizer panel                  ║",
            "║   p             Playlist panel                   ║",
            "║   v             Visualizer panel                 ║",
            "║   m             Cycle visualizer mode            ║",
            "║   Tab           Focus equalizer / playlist       ║",
            "║   Ctrl-w        Minimize to main panel           ║",
            "╠──────────────────────────────────────────────────╣",
            "║ EQUALIZER (focused)                              ║",
            "║   h / l         Select band                      ║",
            "║   k / j         Band gain +1 / -1 dB             ║",
            "║   E             Equalizer on / off               ║",
            "║   P             Cycle preset                     ║",
            "╠──────────────────────────────────────────────────╣",
            "║ PLAYLIST (focused)                               ║",
            "║   j / k         Move cursor                      ║",
            "║   Enter         Play selected                    ║",
            "║   d             Remove selected                  ║",
            "║   C             Clear playlist                   ║",
            "╠──────────────────────────────────────────────────╣",
            "║ RETRO                                            ║",
            "║   a             AM radio mode on / off           ║",
            "╠──────────────────────────────────────────────────╣",
            "║ COMMANDS (:)                                     ║",
            "║   :add <path>       Add a file or .m3u playlist  ║",
            "║   :save <path>      Save playlist as M3U         ║",
            "║   :open <path>      Replace playlist from M3U    ║",
            "║   :preset <name>    flat rock pop jazz ...       ║",
            "║   :mode <name>      Visualizer mode              ║",
            "║   :theme <name>     classic / amber              ║",
            "║   :q                Quit                         ║",
            "╠══════════════════════════════════════════════════╣",
            "║     Press Esc or ? to close, Ctrl-Q to quit      ║",
            "╚══════════════════════════════════════════════════╝",
        ]
    }
}

impl Widget for HelpWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        buf.set_style(area, self.theme.normal());

        let lines = Self::help_lines();
        let rows = lines.len() as u16;
        let max_scroll = rows.saturating_sub(area.height);
        let scroll = self.scroll.min(max_scroll);

        let text: Vec<Line> = lines
            .iter()
            .map(|line| {
                Line::from(
                    line.chars()
                        .map(|ch| {
                            let style = if "║╔╗╚╝═╠╣─".contains(ch) {
                                self.theme.border()
                            } else {
                                self.theme.normal()
                            };
                            Span::styled(ch.to_string(), style)
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        let width = HELP_WIDTH.min(area.width);
        let boxed = Rect::new(area.x + (area.width - width) / 2, area.y, width, area.height);
        Paragraph::new(text).scroll((scroll, 0)).render(boxed, buf);

        if max_scroll > 0 {
            let page = format!(" [{}/{}] ", scroll + 1, max_scroll + 1);
            let x = area.right().saturating_sub(page.len() as u16 + 2);
            buf.set_string(x, area.bottom() - 1, page, self.theme.dim());
        }
    }
}
