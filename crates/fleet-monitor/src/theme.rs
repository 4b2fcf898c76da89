use crate::state::ToastKind;
use fleet_core::occupancy::palette_slot;
use fleet_core::{BotId, BotStatus, OrderStatus};
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(191, 219, 254))
    .add_modifier(Modifier::BOLD);
pub const TITLE_STYLE: Style = Style::new()
    .fg(Color::Rgb(56, 189, 248))
    .add_modifier(Modifier::BOLD);
pub const TEXT_STYLE: Style = Style::new().fg(TEXT);
pub const MUTED_STYLE: Style = Style::new().fg(MUTED);
pub const BORDER_STYLE: Style = Style::new().fg(Color::Rgb(71, 85, 105));
pub const KEY_STYLE: Style = Style::new().fg(Color::Cyan);

pub const TEXT: Color = Color::Rgb(226, 232, 240);
pub const MUTED: Color = Color::Rgb(148, 163, 184);
pub const OK: Color = Color::Rgb(34, 197, 94);
pub const WARN: Color = Color::Rgb(245, 158, 11);
pub const CRITICAL: Color = Color::Rgb(239, 68, 68);
pub const INFO: Color = Color::Rgb(59, 130, 246);

pub const BOT_COLORS: [Color; 5] = [
    Color::Rgb(59, 130, 246),
    Color::Rgb(239, 68, 68),
    Color::Rgb(16, 185, 129),
    Color::Rgb(245, 158, 11),
    Color::Rgb(168, 85, 247),
];

pub mod cells {
    use ratatui::style::Color;

    pub const EMPTY_BG: Color = Color::Rgb(30, 41, 59);
    pub const DELIVERY_BG: Color = Color::Rgb(20, 83, 45);
    pub const RESTAURANT_BG: Color = Color::Rgb(124, 45, 18);
    pub const FILLER_BG: Color = Color::Reset;
}

pub mod glyphs {
    pub const EMPTY: &str = "·";
    pub const DELIVERY: &str = "◆";
    pub const BOT: &str = "●";
    pub const OVERFLOW: &str = "+";
}

pub fn bot_color(bot_id: BotId) -> Color {
    BOT_COLORS[palette_slot(bot_id, BOT_COLORS.len())]
}

pub fn bot_status_color(status: BotStatus) -> Color {
    match status {
        BotStatus::Idle => MUTED,
        BotStatus::Moving => INFO,
        BotStatus::PickingUp => WARN,
        BotStatus::Delivering => OK,
    }
}

pub fn order_status_color(status: OrderStatus) -> Color {
    match status {
        OrderStatus::Pending => WARN,
        OrderStatus::Assigned => INFO,
        OrderStatus::PickedUp => Color::Rgb(168, 85, 247),
        OrderStatus::Delivered => OK,
        OrderStatus::Cancelled => CRITICAL,
    }
}

pub fn toast_style(kind: ToastKind) -> Style {
    let bg = match kind {
        ToastKind::Error => Color::Rgb(127, 29, 29),
        ToastKind::Info => Color::Rgb(30, 58, 138),
    };
    Style::new()
        .fg(Color::White)
        .bg(bg)
        .add_modifier(Modifier::BOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_colors_cycle_by_id() {
        assert_eq!(bot_color(1), BOT_COLORS[0]);
        assert_eq!(bot_color(5), BOT_COLORS[4]);
        assert_eq!(bot_color(6), BOT_COLORS[0]);
        assert_eq!(bot_color(0), BOT_COLORS[4]);
    }
}
