use crate::state::{Toast, ToastKind, ViewState};
use crate::theme::{self, cells, glyphs};
use fleet_core::layout::{self, GridExtent, LayoutMode, LayoutPlan, LayoutProfile, Viewport};
use fleet_core::occupancy::{self, Cell as GridCell, CellContent, OccupancyMap, StackOffset};
use fleet_core::projection::{self, FilterCounts, StatusCounters};
use fleet_core::BotId;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

const PROFILE: LayoutProfile = LayoutProfile::TERMINAL;
const ROW_LABEL_WIDTH: usize = 4;
const UNREACHABLE_AFTER: u32 = 3;
const BOT_ORDER_CAPACITY: u32 = 3;

pub fn render(f: &mut Frame, app: &ViewState) {
    let area = f.size();
    let plan = layout::plan(
        Viewport::new(u32::from(area.width), u32::from(area.height)),
        app.topology.as_ref(),
        &PROFILE,
    );
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);
    f.render_widget(render_header(app, plan), rows[0]);
    f.render_widget(render_counters(app), rows[1]);
    match plan.mode {
        LayoutMode::Panels => render_panels(f, app, plan, rows[2]),
        LayoutMode::Stacked => render_stacked(f, app, plan, rows[2]),
    }
    if let Some(toast) = &app.toast {
        render_toast(f, toast, area);
    }
    if app.show_help {
        render_help(f, area);
    }
}

fn render_panels(f: &mut Frame, app: &ViewState, plan: LayoutPlan, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(to_u16(PROFILE.left_panel)),
            Constraint::Min(0),
            Constraint::Length(to_u16(PROFILE.right_panel)),
        ])
        .split(area);
    render_controls(f, app, columns[0]);
    render_grid(f, app, plan, columns[1]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(columns[2]);
    render_bots(f, app, right[0]);
    render_orders(f, app, right[1]);
    render_log(f, app, right[2]);
}

fn render_stacked(f: &mut Frame, app: &ViewState, plan: LayoutPlan, area: Rect) {
    let grid_height = grid_height(app, plan.cell_size).min(area.height.saturating_mul(3) / 5);
    let controls_height = if app.show_guide { 9 } else { 6 };
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(grid_height),
            Constraint::Length(controls_height),
            Constraint::Min(0),
        ])
        .split(area);
    render_grid(f, app, plan, sections[0]);
    render_controls(f, app, sections[1]);

    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(sections[2]);
    render_bots(f, app, lower[0]);
    render_orders(f, app, lower[1]);
    render_log(f, app, lower[2]);
}

fn panel(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme::BORDER_STYLE)
        .title(Span::styled(title, theme::TITLE_STYLE))
}

fn render_header(app: &ViewState, plan: LayoutPlan) -> Paragraph<'static> {
    let (run_label, run_color) = match &app.status {
        Some(status) if status.is_running => ("RUNNING", theme::OK),
        Some(_) => ("STOPPED", theme::WARN),
        None => ("UNKNOWN", theme::MUTED),
    };
    let tick = app.status.as_ref().map_or(0, |status| status.tick_count);
    let (auto_label, auto_color) = if app.auto_advance {
        ("auto ON", theme::OK)
    } else {
        ("auto OFF", theme::MUTED)
    };
    let mut spans = vec![
        Span::styled("FLEET MONITOR", theme::HEADER_STYLE),
        Span::raw("  "),
        Span::styled(
            run_label,
            Style::new().fg(run_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  tick {tick}  "), theme::TEXT_STYLE),
        Span::styled(auto_label, Style::new().fg(auto_color)),
        Span::styled(
            format!("  {} · cell {}", plan.mode.label(), plan.cell_size),
            theme::MUTED_STYLE,
        ),
    ];
    if let Some(note) = status_note(app) {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(note, Style::new().fg(theme::WARN)));
    }
    Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::BORDER_STYLE),
    )
}

fn status_note(app: &ViewState) -> Option<String> {
    if let Some(note) = &app.status_note {
        return Some(note.clone());
    }
    (app.poll_failures >= UNREACHABLE_AFTER).then(|| {
        format!(
            "source unreachable; holding last snapshot ({} failed polls)",
            app.poll_failures
        )
    })
}

fn render_counters(app: &ViewState) -> Paragraph<'static> {
    let counters = app
        .status
        .as_ref()
        .map(StatusCounters::from_status)
        .unwrap_or_default();
    let active_bots = projection::active_bot_count(&app.bots);
    let counter = |label: &'static str, value: i64, color: Color| {
        [
            Span::styled(format!("{label} "), theme::MUTED_STYLE),
            Span::styled(
                format!("{value:<6}"),
                Style::new().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]
    };
    let mut spans = Vec::new();
    spans.extend(counter("Total", counters.total, theme::TEXT));
    spans.extend(counter("Pending", counters.pending, theme::WARN));
    spans.extend(counter("Active", counters.active, theme::INFO));
    spans.extend(counter("Delivered", counters.delivered, theme::OK));
    spans.push(Span::styled("│ Bots active ", theme::MUTED_STYLE));
    spans.push(Span::styled(
        format!("{active_bots}/{}", app.bots.len()),
        Style::new().fg(theme::INFO).add_modifier(Modifier::BOLD),
    ));
    Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme::BORDER_STYLE),
    )
}

fn render_controls(f: &mut Frame, app: &ViewState, area: Rect) {
    let restaurant = app
        .selected_restaurant()
        .map(|r| format!("{} (node {})", r.name, r.node_id))
        .unwrap_or_else(|| "none".to_string());
    let delivery = app
        .selected_delivery_point()
        .map(|node| format!("node {} {}", node.id, node.address))
        .unwrap_or_else(|| "none".to_string());

    let mut lines = vec![
        key_line("[ ]", format!("from  {restaurant}")),
        key_line(", .", format!("to    {delivery}")),
        key_line("n", "create order".to_string()),
    ];
    if app.show_guide {
        lines.extend([
            Line::from(""),
            key_line("s x t R", "start stop tick reset".to_string()),
            key_line("a", "toggle auto-advance".to_string()),
            key_line("f", format!("order filter ({})", app.filter.label())),
            Line::from(vec![
                Span::styled(format!("{} ", glyphs::DELIVERY), Style::new().fg(theme::OK)),
                Span::styled("delivery  ", theme::MUTED_STYLE),
                Span::styled("RAMEN ", Style::new().bg(cells::RESTAURANT_BG)),
                Span::styled(" restaurant  ", theme::MUTED_STYLE),
                Span::styled("g", theme::KEY_STYLE),
                Span::styled(" hide", theme::MUTED_STYLE),
            ]),
        ]);
    }
    f.render_widget(
        Paragraph::new(lines)
            .block(panel("New order".to_string()))
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn key_line(keys: &str, text: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{keys:<8}"), theme::KEY_STYLE),
        Span::styled(text, theme::TEXT_STYLE),
    ])
}

fn render_grid(f: &mut Frame, app: &ViewState, plan: LayoutPlan, area: Rect) {
    let Some(topology) = &app.topology else {
        let note = app
            .status_note
            .clone()
            .unwrap_or_else(|| "loading grid".to_string());
        f.render_widget(
            Paragraph::new(Line::from(Span::styled(note, theme::MUTED_STYLE)))
                .block(panel("Grid".to_string()))
                .wrap(Wrap { trim: true }),
            area,
        );
        return;
    };

    let map = occupancy::resolve(topology, &app.bots);
    let extent = GridExtent::of(topology);
    let mut title = format!(
        "Grid {}x{} · {} placed",
        extent.columns,
        extent.rows,
        map.placed_bots()
    );
    if map.unresolved > 0 {
        title.push_str(&format!(" · {} bots off-grid", map.unresolved));
    }
    f.render_widget(
        Paragraph::new(grid_lines(&map, plan.cell_size)).block(panel(title)),
        area,
    );
}

fn grid_height(app: &ViewState, cell_size: u32) -> u16 {
    let rows = app
        .topology
        .as_ref()
        .map_or(GridExtent::FALLBACK.rows, |topology| {
            GridExtent::of(topology).rows
        });
    let body = rows.saturating_mul(PROFILE.cell_rows(cell_size));
    to_u16(body.saturating_add(3))
}

fn grid_lines(map: &OccupancyMap<'_>, cell_size: u32) -> Vec<Line<'static>> {
    let Some(bounds) = map.bounds else {
        return vec![Line::from(Span::styled("no nodes", theme::MUTED_STYLE))];
    };
    let width = cell_size.max(2) as usize;
    let height = PROFILE.cell_rows(cell_size) as usize;

    let mut lines = Vec::with_capacity(map.rows.len() * height + 1);
    let mut axis = vec![Span::raw(" ".repeat(ROW_LABEL_WIDTH))];
    for x in bounds.min_x..=bounds.max_x {
        axis.push(Span::styled(format!("{x:^width$}"), theme::MUTED_STYLE));
    }
    lines.push(Line::from(axis));

    for row in &map.rows {
        let y = row.first().map_or(0, |cell| cell.y);
        let canvases: Vec<CellCanvas> = row
            .iter()
            .map(|cell| paint_cell(cell, width - 1, height))
            .collect();
        for sub in 0..height {
            let label = if sub == height / 2 {
                format!("{y:>3} ")
            } else {
                " ".repeat(ROW_LABEL_WIDTH)
            };
            let mut spans = vec![Span::styled(label, theme::MUTED_STYLE)];
            for canvas in &canvases {
                spans.extend(canvas.row_spans(sub));
            }
            lines.push(Line::from(spans));
        }
    }
    lines
}

/// Character raster of one grid cell, without the one-column gutter that
/// separates it from its right neighbour.
struct CellCanvas {
    width: usize,
    glyphs: Vec<Vec<(String, Style)>>,
}

impl CellCanvas {
    fn new(width: usize, height: usize, style: Style) -> Self {
        let width = width.max(1);
        Self {
            width,
            glyphs: vec![vec![(" ".to_string(), style); width]; height.max(1)],
        }
    }

    fn put(&mut self, col: usize, row: usize, glyph: &str, style: Style) {
        if let Some(slot) = self.glyphs.get_mut(row).and_then(|r| r.get_mut(col)) {
            *slot = (glyph.to_string(), style);
        }
    }

    fn slots(&self) -> usize {
        self.width * self.glyphs.len()
    }

    fn is_blank(&self, col: usize, row: usize) -> bool {
        self.glyphs
            .get(row)
            .and_then(|r| r.get(col))
            .is_some_and(|(glyph, _)| glyph == " ")
    }

    /// Places `glyph` at the requested slot, or the first blank slot when
    /// the cell is too small to keep formation positions apart.
    fn put_free(&mut self, col: usize, row: usize, glyph: &str, style: Style) -> bool {
        if self.is_blank(col, row) {
            self.put(col, row, glyph, style);
            return true;
        }
        let height = self.glyphs.len();
        for r in 0..height {
            for c in 0..self.width {
                if self.is_blank(c, r) {
                    self.put(c, r, glyph, style);
                    return true;
                }
            }
        }
        false
    }

    fn label(&mut self, row: usize, text: &str, style: Style) {
        let chars: Vec<char> = text.chars().take(self.width).collect();
        let start = (self.width - chars.len()) / 2;
        for (idx, ch) in chars.iter().enumerate() {
            self.put(start + idx, row, &ch.to_string(), style);
        }
    }

    fn row_spans(&self, row: usize) -> Vec<Span<'static>> {
        let mut spans: Vec<Span<'static>> = self
            .glyphs
            .get(row)
            .map(|r| {
                r.iter()
                    .map(|(glyph, style)| Span::styled(glyph.clone(), *style))
                    .collect()
            })
            .unwrap_or_default();
        spans.push(Span::raw(" "));
        spans
    }

    #[cfg(test)]
    fn count(&self, glyph: &str) -> usize {
        self.glyphs
            .iter()
            .flatten()
            .filter(|(g, _)| g == glyph)
            .count()
    }
}

fn paint_cell(cell: &GridCell<'_>, width: usize, height: usize) -> CellCanvas {
    let bg = match &cell.content {
        CellContent::Filler => cells::FILLER_BG,
        CellContent::Empty { .. } => cells::EMPTY_BG,
        CellContent::Delivery { .. } => cells::DELIVERY_BG,
        CellContent::Restaurant { .. } => cells::RESTAURANT_BG,
        CellContent::Bots {
            restaurant,
            delivery,
            ..
        } => {
            if restaurant.is_some() {
                cells::RESTAURANT_BG
            } else if *delivery {
                cells::DELIVERY_BG
            } else {
                cells::EMPTY_BG
            }
        }
    };
    let base = Style::new().bg(bg);
    let mut canvas = CellCanvas::new(width, height, base);
    let mid_row = height / 2;
    let mid_col = canvas.width / 2;

    match &cell.content {
        CellContent::Filler => {}
        CellContent::Empty { .. } => {
            canvas.put(mid_col, mid_row, glyphs::EMPTY, theme::MUTED_STYLE.bg(bg));
        }
        CellContent::Delivery { .. } => {
            canvas.put(
                mid_col,
                mid_row,
                glyphs::DELIVERY,
                base.fg(theme::OK).add_modifier(Modifier::BOLD),
            );
        }
        CellContent::Restaurant { restaurant, .. } => {
            canvas.label(
                mid_row,
                &restaurant.name,
                base.fg(Color::White).add_modifier(Modifier::BOLD),
            );
        }
        CellContent::Bots {
            placements, hidden, ..
        } => {
            // The overflow marker always gets a slot of its own.
            let overflow = *hidden > 0 || placements.len() > canvas.slots();
            let shown = if overflow {
                placements.len().min(canvas.slots().saturating_sub(1))
            } else {
                placements.len()
            };
            for placement in &placements[..shown] {
                let (col, row) = slot_position(placement.offset, canvas.width, height);
                canvas.put_free(
                    col,
                    row,
                    &bot_glyph(placement.bot.id),
                    base.fg(theme::bot_color(placement.bot.id))
                        .add_modifier(Modifier::BOLD),
                );
            }
            if overflow {
                let last_col = canvas.width - 1;
                canvas.put_free(
                    last_col,
                    height.saturating_sub(1),
                    glyphs::OVERFLOW,
                    base.fg(theme::WARN).add_modifier(Modifier::BOLD),
                );
            }
        }
    }
    canvas
}

/// Maps a formation offset in `[-1, 1]` onto a character slot.
fn slot_position(offset: StackOffset, width: usize, height: usize) -> (usize, usize) {
    let axis = |value: f32, extent: usize| -> usize {
        if extent <= 1 {
            return 0;
        }
        let scaled = ((value + 1.0) / 2.0 * (extent - 1) as f32).round();
        (scaled.max(0.0) as usize).min(extent - 1)
    };
    (axis(offset.x, width), axis(offset.y, height))
}

fn bot_glyph(bot_id: BotId) -> String {
    char::from_digit(bot_id.rem_euclid(10) as u32, 10)
        .map(String::from)
        .unwrap_or_else(|| glyphs::BOT.to_string())
}

fn render_bots(f: &mut Frame, app: &ViewState, area: Rect) {
    let active = projection::active_bot_count(&app.bots);
    let items: Vec<ListItem> = if app.bots.is_empty() {
        vec![ListItem::new(Span::styled("No bots reported", theme::MUTED_STYLE))]
    } else {
        app.bots
            .iter()
            .map(|bot| {
                let node = bot
                    .current_node_id
                    .map_or_else(|| "off-grid".to_string(), |id| format!("n{id}"));
                let location = match (bot.x, bot.y) {
                    (Some(x), Some(y)) => format!("{node} ({x},{y})"),
                    _ => node,
                };
                let load = if bot.active_orders > 0 {
                    format!(" {}/{BOT_ORDER_CAPACITY} orders", bot.active_orders)
                } else {
                    String::new()
                };
                let target = bot
                    .target
                    .as_ref()
                    .map(|t| format!(" → {} n{}", t.action.as_str(), t.node_id))
                    .unwrap_or_default();
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", glyphs::BOT),
                        Style::new().fg(theme::bot_color(bot.id)),
                    ),
                    Span::styled(format!("{:<8}", bot.name), theme::TEXT_STYLE),
                    Span::styled(
                        format!("{:<11}", bot.status.as_str()),
                        Style::new().fg(theme::bot_status_color(bot.status)),
                    ),
                    Span::styled(
                        format!("{location}{load}{target}"),
                        theme::MUTED_STYLE,
                    ),
                ]))
            })
            .collect()
    };
    f.render_widget(
        List::new(items).block(panel(format!("Bots {active}/{} active", app.bots.len()))),
        area,
    );
}

fn render_orders(f: &mut Frame, app: &ViewState, area: Rect) {
    let counts = FilterCounts::of(&app.orders);
    let visible = projection::filter_orders(&app.orders, app.filter);
    let title = format!(
        "Orders [{}] {} · active {} · delivered {}",
        app.filter.label(),
        counts.for_filter(app.filter),
        counts.active,
        counts.delivered
    );
    let items: Vec<ListItem> = if visible.is_empty() {
        let note = if app.orders.is_empty() {
            "No orders yet"
        } else {
            "No orders match this filter"
        };
        vec![ListItem::new(Span::styled(note, theme::MUTED_STYLE))]
    } else {
        visible
            .iter()
            .map(|order| {
                let restaurant = order
                    .restaurant_name
                    .as_deref()
                    .or_else(|| {
                        app.topology
                            .as_ref()
                            .and_then(|topology| topology.restaurant(order.restaurant_id))
                            .map(|restaurant| restaurant.name.as_str())
                    })
                    .unwrap_or_else(|| order.restaurant_label());
                let bot = order.bot_name.as_deref().unwrap_or("");
                let bot_style = if order.assignment_consistent() {
                    theme::MUTED_STYLE
                } else {
                    Style::new().fg(theme::WARN)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("#{:<4}", order.id), theme::MUTED_STYLE),
                    Span::styled(
                        format!("{restaurant} → n{} ", order.delivery_node_id),
                        theme::TEXT_STYLE,
                    ),
                    Span::styled(
                        format!("{:<10}", order.status.as_str()),
                        Style::new().fg(theme::order_status_color(order.status)),
                    ),
                    Span::styled(bot.to_string(), bot_style),
                ]))
            })
            .collect()
    };
    f.render_widget(List::new(items).block(panel(title)), area);
}

fn render_log(f: &mut Frame, app: &ViewState, area: Rect) {
    let items: Vec<ListItem> = if app.log.is_empty() {
        vec![ListItem::new(Span::styled("No activity yet", theme::MUTED_STYLE))]
    } else {
        app.log
            .newest_first()
            .map(|entry| ListItem::new(Span::styled(entry.render(), theme::TEXT_STYLE)))
            .collect()
    };
    f.render_widget(
        List::new(items).block(panel(format!("Activity ({})", app.log.len()))),
        area,
    );
}

fn render_toast(f: &mut Frame, toast: &Toast, area: Rect) {
    let height = 3;
    if area.width < 10 || area.height < height {
        return;
    }
    let width = area.width.min(60);
    let rect = Rect {
        x: area.x + area.width - width,
        y: area.y + area.height - height,
        width,
        height,
    };
    let title = match toast.kind {
        ToastKind::Error => "Error",
        ToastKind::Info => "Notice",
    };
    let style = theme::toast_style(toast.kind);
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(toast.message.clone())
            .style(style)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .style(style)
                    .title(format!("{title} · Esc")),
            )
            .wrap(Wrap { trim: true }),
        rect,
    );
}

fn render_help(f: &mut Frame, area: Rect) {
    let area = centered_rect(60, 70, area);
    let section = |label: &'static str| {
        Line::from(Span::styled(label, theme::TITLE_STYLE))
    };
    let lines = vec![
        Line::from(Span::styled("Controls", theme::HEADER_STYLE)),
        section("Simulation"),
        key_line("  s", "start".to_string()),
        key_line("  x", "stop (ends auto-advance)".to_string()),
        key_line("  t", "advance one tick".to_string()),
        key_line("  R", "reset (ends auto-advance, clears activity)".to_string()),
        key_line("  a", "toggle auto-advance".to_string()),
        Line::from(""),
        section("Orders"),
        key_line("  [ ]", "previous/next restaurant".to_string()),
        key_line("  , .", "previous/next delivery point".to_string()),
        key_line("  n", "create order (also Enter)".to_string()),
        key_line("  f", "cycle filter ALL/ACTIVE/DELIVERED".to_string()),
        Line::from(""),
        section("View"),
        key_line("  g", "toggle guide".to_string()),
        key_line("  ?", "toggle this help".to_string()),
        key_line("  Esc", "close help or dismiss notice".to_string()),
        key_line("  q", "quit".to_string()),
    ];
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(Text::from(lines))
            .block(panel("Help".to_string()))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100u16.saturating_sub(percent_y)) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100u16.saturating_sub(percent_x)) / 2),
        ])
        .split(vertical[1])[1]
}

fn to_u16(value: u32) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}
