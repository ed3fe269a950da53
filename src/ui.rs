use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{
        Block, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs,
        Wrap,
    },
};
use std::time::Duration;

use crate::domain::{CMDMode, SheetConfig};
use crate::model::{Model, UIData};
use crate::notify::Severity;
use crate::sheet::{STATUS_KEY, SortDirection};

pub const TITLE_HEIGHT: usize = 1;
pub const TABS_HEIGHT: usize = 1;
pub const CMDLINE_HEIGH: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const TABLE_BORDER_HEIGHT: usize = 2;
/// Lines of the screen not available for table rows.
pub const TABLE_CHROME_HEIGHT: usize =
    TITLE_HEIGHT + TABS_HEIGHT + CMDLINE_HEIGH + TABLE_HEADER_HEIGHT + TABLE_BORDER_HEIGHT;
pub const COLUMN_WIDTH_MARGIN: usize = 1;

const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const PRIORITY_KEY: &str = "priority";

pub struct TableUI {
    header_style: Style,
    selected_style: Style,
    padding_style: Style,
}

impl TableUI {
    pub fn new(_config: &SheetConfig) -> Self {
        Self {
            header_style: Style::new().bold().fg(Color::Black).bg(Color::Gray),
            selected_style: Style::new().bg(Color::Blue).fg(Color::White),
            padding_style: Style::new().fg(Color::DarkGray),
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [title_area, table_area, tabs_area, cmd_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(TABS_HEIGHT as u16),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());

        self.draw_title(uidata, frame, title_area);
        self.draw_table(uidata, frame, table_area);
        self.draw_tabs(uidata, frame, tabs_area);
        self.draw_cmdline(uidata, frame, cmd_area);

        if uidata.show_column_menu {
            self.draw_column_menu(uidata, frame);
        }
        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_title(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![format!(" {} ", uidata.name).bold()];
        spans.push(format!(" {} records ", uidata.nrecords).dim());
        if !uidata.search_term.is_empty() {
            spans.push(" search: ".into());
            spans.push(uidata.search_term.clone().yellow());
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn header_cell(
        &self,
        name: &str,
        class: &str,
        sort: Option<SortDirection>,
        selected: bool,
    ) -> Cell<'static> {
        let arrow = match sort {
            Some(SortDirection::Asc) => " ▲",
            Some(SortDirection::Desc) => " ▼",
            None => "",
        };
        let style = if selected {
            self.selected_style.bold()
        } else {
            self.header_style.patch(class_style(class))
        };
        Cell::from(format!("{name}{arrow}")).style(style)
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let block = Block::bordered().border_set(border::PLAIN);

        let mut header = vec![Cell::from(uidata.index.name.clone()).style(self.header_style)];
        header.extend(
            uidata
                .table
                .iter()
                .map(|c| self.header_cell(&c.name, &c.class, c.sort, c.selected)),
        );

        let editing_cell = (uidata.editing && uidata.cmd_mode == Some(CMDMode::EditCell))
            .then_some((uidata.selected_row, uidata.selected_column));

        let rows = uidata
            .index
            .data
            .iter()
            .enumerate()
            .map(|(r, id)| {
                let mut cells = vec![Cell::from(id.clone()).style(self.header_style)];
                for (c, column) in uidata.table.iter().enumerate() {
                    let cell = match editing_cell {
                        Some((Some(er), Some(ec))) if er == r && ec == c => {
                            Cell::from(Span::from(uidata.cmdinput.input.clone()).underlined())
                        }
                        _ => {
                            let text = column.data.get(r).cloned().unwrap_or_default();
                            let style = value_style(&column.key, &text);
                            Cell::from(text).style(style)
                        }
                    };
                    cells.push(cell);
                }
                let row = Row::new(cells);
                if uidata.padding.get(r).copied().unwrap_or(false) {
                    row.style(self.padding_style)
                } else {
                    row
                }
            })
            .collect::<Vec<Row>>();

        let mut widths = vec![Constraint::Length(uidata.index.width as u16)];
        widths.extend(
            uidata
                .table
                .iter()
                .map(|c| Constraint::Length(c.width as u16)),
        );

        let column_selected = uidata.table.iter().any(|c| c.selected);
        let mut table = Table::new(rows, widths)
            .column_spacing(1)
            .header(Row::new(header).height(TABLE_HEADER_HEIGHT as u16))
            .block(block)
            .cell_highlight_style(self.selected_style);
        if uidata.row_selected {
            table = table.row_highlight_style(self.selected_style);
        }
        if column_selected {
            table = table.column_highlight_style(self.selected_style);
        }

        // Index column comes first
        let mut state = TableState::default()
            .with_selected(uidata.selected_row)
            .with_selected_column(uidata.selected_column.map(|c| c + 1));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_tabs(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = uidata
            .tabs
            .iter()
            .map(|t| Line::from(format!(" {t} ")))
            .collect();
        let tabs = Tabs::new(titles)
            .select(uidata.active_tab)
            .highlight_style(self.selected_style.bold())
            .divider("|");
        frame.render_widget(tabs, area);
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::Search) => "/",
                Some(CMDMode::EditCell) => "edit: ",
                None => "",
            };
            let line = Line::from(vec![prompt.bold(), uidata.cmdinput.input.clone().into()]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + uidata.cmdinput.curser_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
            return;
        }

        let [message_area, info_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(24)]).areas(area);

        if uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TIMEOUT
            && !uidata.status_message.is_empty()
        {
            let style = match uidata.status_severity {
                Severity::Info => Style::new(),
                Severity::Success => Style::new().fg(Color::Green),
                Severity::Warning => Style::new().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            };
            let message = Span::styled(uidata.status_message.clone(), style);
            frame.render_widget(Paragraph::new(Line::from(message)), message_area);
        } else {
            frame.render_widget(Paragraph::new("? help  q quit".dim()), message_area);
        }

        let info = format!("{} rows ", uidata.nrows);
        frame.render_widget(Paragraph::new(Line::from(info).right_aligned()), info_area);
    }

    fn draw_column_menu(&self, uidata: &UIData, frame: &mut Frame) {
        let area = popup_area(frame.area(), 40, 60);
        let items: Vec<ListItem> = uidata
            .column_menu
            .iter()
            .map(|(label, visible)| {
                let mark = if *visible { "[x]" } else { "[ ]" };
                ListItem::new(format!("{mark} {label}"))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::bordered()
                    .title(Line::from(" Columns ".bold()).centered())
                    .title_bottom(Line::from(" Enter toggle, Esc close ").centered()),
            )
            .highlight_style(self.selected_style);
        let mut state = ListState::default().with_selected(Some(uidata.menu_cursor));
        frame.render_widget(Clear, area);
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, 80);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .border_set(border::THICK);
        let text = Text::from(uidata.popup_message.as_str());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
            area,
        );
    }
}

fn hex_color(hex: &str) -> Option<Color> {
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().map(Color::from_u32)
}

/// Reads the `bg-[#RRGGBB]` and `text-[#RRGGBB]` entries of a column style class.
fn class_style(class: &str) -> Style {
    let mut style = Style::new();
    for token in class.split_whitespace() {
        if let Some(hex) = token.strip_prefix("bg-[#").and_then(|t| t.strip_suffix(']'))
            && let Some(color) = hex_color(hex)
        {
            style = style.bg(color);
        } else if let Some(hex) = token.strip_prefix("text-[#").and_then(|t| t.strip_suffix(']'))
            && let Some(color) = hex_color(hex)
        {
            style = style.fg(color);
        }
    }
    style
}

// Status badges and priority colours, matched on the exact cell text
fn value_style(key: &str, text: &str) -> Style {
    let rgb = |bg: u32, fg: u32| Style::new().bg(Color::from_u32(bg)).fg(Color::from_u32(fg));
    match (key, text) {
        (STATUS_KEY, "In-process") => rgb(0xFEF9C3, 0x854D0E),
        (STATUS_KEY, "Need to start") => rgb(0xE2E8F0, 0x475569),
        (STATUS_KEY, "Complete") => rgb(0xDCFCE7, 0x15803D),
        (STATUS_KEY, "Blocked") => rgb(0xFEE2E2, 0xB91C1C),
        (PRIORITY_KEY, "High") => Style::new().fg(Color::from_u32(0xEF4D44)),
        (PRIORITY_KEY, "Medium") => Style::new().fg(Color::from_u32(0xC29210)),
        (PRIORITY_KEY, "Low") => Style::new().fg(Color::from_u32(0x1A8CFF)),
        _ => Style::new(),
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Exporter;
    use crate::seed;
    use crate::sheet::{ExportSnapshot, Sheet};
    use ratatui::{Terminal, backend::TestBackend};

    struct NoExport;

    impl Exporter for NoExport {
        fn export(&self, _snapshot: ExportSnapshot) {}
    }

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        let mut ui = TableUI::new(&SheetConfig::default());
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn model() -> Model {
        let sheet = Sheet::new(seed::initial_columns(), seed::initial_rows(), 25);
        Model::init(&SheetConfig::default(), "tasks", sheet, Box::new(NoExport), 120, 20)
    }

    #[test]
    fn renders_header_rows_and_tabs() {
        let screen = render(&model());
        assert!(screen.contains("Job Request"));
        assert!(screen.contains("Aisha Patel"));
        assert!(screen.contains("Need to start"));
        assert!(screen.contains(" All "));
        assert!(screen.contains("25 rows"));
    }

    #[test]
    fn help_popup_is_drawn_on_top() {
        let mut m = model();
        m.update(Some(crate::domain::Message::Help)).unwrap();
        let screen = render(&m);
        assert!(screen.contains(" Help "));
        assert!(screen.contains("Navigation"));
    }

    #[test]
    fn style_class_colours_are_parsed() {
        let style = class_style("bg-[#EEEEEE] text-[#757575] rounded");
        assert_eq!(style.bg, Some(Color::Rgb(0xEE, 0xEE, 0xEE)));
        assert_eq!(style.fg, Some(Color::Rgb(0x75, 0x75, 0x75)));
        assert_eq!(class_style("bg-[#EEE]"), Style::new());
        assert_eq!(class_style(""), Style::new());
    }

    #[test]
    fn status_and_priority_cells_are_coloured() {
        assert_eq!(
            value_style("status", "Blocked").fg,
            Some(Color::Rgb(0xB9, 0x1C, 0x1C))
        );
        assert_eq!(
            value_style("priority", "High").fg,
            Some(Color::Rgb(0xEF, 0x4D, 0x44))
        );
        assert_eq!(value_style("submitter", "High"), Style::new());
        assert_eq!(value_style("status", ""), Style::new());

        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        let mut ui = TableUI::new(&SheetConfig::default());
        let m = model();
        terminal.draw(|f| ui.draw(&m, f)).unwrap();
        let buffer = terminal.backend().buffer();
        let blocked = (0..buffer.area.height)
            .flat_map(|y| (0..buffer.area.width).map(move |x| (x, y)))
            .any(|(x, y)| {
                buffer[(x, y)].symbol() == "B" && buffer[(x, y)].fg == Color::Rgb(0xB9, 0x1C, 0x1C)
            });
        assert!(blocked);
    }

    #[test]
    fn chrome_leaves_room_for_rows() {
        assert_eq!(TABLE_CHROME_HEIGHT, 6);
        let m = model();
        assert_eq!(m.get_uidata().index.data.len(), 20 - TABLE_CHROME_HEIGHT);
    }
}
