use crate::app::{App, AppEvent, InputMode, View};
use crate::chat::ChatRole;
use crate::columns::Column;
use crate::modal::DetailModal;
use crate::notification::NotificationKind;
use crate::pagination::PageItem;
use crate::task_list::{LoadState, TaskRow};
use crate::theme::ThemeColors;
use crossterm::event::{self, Event};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;

const TOAST_WIDTH: u16 = 48;
const TOAST_HEIGHT: u16 = 4;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Draw, wait up to 100 ms for a key, apply finished requests, run timers.
pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                app.handle_key(key);
            }
        }
        while let Ok(event) = events.try_recv() {
            app.apply(event);
        }
        app.tick(Instant::now());

        if app.should_quit() {
            return Ok(());
        }
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let colors = app.theme.colors();
    f.render_widget(Block::default().style(colors.base()), f.area());

    match app.view {
        View::Tasks => draw_tasks(f, app, &colors),
        View::Chat => draw_chat(f, app, &colors),
    }

    if let InputMode::Columns(cursor) = app.mode {
        draw_column_panel(f, app, &colors, cursor);
    }
    if app.modal.is_open() {
        draw_modal(f, app, &colors);
    }
    draw_notification(f, app, &colors);
}

fn draw_tasks(f: &mut Frame, app: &App, colors: &ThemeColors) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_filter_bar(f, app, colors, chunks[0]);

    match app.tasks.load_state() {
        LoadState::Idle | LoadState::Loading => {
            draw_message(f, colors, chunks[1], "Loading tasks...", colors.muted);
        }
        LoadState::Failed(message) => {
            let text = format!("Failed to load tasks: {message}\nPress r to retry.");
            draw_message(f, colors, chunks[1], &text, colors.error);
        }
        LoadState::Loaded if app.tasks.is_empty_result() => {
            draw_message(
                f,
                colors,
                chunks[1],
                "No tasks match the current filters.\nPress x to reset filters.",
                colors.muted,
            );
        }
        LoadState::Loaded => draw_table(f, app, colors, chunks[1]),
    }

    draw_pager(f, app, colors, chunks[2]);
    let help = "j/k move  ←/→ page  enter view  i integrate  / search  s/p/a filter  1-6 sort  \
                c columns  z page size  r reload  R refresh  x reset  t theme  tab chat  q quit";
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(colors.muted)),
        chunks[3],
    );
}

fn draw_filter_bar(f: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let filters = app.tasks.filters();
    let project = filters
        .project
        .as_deref()
        .map(|id| app.tasks.project_label(id))
        .unwrap_or_else(|| "All".to_owned());
    let assigner = filters.assigner.clone().unwrap_or_else(|| "All".to_owned());
    let searching = app.mode == InputMode::Search;

    let label = Style::default().fg(colors.muted);
    let value = Style::default().fg(colors.text).add_modifier(Modifier::BOLD);
    let mut spans = vec![
        Span::styled("Status ", label),
        Span::styled(filters.status.label(), value),
        Span::raw("  "),
        Span::styled("Project ", label),
        Span::styled(project, value),
        Span::raw("  "),
        Span::styled("Assigner ", label),
        Span::styled(assigner, value),
        Span::raw("  "),
        Span::styled("Search ", label),
        Span::styled(
            app.search_input.clone(),
            if searching {
                value.fg(colors.primary)
            } else {
                value
            },
        ),
    ];
    if searching {
        spans.push(Span::styled("▏", Style::default().fg(colors.primary)));
    }

    let block = Block::default()
        .title(format!(" Tasks ({}) ", app.theme))
        .borders(Borders::ALL)
        .border_style(colors.border(searching));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_message(f: &mut Frame, colors: &ThemeColors, area: Rect, text: &str, color: ratatui::style::Color) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(colors.border(false));
    f.render_widget(
        Paragraph::new(text.to_owned())
            .alignment(Alignment::Center)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}

fn column_width(column: Column) -> Constraint {
    match column {
        Column::Id => Constraint::Length(7),
        Column::Name => Constraint::Min(20),
        Column::Status => Constraint::Length(16),
        Column::Project => Constraint::Length(18),
        Column::Dates => Constraint::Length(29),
        Column::Assignee => Constraint::Length(20),
        Column::Actions => Constraint::Length(18),
    }
}

fn header_cell(app: &App, column: Column, colors: &ThemeColors) -> Cell<'static> {
    let sort = app.tasks.sort();
    let mut title = column.title().to_owned();
    if sort.column == column {
        title.push(' ');
        title.push_str(sort.direction.arrow());
    }
    Cell::from(title).style(colors.header())
}

fn row_cell(app: &App, row: &TaskRow, column: Column, colors: &ThemeColors) -> Cell<'static> {
    match column {
        Column::Id => Cell::from(format!("#{}", row.id)),
        Column::Name => {
            let mut spans = vec![Span::raw(row.title.clone())];
            if row.has_description {
                spans.push(Span::styled(" ≡", Style::default().fg(colors.muted)));
            }
            Cell::from(Line::from(spans))
        }
        Column::Status => Cell::from(Line::from(Span::styled(
            format!(" {} ", row.status_label),
            colors.status_badge(&row.status_class),
        ))),
        Column::Project => Cell::from(Line::from(vec![
            Span::styled("● ", Style::default().fg(row.project_color)),
            Span::raw(row.project_label.clone()),
        ])),
        Column::Dates => Cell::from(format!("{} → {}", row.start, row.end)),
        Column::Assignee => Cell::from(Line::from(vec![
            Span::styled(
                format!(" {} ", row.assigner_initial),
                Style::default().fg(colors.badge_text).bg(row.assigner_color),
            ),
            Span::raw(format!(" {}", row.assigner)),
        ])),
        Column::Actions => {
            let integrate = if app.is_integrating(row.id) {
                Span::styled("linking…", Style::default().fg(colors.warning))
            } else if row.can_integrate {
                Span::styled("integrate", Style::default().fg(colors.primary))
            } else {
                Span::styled(
                    "integrate",
                    Style::default().fg(colors.muted).add_modifier(Modifier::CROSSED_OUT),
                )
            };
            Cell::from(Line::from(vec![Span::raw("view "), integrate]))
        }
    }
}

fn draw_table(f: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let columns = app.columns.visible_columns();
    let header = Row::new(
        columns
            .iter()
            .map(|column| header_cell(app, *column, colors))
            .collect::<Vec<_>>(),
    )
    .height(1)
    .bottom_margin(1);

    let rows: Vec<Row> = app
        .tasks
        .page_rows()
        .iter()
        .map(|row| {
            Row::new(
                columns
                    .iter()
                    .map(|column| row_cell(app, row, *column, colors))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    let widths: Vec<Constraint> = columns.iter().map(|column| column_width(*column)).collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(colors.border(app.mode == InputMode::Normal)),
        )
        .row_highlight_style(colors.selected())
        .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(Some(app.tasks.selected_index()));
    f.render_stateful_widget(table, area, &mut state);
}

fn draw_pager(f: &mut Frame, app: &App, colors: &ThemeColors, area: Rect) {
    let tasks = &app.tasks;
    let mut spans = vec![
        Span::styled(
            format!("Shown {} of {}", tasks.shown_count(), tasks.total_count()),
            Style::default().fg(colors.text),
        ),
        Span::styled(
            format!(
                "  │  Page {} of {}  ",
                tasks.pagination().page(),
                tasks.total_pages()
            ),
            Style::default().fg(colors.muted),
        ),
    ];
    for item in tasks.page_window() {
        match item {
            PageItem::Page(page) if page == tasks.pagination().page() => spans.push(Span::styled(
                format!("[{page}] "),
                Style::default().fg(colors.primary).add_modifier(Modifier::BOLD),
            )),
            PageItem::Page(page) => spans.push(Span::raw(format!("{page} "))),
            PageItem::Ellipsis => spans.push(Span::styled("… ", Style::default().fg(colors.muted))),
        }
    }
    spans.push(Span::styled(
        format!(" │  {} per page", tasks.pagination().page_size()),
        Style::default().fg(colors.muted),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_column_panel(f: &mut Frame, app: &App, colors: &ThemeColors, cursor: usize) {
    let height = Column::ALL.len() as u16 + 4;
    let area = fixed_centered_rect(30, height, f.area());
    let lines: Vec<Line> = Column::ALL
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let mark = if app.columns.is_visible(*column) { "[x]" } else { "[ ]" };
            let style = if index == cursor {
                colors.selected()
            } else {
                Style::default().fg(colors.text)
            };
            Line::from(Span::styled(format!("{mark} {}", column.title()), style))
        })
        .collect();
    let block = Block::default()
        .title(" Columns (space toggles) ")
        .borders(Borders::ALL)
        .border_style(colors.border(true))
        .style(Style::default().bg(colors.surface));
    f.render_widget(Clear, area);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn field(label: &'static str, value: String, colors: &ThemeColors) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<11}"), Style::default().fg(colors.muted)),
        Span::styled(value, Style::default().fg(colors.text)),
    ])
}

fn draw_modal(f: &mut Frame, app: &App, colors: &ThemeColors) {
    let area = centered_rect(70, 70, f.area());
    let (title, lines, scroll): (String, Vec<Line>, u16) = match &app.modal {
        DetailModal::Closed => return,
        DetailModal::Loading { task_id, .. } => (
            format!(" Task #{task_id} "),
            vec![
                Line::from(Span::styled("Loading task details...", Style::default().fg(colors.muted))),
                Line::from(""),
                Line::from(Span::styled("░░░░░░░░░░░░░░░░░░░░", Style::default().fg(colors.border))),
                Line::from(Span::styled("░░░░░░░░░░░░", Style::default().fg(colors.border))),
                Line::from(Span::styled("░░░░░░░░░░░░░░░░", Style::default().fg(colors.border))),
            ],
            0,
        ),
        DetailModal::Errored { task_id, message } => (
            format!(" Task #{task_id} "),
            vec![
                Line::from(Span::styled(
                    "Could not load task details.",
                    Style::default().fg(colors.error).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(message.clone(), Style::default().fg(colors.error))),
                Line::from(""),
                Line::from(Span::styled(
                    "Close with Esc and open the task again to retry.",
                    Style::default().fg(colors.muted),
                )),
            ],
            0,
        ),
        DetailModal::Populated {
            detail,
            integrating,
            scroll,
        } => {
            let action = if detail.completed {
                Span::styled(
                    "Completed tasks cannot be integrated.",
                    Style::default().fg(colors.muted),
                )
            } else if *integrating {
                Span::styled("Integrating...", Style::default().fg(colors.warning))
            } else {
                Span::styled("[i] Integrate with assistant", Style::default().fg(colors.primary))
            };
            let mut lines = vec![
                Line::from(Span::styled(
                    detail.title.clone(),
                    Style::default().fg(colors.text).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                field("ID", format!("#{}", detail.id), colors),
                Line::from(vec![
                    Span::styled(format!("{:<11}", "Status"), Style::default().fg(colors.muted)),
                    Span::styled(
                        format!(" {} ", detail.status),
                        colors.status_badge(&detail.status_class),
                    ),
                ]),
                field("Project", detail.project.clone(), colors),
                field("Assigner", detail.assigner.clone(), colors),
                field("Assignees", detail.assignees.clone(), colors),
                field("Priority", detail.priority.clone(), colors),
                field("Start", detail.start.clone(), colors),
                field("End", detail.end.clone(), colors),
                Line::from(""),
                Line::from(action),
                Line::from(""),
                Line::from(Span::styled("Description", colors.header())),
            ];
            lines.extend(
                detail
                    .description
                    .lines()
                    .map(|line| Line::from(line.to_owned())),
            );
            (format!(" Task #{} ", detail.id), lines, *scroll)
        }
    };

    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(" Esc close ").right_aligned())
        .borders(Borders::ALL)
        .border_style(colors.border(true))
        .style(Style::default().bg(colors.surface).fg(colors.text));
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        area,
    );
}

fn draw_chat(f: &mut Frame, app: &App, colors: &ThemeColors) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Min(3), Constraint::Length(3), Constraint::Length(1)])
        .split(f.area());

    // Rows are wrapped here rather than by the paragraph so the scroll offset
    // counts the rows actually drawn.
    let inner_width = chunks[0].width.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = Vec::new();
    if app.chat.messages().is_empty() {
        lines.push(Line::from(Span::styled(
            "Ask the assistant anything about your tasks.",
            Style::default().fg(colors.muted),
        )));
    }
    for message in app.chat.messages() {
        let color = match message.role {
            ChatRole::User => colors.primary,
            ChatRole::Assistant => colors.success,
            ChatRole::System => colors.muted,
        };
        lines.push(Line::from(Span::styled(
            message.role.label(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.extend(wrap_words(&message.content, inner_width).into_iter().map(Line::from));
        lines.push(Line::from(""));
    }
    if app.chat.is_waiting() {
        lines.push(Line::from(Span::styled(
            "Assistant is typing...",
            Style::default().fg(colors.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    let title = match app.chat.conversation_id() {
        Some(id) => format!(" Conversation {id} "),
        None => " New conversation ".to_owned(),
    };
    let height = chunks[0].height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(height) as u16;
    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(colors.border(false)),
            )
            .scroll((scroll, 0)),
        chunks[0],
    );

    f.render_widget(
        Paragraph::new(format!("{}▏", app.chat.input)).block(
            Block::default()
                .title(" Message ")
                .borders(Borders::ALL)
                .border_style(colors.border(true)),
        ),
        chunks[1],
    );
    f.render_widget(
        Paragraph::new("enter send  ctrl+n new chat  tab/esc back to tasks  ctrl+c quit")
            .style(Style::default().fg(colors.muted)),
        chunks[2],
    );
}

fn display_width(text: &str) -> usize {
    Span::raw(text).width()
}

/// Greedy word wrap to `width` columns. Words wider than a row are split; runs of
/// whitespace collapse to one space.
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for source in text.lines() {
        let mut row = String::new();
        let mut row_width = 0;
        for word in source.split_whitespace() {
            if row_width > 0 && row_width + 1 + display_width(word) > width {
                rows.push(std::mem::take(&mut row));
                row_width = 0;
            }
            if row_width > 0 {
                row.push(' ');
                row_width += 1;
            }
            for ch in word.chars() {
                let ch_width = display_width(ch.encode_utf8(&mut [0; 4]));
                if row_width > 0 && row_width + ch_width > width {
                    rows.push(std::mem::take(&mut row));
                    row_width = 0;
                }
                row.push(ch);
                row_width += ch_width;
            }
        }
        rows.push(row);
    }
    rows
}

fn draw_notification(f: &mut Frame, app: &App, colors: &ThemeColors) {
    let Some(notification) = app.notifier.current() else {
        return;
    };
    let screen = f.area();
    let width = TOAST_WIDTH.min(screen.width);
    let height = TOAST_HEIGHT.min(screen.height);
    let area = Rect {
        x: screen.x + screen.width - width,
        y: screen.y + screen.height.saturating_sub(height + 2),
        width,
        height,
    };
    let color = match notification.kind {
        NotificationKind::Info => colors.primary,
        NotificationKind::Success => colors.success,
        NotificationKind::Error => colors.error,
    };
    let block = Block::default()
        .title(format!(" {} {} ", notification.kind.icon(), notification.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(colors.surface).fg(colors.text));
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(notification.message.clone())
            .wrap(Wrap { trim: true })
            .block(block),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn fixed_centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
