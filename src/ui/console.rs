use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use courtops::agent::{AgentMode, RunState, RunView};

use crate::app::App;

/// Render the agent console
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Length(6), // Goal editor
            Constraint::Min(8),    // Result panel
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    render_status_bar(frame, app, chunks[0]);
    render_goal_panel(frame, app, chunks[1]);
    render_result_panel(frame, app, chunks[2]);
    render_help_bar(frame, app, chunks[3]);

    if app.show_help {
        render_help_popup(frame);
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode_color = match app.console.mode {
        AgentMode::Demo => Color::Green,
        AgentMode::Interactive => Color::Magenta,
    };
    let (dry_run_text, dry_run_color) = if app.console.dry_run {
        ("on", Color::Yellow)
    } else {
        ("off", Color::Red)
    };
    let (session_text, session_color) = if app.signed_in {
        ("signed in", Color::Green)
    } else {
        ("not signed in", Color::Red)
    };

    let mut spans = vec![
        Span::styled("CourtOps Agent ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("| Mode: "),
        Span::styled(app.console.mode.as_str(), Style::default().fg(mode_color)),
        Span::raw(" | Dry run: "),
        Span::styled(dry_run_text, Style::default().fg(dry_run_color)),
        Span::raw(" | "),
        Span::styled(session_text, Style::default().fg(session_color)),
    ];

    if let Some(status) = &app.agent_status {
        let mut backend = status.status.clone();
        if let Some(model) = status.model.as_deref() {
            backend = format!("{} ({})", backend, model);
        }
        spans.push(Span::raw(" | Backend: "));
        spans.push(Span::styled(backend, Style::default().fg(Color::White)));
    }

    let content = if let Some(ref msg) = app.status_message {
        vec![
            Line::from(spans),
            Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Cyan))),
        ]
    } else {
        vec![Line::from(spans)]
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    frame.render_widget(Paragraph::new(content).block(block), area);
}

fn render_goal_panel(frame: &mut Frame, app: &App, area: Rect) {
    let (border_color, title) = if app.editing {
        (Color::Cyan, " Goal [EDITING - Esc to stop] ")
    } else if app.is_running() {
        (Color::DarkGray, " Goal [locked while running] ")
    } else {
        (Color::Blue, " Goal - Press 'e' to edit ")
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let paragraph = if app.console.goal.is_empty() && !app.editing {
        Paragraph::new("(blank goal runs the daily operations demo)")
            .style(Style::default().fg(Color::DarkGray))
    } else {
        let mut text = app.console.goal.clone();
        if app.editing {
            text.push('_');
        }
        Paragraph::new(text)
    };

    frame.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}

fn render_result_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Result ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = match app.console.state() {
        RunState::Idle => Paragraph::new(
            "No run yet.\n\nPress 'p' to run the preset or Enter for a custom run.",
        )
        .style(Style::default().fg(Color::DarkGray)),
        RunState::Running => Paragraph::new(format!("{} Running...", app.spinner_frame()))
            .style(Style::default().fg(Color::Yellow)),
        RunState::Failed(message) => {
            Paragraph::new(message.as_str()).style(Style::default().fg(Color::Red))
        }
        RunState::Settled(_) => match app.result_view() {
            Some(view) => Paragraph::new(result_lines(&view)).scroll((app.scroll, 0)),
            None => Paragraph::new(""),
        },
    };

    frame.render_widget(paragraph.block(block).wrap(Wrap { trim: false }), area);
}

/// Styled rendering of a run result, sections in display order
fn result_lines(view: &RunView) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    if let Some(notice) = view.dry_run_notice {
        lines.push(Line::from(Span::styled(
            notice,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    }
    lines.extend(view.summary.lines().map(|l| Line::from(l.to_string())));

    if !view.actions.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Actions taken", bold)));
        for action in &view.actions {
            lines.push(Line::from(vec![
                Span::raw("- "),
                Span::styled(action.tool.clone(), Style::default().fg(Color::Cyan)),
            ]));
            if let Some(args) = &action.args {
                lines.push(Line::from(Span::styled(
                    format!("    {}", args),
                    Style::default().fg(Color::DarkGray),
                )));
            }
            for line in action.result.lines() {
                lines.push(Line::from(format!("    {}", line)));
            }
        }
    }

    if !view.artifacts.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Artifacts", bold)));
        for artifact in &view.artifacts {
            let mut spans = vec![Span::raw(format!("- {}", artifact.path))];
            if let Some(link) = &artifact.link {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(
                    link.clone(),
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                ));
            }
            lines.push(Line::from(spans));
        }
    }
    lines
}

fn render_help_bar(frame: &mut Frame, app: &App, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().add_modifier(Modifier::BOLD));

    let help_text = if app.editing {
        vec![
            Span::styled(
                "Esc",
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .fg(Color::Cyan),
            ),
            Span::raw(":Stop editing "),
            Span::styled("Type", Style::default().fg(Color::DarkGray)),
            Span::raw(" to edit the goal"),
        ]
    } else if app.is_running() {
        vec![key("q"), Span::raw(":Quit "), Span::raw("(run in progress)")]
    } else {
        vec![
            key("p"),
            Span::raw(":Preset "),
            key("Enter"),
            Span::raw(":Run goal "),
            key("e"),
            Span::raw(":Edit "),
            key("m"),
            Span::raw(":Mode "),
            key("d"),
            Span::raw(":Dry run "),
            key("j/k"),
            Span::raw(":Scroll "),
            key("q"),
            Span::raw(":Quit "),
            key("?"),
            Span::raw(":Help"),
        ]
    };

    let paragraph =
        Paragraph::new(Line::from(help_text)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_help_popup(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());

    let help_content = vec![
        Line::from(Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  q, Esc      Quit"),
        Line::from("  p           Run the configured preset"),
        Line::from("  Enter       Run the goal as a custom run"),
        Line::from("  e, i        Edit the goal (Esc to stop)"),
        Line::from("  m           Toggle demo / interactive mode"),
        Line::from("  d           Toggle dry run"),
        Line::from("  j, k        Scroll the result"),
        Line::from("  s           Refresh backend status"),
        Line::from("  ?           Toggle this help"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(help_content).block(block), area);
}

/// Create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtops::agent::{AgentRunResponse, RUN_FAILED_MESSAGE};
    use courtops::config::Config;
    use courtops::ClientError;
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn app() -> App {
        App::new(&Config::default(), "http://localhost:8000/reports", true)
    }

    #[test]
    fn test_idle_screen() {
        let screen = draw(&app());
        assert!(screen.contains("CourtOps Agent"));
        assert!(screen.contains("Mode: demo"));
        assert!(screen.contains("No run yet."));
    }

    #[test]
    fn test_settled_screen_shows_sections() {
        let mut app = app();
        let pending = app.submit_preset().unwrap();
        app.finish_run(
            pending.seq,
            Ok(AgentRunResponse {
                summary: "Refreshed cache.".to_string(),
                actions_taken: serde_json::from_value(serde_json::json!([
                    {"tool": "refresh_case_cache", "args": {}, "result": {"rows": 12}}
                ]))
                .unwrap(),
                artifact_paths: vec!["reports/2024-05/ops.pdf".to_string()],
                dry_run: true,
            }),
        );

        let screen = draw(&app);
        assert!(screen.contains("Dry run: no changes were made."));
        assert!(screen.contains("Refreshed cache."));
        assert!(screen.contains("refresh_case_cache"));
        assert!(screen.contains("\"rows\": 12"));
        assert!(screen.contains("http://localhost:8000/reports/2024-05/pdf"));
    }

    #[test]
    fn test_failed_screen() {
        let mut app = app();
        let pending = app.submit_custom().unwrap();
        app.finish_run(pending.seq, Err(ClientError::Api { status: 401 }));
        assert!(draw(&app).contains(RUN_FAILED_MESSAGE));
    }

    #[test]
    fn test_running_screen_locks_goal() {
        let mut app = app();
        app.submit_custom();
        let screen = draw(&app);
        assert!(screen.contains("Running..."));
        assert!(screen.contains("locked while running"));
    }
}
