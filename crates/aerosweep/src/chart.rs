//! Terminal line charts for selected channels.
//!
//! [`ChartSink`] collects series channel-major into panels; [`ChartViewer`]
//! draws them with one chart per channel, overlaying every label.

use aerosweep_core::{RenderSink, SinkError};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    DefaultTerminal, Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
};

/// Upper bound on plotted points per series; longer series are strided
const MAX_POINTS: usize = 4000;

/// Charts shown at once
const PANELS_PER_PAGE: usize = 2;

const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::LightRed,
    Color::LightBlue,
];

/// One channel's overlaid series
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub channel: String,
    pub unit: String,
    pub series: Vec<(String, Vec<(f64, f64)>)>,
}

impl Panel {
    /// Padded x and y bounds covering every finite point
    fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let mut x = [f64::INFINITY, f64::NEG_INFINITY];
        let mut y = [f64::INFINITY, f64::NEG_INFINITY];
        for (_, points) in &self.series {
            for &(px, py) in points.iter().filter(|(a, b)| a.is_finite() && b.is_finite()) {
                x = [x[0].min(px), x[1].max(px)];
                y = [y[0].min(py), y[1].max(py)];
            }
        }
        if !x[0].is_finite() {
            return ([0.0, 1.0], [0.0, 1.0]);
        }
        let pad = (y[1] - y[0]).abs().max(1e-9) * 0.05;
        let x = if x[1] > x[0] { x } else { [x[0], x[0] + 1.0] };
        (x, [y[0] - pad, y[1] + pad])
    }
}

/// Render sink that collects panels for the terminal viewer
#[derive(Debug, Default)]
pub struct ChartSink {
    panels: Vec<Panel>,
}

impl ChartSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn into_viewer(self, title: impl Into<String>) -> ChartViewer {
        ChartViewer::new(title, self.panels)
    }
}

impl RenderSink for ChartSink {
    fn series(
        &mut self,
        label: &str,
        channel: &str,
        unit: &str,
        time: &[f64],
        samples: &[f64],
    ) -> Result<(), SinkError> {
        let stride = time.len().div_ceil(MAX_POINTS).max(1);
        let points: Vec<(f64, f64)> = time
            .iter()
            .zip(samples)
            .step_by(stride)
            .map(|(&t, &v)| (t, v))
            .collect();

        match self.panels.iter_mut().find(|p| p.channel == channel) {
            Some(panel) => panel.series.push((label.to_string(), points)),
            None => self.panels.push(Panel {
                channel: channel.to_string(),
                unit: unit.to_string(),
                series: vec![(label.to_string(), points)],
            }),
        }
        Ok(())
    }
}

/// Full-screen viewer paging through channel panels
#[derive(Debug)]
pub struct ChartViewer {
    title: String,
    panels: Vec<Panel>,
    page: usize,
    exit: bool,
}

impl ChartViewer {
    pub fn new(title: impl Into<String>, panels: Vec<Panel>) -> Self {
        Self {
            title: title.into(),
            panels,
            page: 0,
            exit: false,
        }
    }

    fn page_count(&self) -> usize {
        self.panels.len().div_ceil(PANELS_PER_PAGE).max(1)
    }

    /// Runs until the user quits with `q` or `Esc`
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> color_eyre::Result<()> {
        while !self.exit {
            terminal.draw(|frame| self.draw(frame))?;
            if let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.exit = true,
            KeyCode::Right | KeyCode::PageDown | KeyCode::Char('n') => {
                self.page = (self.page + 1).min(self.page_count() - 1);
            }
            KeyCode::Left | KeyCode::PageUp | KeyCode::Char('p') => {
                self.page = self.page.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let visible: Vec<&Panel> = self
            .panels
            .iter()
            .skip(self.page * PANELS_PER_PAGE)
            .take(PANELS_PER_PAGE)
            .collect();

        if visible.is_empty() {
            let empty = Paragraph::new("  No series selected.")
                .block(Block::default().borders(Borders::ALL).title(self.title.as_str()));
            frame.render_widget(empty, chunks[0]);
        } else {
            let areas = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Ratio(1, visible.len() as u32); visible.len()])
                .split(chunks[0]);
            for (panel, area) in visible.into_iter().zip(areas.iter()) {
                self.render_panel(frame, *area, panel);
            }
        }

        let status = Line::from(vec![
            Span::raw(format!(" {} ", self.title)).bold(),
            Span::raw(format!(" page {}/{} ", self.page + 1, self.page_count())),
            Span::raw(" ←/→ page  q quit").dark_gray(),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[1]);
    }

    fn render_panel(&self, frame: &mut Frame, area: Rect, panel: &Panel) {
        let ([x_min, x_max], [y_min, y_max]) = panel.bounds();

        let datasets: Vec<Dataset> = panel
            .series
            .iter()
            .enumerate()
            .map(|(i, (label, points))| {
                Dataset::default()
                    .name(label.clone())
                    .marker(symbols::Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(PALETTE[i % PALETTE.len()]))
                    .data(points)
            })
            .collect();

        let x_axis = Axis::default()
            .title("Time".dark_gray())
            .bounds([x_min, x_max])
            .labels(axis_labels(x_min, x_max));
        let y_title = if panel.unit.is_empty() {
            panel.channel.clone()
        } else {
            format!("{} ({})", panel.channel, panel.unit)
        };
        let y_axis = Axis::default()
            .title(y_title.clone().dark_gray())
            .bounds([y_min, y_max])
            .labels(axis_labels(y_min, y_max));

        let chart = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title(y_title))
            .x_axis(x_axis)
            .y_axis(y_axis);
        frame.render_widget(chart, area);
    }
}

fn axis_labels(min: f64, max: f64) -> Vec<Span<'static>> {
    [min, (min + max) / 2.0, max]
        .into_iter()
        .map(|v| Span::raw(format_tick(v)))
        .collect()
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-2..1e5).contains(&magnitude) {
        format!("{value:.2e}")
    } else if magnitude >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
