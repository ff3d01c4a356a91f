use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use listing_insights::reports::{self, AvailabilityPoint, GroupDimension, PriceQuery};
use listing_insights::{Dataset, InsightsConfig, ValueCategory};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Sparkline, Table, TableState},
    Frame, Terminal,
};
use std::io;

const MIN_BEDROOMS: i32 = 1;
const MAX_BEDROOMS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Market,
    Reviews,
    Advisor,
    City,
    Categories,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Market,
        Page::Reviews,
        Page::Advisor,
        Page::City,
        Page::Categories,
    ];

    pub fn next(&self) -> Self {
        match self {
            Page::Market => Page::Reviews,
            Page::Reviews => Page::Advisor,
            Page::Advisor => Page::City,
            Page::City => Page::Categories,
            Page::Categories => Page::Market,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Market => Page::Categories,
            Page::Reviews => Page::Market,
            Page::Advisor => Page::Reviews,
            Page::City => Page::Advisor,
            Page::Categories => Page::City,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Market => "Market",
            Page::Reviews => "Reviews",
            Page::Advisor => "Advisor",
            Page::City => "City",
            Page::Categories => "Categories",
        }
    }
}

pub struct App {
    pub data: Dataset,
    pub current_page: Page,
    pub recent_since: chrono::NaiveDate,
    pub sample_size: usize,

    // Reviews page
    pub sampled_ids: Vec<i64>,
    pub selected_sample: usize,
    pub sample_message: Option<String>,

    // Advisor page
    pub neighbourhoods: Vec<String>,
    pub room_types: Vec<String>,
    pub selected_neighbourhood: usize,
    pub selected_room_type: usize,
    pub bedrooms: i32,

    // City page
    pub dimension: GroupDimension,

    // Categories page
    pub categories_state: TableState,
}

impl App {
    pub fn new(data: Dataset, config: &InsightsConfig) -> Self {
        let neighbourhoods = reports::neighbourhood_options(&data.listings);
        let room_types = reports::room_type_options(&data.listings);

        let mut categories_state = TableState::default();
        if !data.listings.is_empty() {
            categories_state.select(Some(0));
        }

        let mut app = Self {
            data,
            current_page: Page::Market,
            recent_since: config.recent_since,
            sample_size: config.sample_size,
            sampled_ids: Vec::new(),
            selected_sample: 0,
            sample_message: None,
            neighbourhoods,
            room_types,
            selected_neighbourhood: 0,
            selected_room_type: 0,
            bedrooms: MIN_BEDROOMS,
            dimension: GroupDimension::RoomType,
            categories_state,
        };
        app.resample();
        app
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// Draw a fresh set of listing ids for the cumulative chart
    pub fn resample(&mut self) {
        let points = reports::cumulative_reviews(&self.data.reviews);
        match reports::sample_listing_ids(&points, self.sample_size, &mut rand::rng()) {
            Ok(ids) => {
                self.sampled_ids = ids;
                self.sample_message = None;
            }
            Err(e) => {
                self.sampled_ids.clear();
                self.sample_message = Some(e.to_string());
            }
        }
        self.selected_sample = 0;
    }

    pub fn next_sample(&mut self) {
        if !self.sampled_ids.is_empty() {
            self.selected_sample = (self.selected_sample + 1) % self.sampled_ids.len();
        }
    }

    pub fn selected_listing_id(&self) -> Option<i64> {
        self.sampled_ids.get(self.selected_sample).copied()
    }

    pub fn cycle_neighbourhood(&mut self, forward: bool) {
        self.selected_neighbourhood = cycle(self.selected_neighbourhood, self.neighbourhoods.len(), forward);
    }

    pub fn cycle_room_type(&mut self) {
        self.selected_room_type = cycle(self.selected_room_type, self.room_types.len(), true);
    }

    pub fn adjust_bedrooms(&mut self, delta: i32) {
        self.bedrooms = (self.bedrooms + delta).clamp(MIN_BEDROOMS, MAX_BEDROOMS);
    }

    pub fn price_query(&self) -> Option<PriceQuery> {
        Some(PriceQuery {
            neighbourhood: self.neighbourhoods.get(self.selected_neighbourhood)?.clone(),
            room_type: self.room_types.get(self.selected_room_type)?.clone(),
            bedrooms: self.bedrooms,
        })
    }

    pub fn next_row(&mut self) {
        let len = self.data.listings.len();
        if len == 0 {
            return;
        }
        let i = match self.categories_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.categories_state.select(Some(i));
    }

    pub fn previous_row(&mut self) {
        let len = self.data.listings.len();
        if len == 0 {
            return;
        }
        let i = match self.categories_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.categories_state.select(Some(i));
    }
}

fn cycle(current: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        0
    } else if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('s') if app.current_page == Page::Reviews => app.resample(),
                KeyCode::Char('n') if app.current_page == Page::Reviews => app.next_sample(),
                KeyCode::Right if app.current_page == Page::Advisor => app.cycle_neighbourhood(true),
                KeyCode::Left if app.current_page == Page::Advisor => app.cycle_neighbourhood(false),
                KeyCode::Char('r') if app.current_page == Page::Advisor => app.cycle_room_type(),
                KeyCode::Char('+') | KeyCode::Char('=') if app.current_page == Page::Advisor => {
                    app.adjust_bedrooms(1)
                }
                KeyCode::Char('-') if app.current_page == Page::Advisor => app.adjust_bedrooms(-1),
                KeyCode::Char('d') if app.current_page == Page::City => {
                    app.dimension = app.dimension.next()
                }
                KeyCode::Down | KeyCode::Char('j') if app.current_page == Page::Categories => {
                    app.next_row()
                }
                KeyCode::Up | KeyCode::Char('k') if app.current_page == Page::Categories => {
                    app.previous_row()
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Market => render_market(f, chunks[1], app),
        Page::Reviews => render_reviews(f, chunks[1], app),
        Page::Advisor => render_advisor(f, chunks[1], app),
        Page::City => render_city(f, chunks[1], app),
        Page::Categories => render_categories(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in Page::ALL.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Listings: {}", app.data.listings.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Reviews: {}", app.data.reviews.len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

/// Plain table with a yellow header row
fn simple_table<'a>(
    title: &'a str,
    headers: &'a [&'a str],
    rows: Vec<Vec<String>>,
    widths: &'a [Constraint],
) -> Table<'a> {
    let header_cells = headers.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = rows.into_iter().map(|cells| Row::new(cells).height(1));

    Table::new(rows, widths.to_vec())
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", title)),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ")
}

fn render_market(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    // Revenue bar chart
    let revenue = reports::revenue_by_area(&app.data.listings);
    let labels: Vec<String> = revenue.iter().map(|r| truncate(&r.neighbourhood, 9)).collect();
    let bars: Vec<(&str, u64)> = labels
        .iter()
        .zip(&revenue)
        .map(|(label, r)| (label.as_str(), r.total_revenue.max(0.0) as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Top Revenue-Generating Neighbourhoods "),
        )
        .data(bars.as_slice())
        .bar_width(9)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, chunks[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    let room_rows = reports::price_by_room_type(&app.data.listings)
        .into_iter()
        .map(|r| {
            vec![
                r.room_type,
                fmt_price(r.min_price),
                fmt_price(r.avg_price),
                fmt_price(r.max_price),
            ]
        })
        .collect();
    let widths = [
        Constraint::Length(18),
        Constraint::Length(9),
        Constraint::Length(9),
        Constraint::Length(9),
    ];
    f.render_widget(
        simple_table("Price by Room Type", &["Room type", "Min", "Avg", "Max"], room_rows, &widths),
        bottom[0],
    );

    let cheap_rows = reports::cheap_and_reviewed(&app.data.listings)
        .into_iter()
        .map(|c| vec![truncate(&c.name, 30), truncate(&c.neighbourhood, 20), format!("{:.2}", c.price)])
        .collect();
    let widths = [Constraint::Length(32), Constraint::Length(22), Constraint::Length(9)];
    f.render_widget(
        simple_table(
            "Cheapest Listings with >10 Reviews",
            &["Name", "Neighbourhood", "Price"],
            cheap_rows,
            &widths,
        ),
        bottom[1],
    );
}

fn render_reviews(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[0]);

    let most_rows = reports::most_reviewed(&app.data.listings, &app.data.reviews)
        .into_iter()
        .map(|r| vec![r.listing_id.to_string(), truncate(&r.name, 30), r.total_reviews.to_string()])
        .collect::<Vec<_>>();
    let widths = [Constraint::Length(12), Constraint::Length(32), Constraint::Length(8)];
    if most_rows.is_empty() {
        f.render_widget(advisory("Listings with the Most Reviews", "No reviews loaded"), top[0]);
    } else {
        f.render_widget(
            simple_table("Listings with the Most Reviews", &["Id", "Name", "Reviews"], most_rows, &widths),
            top[0],
        );
    }

    let recent_title = format!("Most Reviewed Neighbourhoods since {}", app.recent_since);
    let recent_rows = reports::recent_neighbourhood_reviews(
        &app.data.listings,
        &app.data.reviews,
        app.recent_since,
    )
    .into_iter()
    .map(|r| vec![truncate(&r.neighbourhood, 28), r.review_count.to_string()])
    .collect::<Vec<_>>();
    if recent_rows.is_empty() {
        f.render_widget(advisory(&recent_title, "No reviews in this window"), top[1]);
    } else {
        let widths = [Constraint::Length(30), Constraint::Length(8)];
        f.render_widget(
            simple_table(&recent_title, &["Neighbourhood", "Reviews"], recent_rows, &widths),
            top[1],
        );
    }

    render_cumulative(f, chunks[1], app);
}

fn render_cumulative(f: &mut Frame, area: Rect, app: &App) {
    let title = " Cumulative Reviews per Listing ";

    let Some(listing_id) = app.selected_listing_id() else {
        let message = app
            .sample_message
            .clone()
            .unwrap_or_else(|| "No listings to sample".to_string());
        f.render_widget(advisory(title, &message), area);
        return;
    };

    let points = reports::cumulative_reviews(&app.data.reviews);
    let series = match reports::series_for_listing(&points, listing_id) {
        Ok(series) => series,
        Err(e) => {
            f.render_widget(advisory(title, &e.to_string()), area);
            return;
        }
    };

    let values: Vec<u64> = series.iter().map(|p| p.cumulative_reviews.max(0) as u64).collect();
    let first = series.first().map(|p| p.month.clone()).unwrap_or_default();
    let last = series.last().map(|p| p.month.clone()).unwrap_or_default();

    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Listing {} ({}/{}) · {} → {} · {} reviews ",
            listing_id,
            app.selected_sample + 1,
            app.sampled_ids.len(),
            first,
            last,
            values.last().copied().unwrap_or(0)
        )))
        .data(&values)
        .style(Style::default().fg(Color::Green));
    f.render_widget(sparkline, area);
}

fn render_advisor(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Percentage(40),
            Constraint::Min(0),
        ])
        .split(area);

    let Some(query) = app.price_query() else {
        f.render_widget(advisory(" Suggested Nightly Price ", "No listings loaded"), chunks[0]);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Neighbourhood: ", label_style()),
            Span::raw(query.neighbourhood.clone()),
            Span::styled("   Room type: ", label_style()),
            Span::raw(query.room_type.clone()),
            Span::styled("   Bedrooms: ", label_style()),
            Span::raw(query.bedrooms.to_string()),
        ]),
        Line::from(""),
    ];

    let suggestion = reports::suggest_price(&app.data.listings, &query);
    match &suggestion {
        Ok(s) => {
            lines.push(Line::from(vec![
                Span::styled("  💰 Recommended Price: ", label_style()),
                Span::styled(
                    format!("€{:.2}", s.suggested_price),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("   (based on {} similar listings)", s.similar_listings),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
            lines.push(Line::from(vec![
                Span::styled("  Avg ", label_style()),
                Span::raw(format!("€{:.2}", s.avg_price)),
                Span::styled("   Min ", label_style()),
                Span::raw(format!("€{:.2}", s.min_price)),
                Span::styled("   Max ", label_style()),
                Span::raw(format!("€{:.2}", s.max_price)),
            ]));
        }
        Err(e) => {
            lines.push(Line::from(Span::styled(
                format!("  ⚠ {}. Try another combination.", e),
                Style::default().fg(Color::Yellow),
            )));
        }
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Suggested Nightly Price "),
    );
    f.render_widget(panel, chunks[0]);

    if let Ok(s) = suggestion {
        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);

        f.render_widget(availability_chart(&s.reviews_vs_availability), middle[1]);

        let sample_rows = s
            .sample
            .into_iter()
            .map(|l| {
                vec![
                    truncate(&l.name, 30),
                    fmt_price(l.price),
                    l.minimum_nights.to_string(),
                    l.number_of_reviews.to_string(),
                    l.availability_365.to_string(),
                ]
            })
            .collect();
        let widths = [
            Constraint::Length(32),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
        ];
        f.render_widget(
            simple_table(
                "Sample Listings",
                &["Name", "Price", "Min nts", "Reviews", "Avail"],
                sample_rows,
                &widths,
            ),
            middle[0],
        );

        let host_rows = reports::top_hosts(&app.data.listings)
            .into_iter()
            .map(|h| {
                vec![
                    truncate(&h.neighbourhood, 24),
                    truncate(&h.host_name, 18),
                    h.host_id.to_string(),
                    h.total_listings.to_string(),
                    format!("{:.0}", h.total_revenue),
                ]
            })
            .collect();
        let widths = [
            Constraint::Length(26),
            Constraint::Length(20),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(12),
        ];
        f.render_widget(
            simple_table(
                "Top Hosts per Neighbourhood by Estimated Revenue",
                &["Neighbourhood", "Host", "Host id", "Listings", "Revenue"],
                host_rows,
                &widths,
            ),
            chunks[2],
        );
    }
}

/// Availability and review count side by side for each similar listing
fn availability_groups(points: &[AvailabilityPoint]) -> Vec<BarGroup<'static>> {
    points
        .iter()
        .map(|p| {
            let bars = [
                Bar::default()
                    .value(p.availability_365.max(0) as u64)
                    .style(Style::default().fg(Color::Cyan)),
                Bar::default()
                    .value(p.number_of_reviews.max(0) as u64)
                    .style(Style::default().fg(Color::Green)),
            ];
            BarGroup::default()
                .label(Line::from(format!("#{}", p.listing_id)))
                .bars(&bars)
        })
        .collect()
}

fn availability_chart(points: &[AvailabilityPoint]) -> BarChart<'static> {
    let mut chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Reviews vs Availability (cyan: days, green: reviews) "),
        )
        .bar_width(3)
        .bar_gap(0)
        .group_gap(2);

    for group in availability_groups(points) {
        chart = chart.data(group);
    }
    chart
}

fn render_city(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(25),
            Constraint::Percentage(30),
        ])
        .split(area);

    let avg_rows = reports::city_averages(&app.data.listings)
        .into_iter()
        .map(|a| {
            vec![
                truncate(&a.neighbourhood, 22),
                fmt_price(a.avg_price),
                format!("{:.0}", a.avg_availability_365),
                format!("{:.1}", a.avg_number_of_reviews),
            ]
        })
        .collect();
    let widths = [
        Constraint::Length(24),
        Constraint::Length(9),
        Constraint::Length(7),
        Constraint::Length(8),
    ];
    f.render_widget(
        simple_table(
            "Average Price by Neighbourhood",
            &["Neighbourhood", "Price", "Avail", "Reviews"],
            avg_rows,
            &widths,
        ),
        chunks[0],
    );

    let count_rows = reports::listing_counts(&app.data.listings)
        .into_iter()
        .map(|c| vec![truncate(&c.neighbourhood, 22), c.listings.to_string()])
        .collect();
    let widths = [Constraint::Length(24), Constraint::Length(8)];
    f.render_widget(
        simple_table("Listings Count", &["Neighbourhood", "Count"], count_rows, &widths),
        chunks[1],
    );

    let ltm_title = format!("Reviews (Last 12 Months) by {}", app.dimension);
    let ltm_rows = reports::ltm_review_means(&app.data.listings, app.dimension)
        .into_iter()
        .map(|m| vec![truncate(&m.group, 22), format!("{:.2}", m.mean_reviews_ltm)])
        .collect();
    let widths = [Constraint::Length(24), Constraint::Length(8)];
    f.render_widget(
        simple_table(&ltm_title, &["Group", "Mean"], ltm_rows, &widths),
        chunks[2],
    );
}

fn render_categories(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = reports::categorize_listings(&app.data.listings)
        .into_iter()
        .map(|c| {
            let color = match c.category {
                ValueCategory::TopBudgetPick => Color::Green,
                ValueCategory::BestMidRange => Color::Cyan,
                ValueCategory::NicheOrPremium => Color::White,
            };
            Row::new(vec![
                Cell::from(truncate(&c.name, 30)),
                Cell::from(truncate(&c.neighbourhood, 22)),
                Cell::from(fmt_price(c.price)),
                Cell::from(c.number_of_reviews.to_string()),
                Cell::from(c.category.as_str()).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let header = Row::new(["Name", "Neighbourhood", "Price", "Reviews", "Category"].map(|h| {
        Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray));

    let table = Table::new(
        rows,
        [
            Constraint::Length(32),
            Constraint::Length(24),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(18),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Listing Categories by Price and Popularity "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.categories_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    let hints: &[(&str, &str)] = match app.current_page {
        Page::Reviews => &[("s", " Resample"), ("n", " Next listing")],
        Page::Advisor => &[("←/→", " Neighbourhood"), ("r", " Room type"), ("+/-", " Bedrooms")],
        Page::City => &[("d", " Group by")],
        Page::Categories => &[("↑/↓", " Nav")],
        Page::Market => &[],
    };

    for (key, label) in hints {
        status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(*label));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn advisory<'a>(title: &str, message: &str) -> Paragraph<'a> {
    Paragraph::new(Line::from(Span::styled(
        format!("  ⚠ {}", message),
        Style::default().fg(Color::Yellow),
    )))
    .block(Block::default().borders(Borders::ALL).title(format!(" {} ", title.trim())))
}

fn label_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn fmt_price(price: Option<f64>) -> String {
    price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_insights::{Listing, Review};

    fn listing(id: i64, neighbourhood: &str, room_type: &str) -> Listing {
        Listing {
            id,
            name: format!("Listing {}", id),
            host_id: id * 10,
            host_name: format!("Host {}", id),
            neighbourhood_group: None,
            neighbourhood: neighbourhood.to_string(),
            room_type: room_type.to_string(),
            price: Some(50.0),
            minimum_nights: 1,
            number_of_reviews: 3,
            reviews_per_month: None,
            availability_365: 100,
            number_of_reviews_ltm: 1,
        }
    }

    fn app() -> App {
        let data = Dataset::new(
            vec![
                listing(1, "Mitte", "Entire home/apt"),
                listing(2, "Kreuzberg", "Private room"),
            ],
            vec![Review {
                listing_id: 1,
                date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            }],
        );
        App::new(data, &InsightsConfig::default())
    }

    #[test]
    fn test_page_cycle() {
        let mut page = Page::Market;
        for _ in 0..Page::ALL.len() {
            page = page.next();
        }
        assert_eq!(page, Page::Market);
        assert_eq!(Page::Market.previous(), Page::Categories);
    }

    #[test]
    fn test_bedrooms_clamped() {
        let mut app = app();
        app.adjust_bedrooms(-1);
        assert_eq!(app.bedrooms, 1);
        app.adjust_bedrooms(20);
        assert_eq!(app.bedrooms, 10);
    }

    #[test]
    fn test_selection_cycles() {
        let mut app = app();
        assert_eq!(app.price_query().unwrap().neighbourhood, "Kreuzberg");
        app.cycle_neighbourhood(true);
        assert_eq!(app.price_query().unwrap().neighbourhood, "Mitte");
        app.cycle_neighbourhood(true);
        assert_eq!(app.selected_neighbourhood, 0);
        app.cycle_neighbourhood(false);
        assert_eq!(app.selected_neighbourhood, 1);

        app.cycle_room_type();
        assert_eq!(app.price_query().unwrap().room_type, "Private room");
    }

    #[test]
    fn test_sample_only_reviewed_listings() {
        let mut app = app();
        assert_eq!(app.sampled_ids, vec![1]);
        app.next_sample();
        assert_eq!(app.selected_listing_id(), Some(1));
    }

    #[test]
    fn test_availability_groups_pair_each_listing() {
        let points = vec![
            AvailabilityPoint {
                listing_id: 1,
                availability_365: 100,
                number_of_reviews: 3,
            },
            AvailabilityPoint {
                listing_id: 2,
                availability_365: 0,
                number_of_reviews: 9,
            },
        ];

        assert_eq!(availability_groups(&points).len(), 2);
        assert!(availability_groups(&[]).is_empty());
    }

    #[test]
    fn test_advisor_page_draws_availability_chart() {
        use ratatui::backend::TestBackend;

        let mut app = app();
        app.current_page = Page::Advisor;
        app.cycle_neighbourhood(true);
        let query = app.price_query().unwrap();
        let suggestion = reports::suggest_price(&app.data.listings, &query).unwrap();
        assert_eq!(suggestion.reviews_vs_availability.len(), 1);

        let mut terminal = Terminal::new(TestBackend::new(160, 50)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Reviews vs Availability"));
        assert!(text.contains("#1"));
    }

    #[test]
    fn test_empty_dataset() {
        let mut app = App::new(Dataset::new(vec![], vec![]), &InsightsConfig::default());
        assert!(app.price_query().is_none());
        assert!(app.sample_message.is_some());
        app.next_row();
        assert_eq!(app.categories_state.selected(), None);
    }
}
