use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use poller::Board;

const TITLE: &str = "Price Updates Dashboard";

pub fn render(board: &Board) -> String {
    render_with(board, |ts| {
        ts.with_timezone(&Local).format("%H:%M:%S").to_string()
    })
}

fn render_with(board: &Board, time_of: impl Fn(&DateTime<Utc>) -> String) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");
    if let Some(error) = board.load_error() {
        let _ = writeln!(out, "error: {error}");
    }
    if board.is_loading() {
        let _ = writeln!(out, "Loading items...");
        return out;
    }
    let _ = writeln!(out, "{:>4}  {:<12} {:>12}  {}", "ID", "Name", "Price", "Updated At");
    for row in board.rows() {
        let price = format!(
            "${:.2}{}",
            row.item.price,
            row.price_change.map(|c| c.indicator()).unwrap_or_default()
        );
        let _ = writeln!(
            out,
            "{:>4}  {:<12} {:>12}  {}",
            row.item.id,
            row.item.name,
            price,
            time_of(&row.item.updated_at)
        );
    }
    out
}
