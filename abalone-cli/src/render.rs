//! ASCII board rendering
//!
//! Row I is printed on top and row A at the bottom, each row shifted so the
//! hex diagonals line up. Column numbers run along the lower edge and the
//! lower right diagonal, as on a physical board.

use abalone_core::board::{Topology, BOARD_RADIUS};
use abalone_core::{BoardSnapshot, Cube, LastAction, Side};

/// Character for a cell's occupant
pub fn piece_char(occupant: Option<Side>) -> char {
    match occupant {
        Some(Side::Black) => 'X',
        Some(Side::White) => 'O',
        None => '.',
    }
}

/// Render the board, bracketing the cells `highlight` moved pieces into
pub fn render_board(snapshot: &BoardSnapshot, highlight: Option<&LastAction>) -> String {
    let topology = Topology::shared();
    let radius = BOARD_RADIUS;
    let marked: Vec<_> = highlight
        .map(|action| {
            action
                .mv
                .steps()
                .iter()
                .filter_map(|step| step.to)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let mut out = String::new();
    for a in -radius..=radius {
        let row = (b'A' + (radius - a) as u8) as char;
        let indent = " ".repeat(a.unsigned_abs() as usize);
        out.push_str(&format!("{}{} ", indent, row));

        let first = (-radius).max(-radius - a);
        let last = radius.min(radius - a);
        for b in first..=last {
            let Some(cell) = topology.cell_at(Cube::new(a, b)) else {
                continue;
            };
            let symbol = piece_char(snapshot.occupant(cell));
            if marked.contains(&cell) {
                out.push_str(&format!("[{}]", symbol));
            } else {
                out.push_str(&format!(" {} ", symbol));
            }
        }

        // Lower right diagonal carries columns 6..9
        if (0..radius).contains(&a) {
            out.push_str(&format!(" {}", last + radius + 1));
        }
        out.push('\n');
    }

    // Columns 1..5 under row A
    let indent = " ".repeat(radius as usize + 2);
    let columns: Vec<String> = (1..=radius + 1).map(|c| format!(" {} ", c)).collect();
    out.push_str(&format!("{}{}\n", indent, columns.join("")));
    out
}

/// One-line material summary
pub fn render_counts(snapshot: &BoardSnapshot) -> String {
    format!(
        "{} {}: {}   {} {}: {}",
        piece_char(Some(Side::Black)),
        Side::Black,
        snapshot.remaining(Side::Black),
        piece_char(Some(Side::White)),
        Side::White,
        snapshot.remaining(Side::White),
    )
}
