//! SVG charts of a working table's `Prix` series.
//!
//! Rendering is a pure function of the table and the chosen kinds; nothing
//! flows back into the model.

use std::f64::consts::PI;
use std::fmt;
use std::path::Path as FsPath;
use std::str::FromStr;

use svg::node::element::path::Data;
use svg::node::element::{Circle, Line, Path, Rectangle, Text};
use svg::Document;

use crate::error::{DepensesError, Result};
use crate::fmt::DisplayConfig;
use crate::models::PRICE;
use crate::table::Table;

/// Set of chart kinds. Bar, line and point combine; pie stands alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ChartKind(u8);

impl ChartKind {
    pub const BAR: ChartKind = ChartKind(1);
    pub const LINE: ChartKind = ChartKind(2);
    pub const POINT: ChartKind = ChartKind(4);
    pub const PIE: ChartKind = ChartKind(8);

    const ALL: [(ChartKind, &'static str); 4] = [
        (Self::BAR, "bar"),
        (Self::LINE, "line"),
        (Self::POINT, "point"),
        (Self::PIE, "pie"),
    ];

    pub fn empty() -> Self {
        ChartKind(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, kind: ChartKind) -> bool {
        kind.0 != 0 && self.0 & kind.0 == kind.0
    }

    /// Adds `kind`. Adding pie clears the others; adding any other kind
    /// clears pie.
    pub fn with(self, kind: ChartKind) -> Self {
        if kind.contains(Self::PIE) {
            Self::PIE
        } else {
            ChartKind((self.0 & !Self::PIE.0) | kind.0)
        }
    }

    pub fn without(self, kind: ChartKind) -> Self {
        ChartKind(self.0 & !kind.0)
    }

    /// Flips one kind on or off, keeping pie exclusive.
    pub fn toggle(self, kind: ChartKind) -> Self {
        if self.contains(kind) {
            self.without(kind)
        } else {
            self.with(kind)
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::ALL
            .iter()
            .filter(|(k, _)| self.contains(*k))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&names.join(","))
    }
}

impl FromStr for ChartKind {
    type Err = DepensesError;

    /// Parses a comma-separated list such as `bar,line`.
    fn from_str(s: &str) -> Result<Self> {
        let mut kinds = ChartKind::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind = match part.to_lowercase().as_str() {
                "bar" | "barre" => Self::BAR,
                "line" | "ligne" => Self::LINE,
                "point" | "scatter" => Self::POINT,
                "pie" | "camembert" => Self::PIE,
                other => {
                    return Err(DepensesError::Validation(format!("unknown chart kind '{other}'")))
                }
            };
            if kinds.contains(Self::PIE) || (kind == Self::PIE && !kinds.is_empty()) {
                return Err(DepensesError::Validation(
                    "pie charts cannot be combined with other kinds".into(),
                ));
            }
            kinds = kinds.with(kind);
        }
        Ok(kinds)
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const MARGIN: f64 = 60.0;

const COLORS: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
];

/// Draws `Prix` against the labels in `x_column`.
pub fn render_svg(
    table: &Table,
    x_column: usize,
    kinds: ChartKind,
    display: &DisplayConfig,
) -> Result<Document> {
    if x_column >= table.column_count() {
        return Err(DepensesError::UnknownColumn(format!("#{x_column}")));
    }
    let price = table
        .column_position(PRICE)
        .ok_or_else(|| DepensesError::UnknownColumn(PRICE.to_string()))?;

    let points: Vec<(String, f64)> = (0..table.len())
        .map(|r| {
            let label = table
                .cell(r, x_column)
                .map(|v| display.format_value(v))
                .unwrap_or_default();
            let y = table.cell(r, price).and_then(|v| v.as_f64()).unwrap_or(0.0);
            (label, y)
        })
        .collect();

    let document = Document::new()
        .set("viewBox", (0.0, 0.0, WIDTH, HEIGHT))
        .set("width", WIDTH)
        .set("height", HEIGHT);

    if kinds.contains(ChartKind::PIE) {
        Ok(pie(document, &points))
    } else {
        Ok(cartesian(document, &points, kinds))
    }
}

pub fn save_svg(path: &FsPath, document: &Document) -> Result<()> {
    svg::save(path, document)?;
    Ok(())
}

fn label(x: f64, y: f64, anchor: &str, content: &str) -> Text {
    Text::new()
        .set("x", x)
        .set("y", y)
        .set("text-anchor", anchor)
        .set("font-size", 12)
        .set("font-family", "sans-serif")
        .add(svg::node::Text::new(content))
}

fn cartesian(mut doc: Document, points: &[(String, f64)], kinds: ChartKind) -> Document {
    let plot_w = WIDTH - 2.0 * MARGIN;
    let plot_h = HEIGHT - 2.0 * MARGIN;
    let ymax = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::max);
    let ymin = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::min);
    let span = if ymax - ymin > 0.0 { ymax - ymin } else { 1.0 };
    let slot = plot_w / points.len().max(1) as f64;

    let to_x = |i: usize| MARGIN + slot * (i as f64 + 0.5);
    let to_y = |y: f64| MARGIN + (ymax - y) / span * plot_h;
    let baseline = to_y(0.0);

    if kinds.contains(ChartKind::BAR) {
        for (i, (_, y)) in points.iter().enumerate() {
            let (top, bottom) = (to_y(*y).min(baseline), to_y(*y).max(baseline));
            doc = doc.add(
                Rectangle::new()
                    .set("x", to_x(i) - slot * 0.35)
                    .set("y", top)
                    .set("width", slot * 0.7)
                    .set("height", bottom - top)
                    .set("fill", COLORS[0]),
            );
        }
    }

    if kinds.contains(ChartKind::LINE) && !points.is_empty() {
        let mut data = Data::new().move_to((to_x(0), to_y(points[0].1)));
        for (i, (_, y)) in points.iter().enumerate().skip(1) {
            data = data.line_to((to_x(i), to_y(*y)));
        }
        doc = doc.add(
            Path::new()
                .set("fill", "none")
                .set("stroke", COLORS[1])
                .set("stroke-width", 2)
                .set("d", data),
        );
    }

    if kinds.contains(ChartKind::POINT) {
        for (i, (_, y)) in points.iter().enumerate() {
            doc = doc.add(
                Circle::new()
                    .set("cx", to_x(i))
                    .set("cy", to_y(*y))
                    .set("r", 4)
                    .set("fill", COLORS[2]),
            );
        }
    }

    let axis = |x1: f64, y1: f64, x2: f64, y2: f64| {
        Line::new()
            .set("x1", x1)
            .set("y1", y1)
            .set("x2", x2)
            .set("y2", y2)
            .set("stroke", "black")
            .set("stroke-width", 1)
    };
    doc = doc
        .add(axis(MARGIN, baseline, WIDTH - MARGIN, baseline))
        .add(axis(MARGIN, MARGIN, MARGIN, HEIGHT - MARGIN));

    for (i, (name, _)) in points.iter().enumerate() {
        doc = doc.add(label(to_x(i), HEIGHT - MARGIN + 18.0, "middle", name));
    }
    doc.add(label(MARGIN - 8.0, MARGIN, "end", &format!("{ymax:.2}")))
}

fn pie(mut doc: Document, points: &[(String, f64)]) -> Document {
    let (cx, cy) = (WIDTH / 2.0, HEIGHT / 2.0);
    let r = HEIGHT / 2.0 - MARGIN;
    let total: f64 = points.iter().map(|(_, y)| y.max(0.0)).sum();
    if total <= 0.0 {
        return doc;
    }

    let mut start = -PI / 2.0;
    for (i, (name, y)) in points.iter().enumerate() {
        let share = y.max(0.0) / total;
        if share <= 0.0 {
            continue;
        }
        let color = COLORS[i % COLORS.len()];
        let sweep = share * 2.0 * PI;
        let end = start + sweep;
        if share >= 1.0 {
            doc = doc.add(
                Circle::new()
                    .set("cx", cx)
                    .set("cy", cy)
                    .set("r", r)
                    .set("fill", color),
            );
        } else {
            let (x0, y0) = (cx + r * start.cos(), cy + r * start.sin());
            let (x1, y1) = (cx + r * end.cos(), cy + r * end.sin());
            let large = if sweep > PI { 1 } else { 0 };
            doc = doc.add(
                Path::new()
                    .set("fill", color)
                    .set("stroke", "white")
                    .set(
                        "d",
                        format!("M {cx} {cy} L {x0} {y0} A {r} {r} 0 {large} 1 {x1} {y1} Z"),
                    ),
            );
        }
        let mid = start + sweep / 2.0;
        let (lx, ly) = (cx + r * 0.65 * mid.cos(), cy + r * 0.65 * mid.sin());
        doc = doc.add(label(
            lx,
            ly,
            "middle",
            &format!("{name} ({:.1}%)", share * 100.0),
        ));
        start = end;
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;

    fn totals() -> Table {
        let mut t = Table::new(["Catégorie", "Prix"]);
        t.push(vec![Value::from("Food"), Value::from(3.7)]);
        t.push(vec![Value::from("Transport"), Value::from(1.8)]);
        t
    }

    #[test]
    fn test_pie_is_exclusive() {
        let kinds = ChartKind::BAR.with(ChartKind::LINE);
        assert!(kinds.contains(ChartKind::BAR) && kinds.contains(ChartKind::LINE));
        let pie = kinds.with(ChartKind::PIE);
        assert_eq!(pie, ChartKind::PIE);
        let back = pie.with(ChartKind::POINT);
        assert_eq!(back, ChartKind::POINT);
        assert_eq!(back.toggle(ChartKind::POINT), ChartKind::empty());
    }

    #[test]
    fn test_parse_kinds() {
        let kinds: ChartKind = "bar, point".parse().unwrap();
        assert!(kinds.contains(ChartKind::BAR));
        assert!(kinds.contains(ChartKind::POINT));
        assert!(!kinds.contains(ChartKind::LINE));
        assert_eq!(kinds.to_string(), "bar,point");
        assert!("bar,pie".parse::<ChartKind>().is_err());
        assert!("donut".parse::<ChartKind>().is_err());
        assert_eq!("pie".parse::<ChartKind>().unwrap(), ChartKind::PIE);
    }

    #[test]
    fn test_render_bar_line_point() {
        let kinds = ChartKind::BAR.with(ChartKind::LINE).with(ChartKind::POINT);
        let doc = render_svg(&totals(), 0, kinds, &DisplayConfig::default()).unwrap();
        let svg = doc.to_string();
        assert_eq!(svg.matches("<rect").count(), 2);
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("<path"));
        assert!(svg.contains("Transport"));
    }

    #[test]
    fn test_render_pie_labels_percentages() {
        let doc = render_svg(&totals(), 0, ChartKind::PIE, &DisplayConfig::default()).unwrap();
        let svg = doc.to_string();
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains("Food (67.3%)"));
        assert!(svg.contains("Transport (32.7%)"));
    }

    #[test]
    fn test_render_requires_price_column() {
        let t = Table::new(["Catégorie", "Montant"]);
        assert!(render_svg(&t, 0, ChartKind::BAR, &DisplayConfig::default()).is_err());
        assert!(render_svg(&totals(), 5, ChartKind::BAR, &DisplayConfig::default()).is_err());
    }
}
