//! Terminal rendering of an assembled series: one column per day, one row per
//! allergen seen in the window.

use std::fmt;

use chrono::NaiveDate;
use crossterm::style::{Color, Stylize};
use log::warn;

use crate::dates::{day_label, weekday_label};
use crate::gradient::{classify, Palette, Rgb};
use crate::models::{AllergenId, ResolvedDay};
use crate::reference::ReferenceData;

const LABEL_WIDTH: usize = 14;
const CELL_WIDTH: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub value: f64,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub label: String,
    pub cells: Vec<Option<Cell>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub columns: Vec<NaiveDate>,
    pub rows: Vec<Row>,
}

impl From<Rgb> for Color {
    fn from(color: Rgb) -> Self {
        Color::Rgb {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

impl Table {
    /// Rows follow the reference allergen order and only include allergens
    /// measured on at least one day. Allergens missing from the reference data
    /// come last, in order of appearance, painted with the neutral color.
    pub fn build(series: &[ResolvedDay], reference: &ReferenceData, palette: &Palette) -> Self {
        let mut unknown: Vec<AllergenId> = Vec::new();
        for concentration in series.iter().flat_map(|day| &day.concentrations) {
            if unknown.contains(&concentration.allergen) {
                continue;
            }
            if let Err(e) = reference.require_allergen(concentration.allergen) {
                warn!("concentration {} cannot be classified: {}", concentration.id, e);
                unknown.push(concentration.allergen);
            }
        }

        let row = |label: String, allergen: AllergenId| Row {
            label,
            cells: series
                .iter()
                .map(|day| {
                    day.concentration_for(allergen).map(|concentration| Cell {
                        value: concentration.value,
                        color: classify(concentration, reference, palette).or_neutral(palette),
                    })
                })
                .collect(),
        };

        let known = reference
            .allergens
            .iter()
            .filter(|allergen| {
                series
                    .iter()
                    .any(|day| day.concentration_for(allergen.id).is_some())
            })
            .map(|allergen| row(allergen.label().to_string(), allergen.id));
        let unclassified = unknown
            .iter()
            .map(|&id| row(format!("allergen {}", id), id));

        Table {
            columns: series.iter().map(|day| day.date).collect(),
            rows: known.chain(unclassified).collect(),
        }
    }

    pub fn render(&self, colored: bool) -> String {
        Rendered {
            table: self,
            colored,
        }
        .to_string()
    }
}

struct Rendered<'a> {
    table: &'a Table,
    colored: bool,
}

impl fmt::Display for Rendered<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in [day_label as fn(NaiveDate) -> String, weekday_label] {
            write!(f, "{:width$}", "", width = LABEL_WIDTH)?;
            for date in &self.table.columns {
                write!(f, "{:>width$}", label(*date), width = CELL_WIDTH)?;
            }
            writeln!(f)?;
        }

        for row in &self.table.rows {
            let label: String = row.label.chars().take(LABEL_WIDTH - 1).collect();
            write!(f, "{:<width$}", label, width = LABEL_WIDTH)?;
            for cell in &row.cells {
                match cell {
                    None => write!(f, "{:>width$}", "-", width = CELL_WIDTH)?,
                    Some(cell) => {
                        let text = format!("{:>width$}", cell.value, width = CELL_WIDTH);
                        if self.colored {
                            write!(f, "{}", text.on(cell.color.into()).black())?;
                        } else {
                            f.write_str(&text)?;
                        }
                    }
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
