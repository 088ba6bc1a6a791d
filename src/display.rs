//! Terminal rendering of rate results. The retrieval layer hands over a
//! sequence of `RateResult`s; everything here is presentation only.

use chrono::Utc;
use comfy_table::Cell;

use crate::model::{RateResult, RateValue, Source};
use crate::ui;

impl RateResult {
    pub fn display_as_table(&self) -> String {
        let heading = format!("{} — {}", self.source.label(), self.currency);
        let mut output = format!("{}\n\n", ui::style_text(&heading, ui::StyleType::Title));

        let series = match &self.outcome {
            Ok(series) => series,
            Err(error) => {
                output.push_str(&ui::style_text(&error.to_string(), ui::StyleType::Error));
                return output;
            }
        };

        if series.entries.is_empty() {
            output.push_str(&ui::style_text(
                "No rates published for the requested period.",
                ui::StyleType::Subtle,
            ));
            return output;
        }

        let mut table = ui::new_styled_table();
        let unit = self.source.unit();
        match self.source {
            Source::NbpBidAsk => {
                table.set_header(vec![
                    ui::header_cell("Date"),
                    ui::header_cell(&format!("Bid ({unit})")),
                    ui::header_cell(&format!("Ask ({unit})")),
                ]);
            }
            Source::NbpMid | Source::Ecb => {
                table.set_header(vec![
                    ui::header_cell("Date"),
                    ui::header_cell(&format!("Rate ({unit})")),
                ]);
            }
        }

        for entry in &series.entries {
            match entry.value {
                RateValue::Mid(mid) => {
                    table.add_row(vec![Cell::new(entry.date.to_string()), ui::rate_cell(mid)]);
                }
                RateValue::BidAsk { bid, ask } => {
                    table.add_row(vec![
                        Cell::new(entry.date.to_string()),
                        ui::rate_cell(bid),
                        ui::rate_cell(ask),
                    ]);
                }
            }
        }
        output.push_str(&table.to_string());

        if let Some(effective_date) = series.effective_date {
            if effective_date != Utc::now().date_naive() {
                output.push('\n');
                output.push_str(&ui::style_text(
                    &format!("Note: latest published rate is from {effective_date}."),
                    ui::StyleType::Subtle,
                ));
            }
        }

        output
    }
}

/// Prints each result in order, separated for readability.
pub fn render(results: &[RateResult]) {
    let count = results.len();
    for (i, result) in results.iter().enumerate() {
        println!("{}", result.display_as_table());
        if i < count.saturating_sub(1) {
            ui::print_separator();
        }
    }
}
