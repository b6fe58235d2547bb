use super::ui;
use crate::core::currency;
use crate::core::resolver::RatePath;
use crate::core::{Converter, RateTable};
use crate::store::CacheStatus;
use comfy_table::Cell;

/// Describes the rate between two currencies and how it was derived.
pub async fn display_rate(converter: &Converter, from: &str, to: &str) -> String {
    let from = currency::normalize_code(from);
    let to = currency::normalize_code(to);
    let resolution = converter.resolve(&from, &to).await;

    let how = match resolution.path {
        RatePath::Triangulated => format!(
            "triangulated via {}",
            converter.store().snapshot().table.base()
        ),
        RatePath::Unresolved => ui::style_text("no rate available, using 1:1", ui::StyleType::Error),
        path => path.to_string(),
    };

    format!(
        "1 {} = {} {} {}",
        ui::style_text(&from, ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.6}", resolution.rate), ui::StyleType::TotalValue),
        ui::style_text(&to, ui::StyleType::TotalLabel),
        ui::style_text(&format!("({how})"), ui::StyleType::Subtle),
    )
}

/// Renders a cached rate table together with the cache status.
pub fn display_rates(table: &RateTable, status: &CacheStatus) -> String {
    let mut output = format!(
        "Rates for {}\n\n",
        ui::style_text(table.base(), ui::StyleType::Title)
    );

    let mut rates_table = ui::new_styled_table();
    rates_table.set_header(vec![ui::header_cell("Pair"), ui::header_cell("Rate")]);
    for (pair, rate) in table.entries() {
        rates_table.add_row(vec![Cell::new(pair), ui::number_cell(format!("{rate:.6}"))]);
    }
    output.push_str(&rates_table.to_string());

    let freshness = if status.fresh {
        ui::style_text("fresh", ui::StyleType::TotalValue)
    } else {
        ui::style_text("stale", ui::StyleType::Error)
    };
    output.push_str(&format!(
        "\n\n{} entries from {} ({}), refreshed {}",
        status.entries,
        status.source,
        freshness,
        status.last_refreshed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    ));
    output
}

/// Lists the supported currencies.
pub fn display_currencies() -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Code"),
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Decimals"),
    ]);
    for c in currency::all() {
        table.add_row(vec![
            Cell::new(c.code),
            Cell::new(c.symbol),
            Cell::new(c.name),
            ui::number_cell(c.decimal_digits.to_string()),
        ]);
    }
    table.to_string()
}
