use super::ui;
use crate::core::{Converter, currency};

/// Converts a single amount and renders both sides with currency symbols.
pub async fn display_conversion(converter: &Converter, amount: f64, from: &str, to: &str) -> String {
    let converted = converter.convert_amount(amount, from, to).await;
    format!(
        "{} = {}",
        ui::style_text(&currency::format_amount(amount, from), ui::StyleType::TotalLabel),
        ui::style_text(&currency::format_amount(converted, to), ui::StyleType::TotalValue),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FallbackFetcher;
    use crate::store::RateStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_display_conversion() {
        let converter =
            Converter::new(Arc::new(RateStore::with_defaults(Arc::new(FallbackFetcher))));
        let output = display_conversion(&converter, 100.0, "USD", "KES").await;
        assert_eq!(
            console::strip_ansi_codes(&output),
            "$ 100.00 = KSh 13000.00"
        );
    }
}
