use std::sync::LazyLock;

use regex::Regex;

/// Field-name keywords whose values are amounts of in-game currency.
const CURRENCY_KEYWORDS: [&str; 2] = ["price", "reward"];

// word form first, so "gold" is never left behind as "old"
static GOLD_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)gold").unwrap());
static GOLD_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)g").unwrap());

pub fn is_operator_field(field: &str) -> bool {
    field.contains("operator")
}

pub fn is_currency_field(field: &str) -> bool {
    !is_operator_field(field) && CURRENCY_KEYWORDS.iter().any(|k| field.contains(k))
}

/// Makes currency amounts comparable: `"1,000G"`, `"1000 gold"` and `"1000"`
/// all become `"1000"` for a price or reward field. Values of other fields are
/// returned unchanged.
pub fn normalize_value(value: &str, field: &str) -> String {
    if !is_currency_field(field) {
        return value.to_string();
    }
    let compact: String = value
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    let without_word = GOLD_WORD.replace_all(&compact, "");
    GOLD_LETTER.replace_all(&without_word, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_spellings_collapse() {
        let a = normalize_value("1,000G", "item_price");
        let b = normalize_value("1000 gold", "item_price");
        let c = normalize_value("1000", "item_price");
        assert_eq!(a, "1000");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(normalize_value("20 Gold", "quest_reward"), "20");
        assert_eq!(normalize_value("5 GOLD", "quest_reward"), "5");
    }

    #[test]
    fn operator_fields_are_untouched() {
        assert_eq!(
            normalize_value("or more", "item_price_operator"),
            "or more"
        );
        assert_eq!(normalize_value("1,000 G", "item_price_operator"), "1,000 G");
    }

    #[test]
    fn non_currency_fields_are_untouched() {
        assert_eq!(normalize_value("Avis Wind", "item_name"), "Avis Wind");
        // attack values are compared exactly but are not currency
        assert_eq!(normalize_value("1,200", "item_attack"), "1,200");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["1,000G", "ggoldold", "  12 gOlD ", "", "g", "Gold Coin 30g"] {
            let once = normalize_value(raw, "item_price");
            let twice = normalize_value(&once, "item_price");
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn empty_maps_to_empty() {
        assert_eq!(normalize_value("", "item_price"), "");
        assert_eq!(normalize_value("", "item_name"), "");
    }
}
