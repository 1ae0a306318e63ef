use serde_json::Value;

/// Well-known detail categories, in display order.
const KNOWN_CATEGORIES: [&str; 10] = [
    "skills",
    "experience",
    "location",
    "education",
    "certifications",
    "keywords",
    "relevance",
    "quality",
    "formatting",
    "completeness",
];

/// Converts a raw backend score to a canonical fraction in [0, 1].
///
/// Accepts a percentage string ("82%"), a fraction (0.82), or a number on a
/// 0–100 scale (82), numeric strings included. Anything above 1 is read as a
/// percentage. Returns `None` for values that carry no number.
pub fn normalize_score(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => from_number(n.as_f64()?),
        Value::String(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(pct) => {
                    let pct: f64 = pct.trim().parse().ok()?;
                    pct.is_finite().then(|| (pct / 100.0).clamp(0.0, 1.0))
                }
                None => from_number(s.parse().ok()?),
            }
        }
        _ => None,
    }
}

fn from_number(n: f64) -> Option<f64> {
    if !n.is_finite() {
        return None;
    }
    let fraction = if n > 1.0 { n / 100.0 } else { n };
    Some(fraction.clamp(0.0, 1.0))
}

/// Display priority for a detail category (1 = first). Unknown categories get none.
pub fn category_priority(category: &str) -> Option<u8> {
    let category = category.to_ascii_lowercase();
    KNOWN_CATEGORIES
        .iter()
        .position(|known| *known == category)
        .map(|i| i as u8 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_three_shapes_normalize_to_same_value() {
        assert_eq!(normalize_score(&json!("82%")), Some(0.82));
        assert_eq!(normalize_score(&json!(0.82)), Some(0.82));
        assert_eq!(normalize_score(&json!(82)), Some(0.82));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = normalize_score(&json!("82%")).unwrap();
        assert_eq!(normalize_score(&json!(once)), Some(once));
    }

    #[test]
    fn test_percentage_with_decimals_and_spaces() {
        assert_eq!(normalize_score(&json!(" 45.5 % ")), Some(0.455));
        assert_eq!(normalize_score(&json!("0.5%")), Some(0.005));
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(normalize_score(&json!("0.7")), Some(0.7));
        assert_eq!(normalize_score(&json!("70")), Some(0.7));
    }

    #[test]
    fn test_edges_and_clamping() {
        assert_eq!(normalize_score(&json!(1)), Some(1.0));
        assert_eq!(normalize_score(&json!(100)), Some(1.0));
        assert_eq!(normalize_score(&json!(0)), Some(0.0));
        assert_eq!(normalize_score(&json!(250)), Some(1.0));
        assert_eq!(normalize_score(&json!(-3)), Some(0.0));
    }

    #[test]
    fn test_non_numeric_is_none() {
        assert_eq!(normalize_score(&json!("N/A")), None);
        assert_eq!(normalize_score(&json!(null)), None);
        assert_eq!(normalize_score(&json!({"overall": 1})), None);
        assert_eq!(normalize_score(&json!("%")), None);
    }

    #[test]
    fn test_category_priority() {
        assert_eq!(category_priority("skills"), Some(1));
        assert_eq!(category_priority("Experience"), Some(2));
        assert_eq!(category_priority("completeness"), Some(10));
        assert_eq!(category_priority("professional_development"), None);
    }
}
