/// Ordinal scores for analyst rating labels. Labels not listed score 0.
const RATING_SCALE: &[(&str, i32)] = &[
    ("Strong-Buy", 2),
    ("Outperform", 2),
    ("Market Outperform", 2),
    ("Sector Outperform", 2),
    ("Buy", 1),
    ("Overweight", 1),
    ("Equal Weight", 0),
    ("Market Perform", 0),
    ("Sector Perform", 0),
    ("Hold", 0),
    ("Unchanged", 0),
    ("Underweight", -1),
    ("Sell", -1),
    ("Underperform", -2),
];

pub fn rating_score(label: &str) -> i32 {
    let label = label.trim();
    RATING_SCALE
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

/// Score change implied by moving from one rating to another.
pub fn rating_delta(rating_from: &str, rating_to: &str) -> i32 {
    rating_score(rating_to) - rating_score(rating_from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_known_labels() {
        assert_eq!(rating_score("Strong-Buy"), 2);
        assert_eq!(rating_score("Sector Outperform"), 2);
        assert_eq!(rating_score("Overweight"), 1);
        assert_eq!(rating_score("Hold"), 0);
        assert_eq!(rating_score(" Sell "), -1);
        assert_eq!(rating_score("Underperform"), -2);
    }

    #[test]
    fn unknown_labels_score_zero() {
        assert_eq!(rating_score("N/A"), 0);
        assert_eq!(rating_score("buy"), 0);
        assert_eq!(rating_delta("N/A", "Buy"), 1);
        assert_eq!(rating_delta("Underperform", "N/A"), 2);
    }

    #[test]
    fn delta_is_to_minus_from() {
        assert_eq!(rating_delta("Sell", "Buy"), 2);
        assert_eq!(rating_delta("Outperform", "Underperform"), -4);
        assert_eq!(rating_delta("Hold", "Hold"), 0);
    }
}
