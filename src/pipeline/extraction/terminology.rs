//! Colloquial → clinical term normalization.
//!
//! Exact-match lookup only; anything not in the table passes through
//! unchanged. Keys are lowercase.

/// Sorted by key for binary search.
const TERMINOLOGY: &[(&str, &str)] = &[
    ("belly ache", "abdominal pain"),
    ("cold", "upper respiratory infection"),
    ("common cold", "upper respiratory infection"),
    ("constipated", "constipation"),
    ("drip", "intravenous infusion"),
    ("flu", "influenza"),
    ("high blood pressure", "hypertension"),
    ("high temperature", "fever"),
    ("injection", "injection therapy"),
    ("iv drip", "intravenous infusion"),
    ("running a temperature", "fever"),
    ("shot", "injection therapy"),
    ("stomach ache", "abdominal pain"),
    ("the runs", "diarrhea"),
    ("throwing up", "vomiting"),
    ("tummy ache", "abdominal pain"),
    ("便秘", "排便困难"),
    ("发烧", "发热"),
    ("感冒", "上呼吸道感染"),
    ("打针", "注射治疗"),
    ("拉肚子", "腹泻"),
    ("挂水", "静脉输液"),
];

/// Standardize a term; unmapped terms are returned as given.
pub fn standardize(term: &str) -> String {
    let lower = term.trim().to_lowercase();
    match TERMINOLOGY.binary_search_by(|(k, _)| (*k).cmp(lower.as_str())) {
        Ok(idx) => TERMINOLOGY[idx].1.to_string(),
        Err(_) => term.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_colloquial_terms() {
        assert_eq!(standardize("stomach ache"), "abdominal pain");
        assert_eq!(standardize("the runs"), "diarrhea");
        assert_eq!(standardize("High Blood Pressure"), "hypertension");
        assert_eq!(standardize("感冒"), "上呼吸道感染");
        assert_eq!(standardize("发烧"), "发热");
    }

    #[test]
    fn unmapped_terms_pass_through() {
        assert_eq!(standardize("headache"), "headache");
        assert_eq!(standardize("Headache"), "Headache");
        assert_eq!(standardize("头痛"), "头痛");
        assert_eq!(standardize(""), "");
    }

    #[test]
    fn exact_match_only() {
        assert_eq!(standardize("bad stomach ache"), "bad stomach ache");
    }

    #[test]
    fn terminology_sorted() {
        for window in TERMINOLOGY.windows(2) {
            assert!(
                window[0].0 < window[1].0,
                "TERMINOLOGY not sorted: {:?} >= {:?}",
                window[0].0,
                window[1].0
            );
        }
    }
}
