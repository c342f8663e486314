//! Region-code conventions for the Korean administrative hierarchy.
//!
//! Policy region codes are 5-digit strings whose leading 2 digits denote the
//! province/metro-city; that prefix is the unit of loose matching. The 17
//! first-level prefixes map to display names below; an unmapped prefix falls
//! back to the raw code.

/// First-level administrative prefixes and their display names.
pub const REGION_PREFIXES: [(&str, &str); 17] = [
    ("11", "서울특별시"),
    ("26", "부산광역시"),
    ("27", "대구광역시"),
    ("28", "인천광역시"),
    ("29", "광주광역시"),
    ("30", "대전광역시"),
    ("31", "울산광역시"),
    ("36", "세종특별자치시"),
    ("41", "경기도"),
    ("42", "강원특별자치도"),
    ("43", "충청북도"),
    ("44", "충청남도"),
    ("45", "전북특별자치도"),
    ("46", "전라남도"),
    ("47", "경상북도"),
    ("48", "경상남도"),
    ("49", "제주특별자치도"),
];

/// Leading 2 digits of a region code, if present.
pub fn region_prefix(code: &str) -> Option<&str> {
    let trimmed = code.trim();
    if trimmed.len() < 2 {
        return None;
    }
    trimmed.get(..2)
}

/// Display name for a 5-digit region code. `"11110"` → `"서울특별시"`;
/// an unmapped code like `"99999"` comes back unchanged.
pub fn region_display_name(code: &str) -> String {
    let trimmed = code.trim();
    match region_prefix(trimmed)
        .and_then(|p| REGION_PREFIXES.iter().find(|(prefix, _)| *prefix == p))
    {
        Some((_, name)) => (*name).to_string(),
        None => trimmed.to_string(),
    }
}

/// Map a user's free-text region ("서울특별시 강서구") to its province
/// prefix by the first two characters of the region name.
pub fn prefix_for_user_region(region: &str) -> Option<&'static str> {
    let head: String = region.trim().chars().take(2).collect();
    let prefix = match head.as_str() {
        "서울" => "11",
        "부산" => "26",
        "대구" => "27",
        "인천" => "28",
        "광주" => "29",
        "대전" => "30",
        "울산" => "31",
        "세종" => "36",
        "경기" => "41",
        "강원" => "42",
        "충북" => "43",
        "충남" => "44",
        "전북" => "45",
        "전남" => "46",
        "경북" => "47",
        "경남" => "48",
        "제주" => "49",
        _ => return None,
    };
    Some(prefix)
}

/// True when any of the comma-separated policy region codes carries the
/// given province prefix.
pub fn any_code_has_prefix(region_codes: &str, prefix: &str) -> bool {
    region_codes
        .split(',')
        .filter_map(region_prefix)
        .any(|p| p == prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_maps_known_prefix() {
        assert_eq!(region_display_name("11110"), "서울특별시");
        assert_eq!(region_display_name("49110"), "제주특별자치도");
    }

    #[test]
    fn display_name_falls_back_to_raw_code() {
        assert_eq!(region_display_name("99999"), "99999");
        assert_eq!(region_display_name("7"), "7");
    }

    #[test]
    fn user_region_maps_to_prefix() {
        assert_eq!(prefix_for_user_region("서울특별시 강서구"), Some("11"));
        assert_eq!(prefix_for_user_region("경기도 수원시"), Some("41"));
        assert_eq!(prefix_for_user_region("somewhere else"), None);
    }

    #[test]
    fn multi_code_prefix_scan() {
        assert!(any_code_has_prefix("41110,11140", "11"));
        assert!(!any_code_has_prefix("26110, 27000", "11"));
    }
}
