use regex::Regex;

/// Year marker the legacy spreadsheets use when nobody knows the year
const UNKNOWN_YEAR_SENTINEL: &str = "desconhecido";

/// Prefix marking a product that is no longer manufactured
const DISCONTINUED_PREFIX: &str = "ITEM DESCONTINUADO";

/// A positional compatibility tuple zipped from a row's parallel lists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompatTuple {
    pub vehicle_name: Option<String>,
    pub start_year: Option<String>,
    pub end_year: Option<String>,
    pub vehicle_type: Option<String>,
    pub brand_name: Option<String>,
}

/// Split a spreadsheet pseudo-list cell into its items
///
/// Cells look like `"[ 'GOL' ; 'UNO' ]"` with every bracket, quote and
/// separator variation the legacy sheets accumulated. Outer brackets and
/// parens are stripped, quotes (straight and curly) removed, items split on
/// runs of `;` or `,`, whitespace trimmed, empties dropped.
pub fn parse_pseudo_list(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let outer = Regex::new(r"^[\[\(\s]*|[\]\)\s]*$").unwrap();
    let stripped = outer.replace_all(raw, "");
    let cleaned: String = stripped
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '‘' | '’' | '“' | '”'))
        .collect();

    let separators = Regex::new(r"[;,]+").unwrap();
    separators
        .split(&cleaned)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Zip the five parallel pseudo-lists positionally
///
/// The sheets do not guarantee equal lengths; shorter lists pad with None
/// instead of truncating the longer ones.
pub fn zip_compat_tuples(
    names: &[String],
    starts: &[String],
    ends: &[String],
    types: &[String],
    brands: &[String],
) -> Vec<CompatTuple> {
    let len = names
        .len()
        .max(starts.len())
        .max(ends.len())
        .max(types.len())
        .max(brands.len());

    (0..len)
        .map(|i| CompatTuple {
            vehicle_name: names.get(i).cloned(),
            start_year: starts.get(i).cloned(),
            end_year: ends.get(i).cloned(),
            vehicle_type: types.get(i).cloned(),
            brand_name: brands.get(i).cloned(),
        })
        .collect()
}

/// Parse a year field; the unknown-year sentinel and anything non-numeric
/// map to None
pub fn normalize_year(raw: Option<&str>) -> Option<i32> {
    let value = raw?.trim();
    if value.is_empty() || value.to_lowercase().starts_with(UNKNOWN_YEAR_SENTINEL) {
        return None;
    }
    value.parse::<i32>().ok()
}

/// Split the discontinued marker off a product name
///
/// `"ITEM DESCONTINUADO - <name>"` becomes `(<name>, false)`; any other
/// name passes through trimmed, flagged as still manufactured.
pub fn split_discontinued(raw_name: &str) -> (String, bool) {
    if let Some((head, tail)) = raw_name.split_once('-') {
        if head.trim() == DISCONTINUED_PREFIX {
            return (tail.trim().to_string(), false);
        }
    }
    (raw_name.trim().to_string(), true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pseudo_list_brackets_and_quotes() {
        assert_eq!(
            parse_pseudo_list("[ '1974' ; '1973' ]"),
            vec!["1974", "1973"]
        );
    }

    #[test]
    fn test_parse_pseudo_list_plain_quotes_and_commas() {
        assert_eq!(parse_pseudo_list("'A','B'"), vec!["A", "B"]);
    }

    #[test]
    fn test_parse_pseudo_list_empty() {
        assert!(parse_pseudo_list("").is_empty());
        assert!(parse_pseudo_list("   ").is_empty());
        assert!(parse_pseudo_list("[]").is_empty());
    }

    #[test]
    fn test_parse_pseudo_list_mixed_separators_and_curly_quotes() {
        assert_eq!(
            parse_pseudo_list("( “GOL” ;; ‘UNO MILLE’ , PALIO )"),
            vec!["GOL", "UNO MILLE", "PALIO"]
        );
    }

    #[test]
    fn test_zip_pads_shorter_lists() {
        let tuples = zip_compat_tuples(
            &["GOL".to_string(), "UNO".to_string()],
            &["1980".to_string()],
            &[],
            &[],
            &["VW".to_string(), "FIAT".to_string()],
        );

        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0].vehicle_name.as_deref(), Some("GOL"));
        assert_eq!(tuples[0].start_year.as_deref(), Some("1980"));
        assert_eq!(tuples[1].vehicle_name.as_deref(), Some("UNO"));
        assert_eq!(tuples[1].start_year, None);
        assert_eq!(tuples[1].brand_name.as_deref(), Some("FIAT"));
    }

    #[test]
    fn test_normalize_year() {
        assert_eq!(normalize_year(Some("1974")), Some(1974));
        assert_eq!(normalize_year(Some(" 1990 ")), Some(1990));
        assert_eq!(normalize_year(Some("desconhecido")), None);
        assert_eq!(normalize_year(Some("Desconhecido")), None);
        assert_eq!(normalize_year(Some("19XX")), None);
        assert_eq!(normalize_year(Some("")), None);
        assert_eq!(normalize_year(None), None);
    }

    #[test]
    fn test_split_discontinued_prefix() {
        let (name, manufactured) = split_discontinued("ITEM DESCONTINUADO - Bomba d'agua");

        assert_eq!(name, "Bomba d'agua");
        assert!(!manufactured);
    }

    #[test]
    fn test_split_discontinued_keeps_ordinary_names() {
        let (name, manufactured) = split_discontinued("Filtro - Premium");

        assert_eq!(name, "Filtro - Premium");
        assert!(manufactured);
    }
}
