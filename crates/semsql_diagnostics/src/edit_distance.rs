//! Case-insensitive Damerau-Levenshtein distance, hand-rolled since the
//! catalogs compared are short identifier lists, not a case that justifies
//! a dependency.

/// Restricted (optimal string alignment) Damerau-Levenshtein distance:
/// insertions, deletions, substitutions and adjacent transpositions, each
/// costing 1. Comparison is case-insensitive.
pub fn damerau_levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_ascii_lowercase().chars().collect();
    let b: Vec<char> = b.to_ascii_lowercase().chars().collect();
    let (n, m) = (a.len(), b.len());

    let mut d = vec![vec![0usize; m + 1]; n + 1];
    for (i, row) in d.iter_mut().enumerate().take(n + 1) {
        row[0] = i;
    }
    for j in 0..=m {
        d[0][j] = j;
    }

    for i in 1..=n {
        for j in 1..=m {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            d[i][j] = (d[i - 1][j] + 1).min(d[i][j - 1] + 1).min(d[i - 1][j - 1] + cost);

            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d[i][j] = d[i][j].min(d[i - 2][j - 2] + 1);
            }
        }
    }

    d[n][m]
}

/// Ranks `catalog` by distance to `target`, returning up to `limit` names.
/// Ties are broken by shorter name, then lexicographic order, per
/// `spec.md` §4.9.
pub fn closest_matches(target: &str, catalog: &[String], limit: usize) -> Vec<String> {
    let mut scored: Vec<(usize, &String)> =
        catalog.iter().map(|name| (damerau_levenshtein(target, name), name)).collect();
    scored.sort_by(|(da, a), (db, b)| {
        da.cmp(db).then_with(|| a.len().cmp(&b.len())).then_with(|| a.cmp(b))
    });
    scored.into_iter().take(limit).map(|(_, name)| name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_have_zero_distance() {
        assert_eq!(damerau_levenshtein("vendor", "VENDOR"), 0);
    }

    #[test]
    fn adjacent_transposition_costs_one() {
        assert_eq!(damerau_levenshtein("vendor", "vendro"), 1);
    }

    #[test]
    fn closest_matches_breaks_ties_by_length_then_lexicographic() {
        let catalog = vec!["vendorz".to_string(), "venda".to_string(), "vendb".to_string()];
        let matches = closest_matches("vendo", &catalog, 2);
        assert_eq!(matches, vec!["venda".to_string(), "vendb".to_string()]);
    }
}
