// Fuzzy matching for suggestion candidates

/// Levenshtein distance between two strings, counted in characters
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// How well a candidate matches typed text; lower is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchRank {
    Exact,
    Prefix,
    Substring,
    /// Within edit distance of the typed text
    Near(usize),
}

/// Rank one candidate against typed text (case-insensitive)
pub fn rank(query: &str, candidate: &str, max_distance: usize) -> Option<MatchRank> {
    let query = query.to_lowercase();
    let candidate = candidate.to_lowercase();

    if query.is_empty() || candidate == query {
        return Some(MatchRank::Exact);
    }
    if candidate.starts_with(&query) {
        return Some(MatchRank::Prefix);
    }
    if candidate.contains(&query) {
        return Some(MatchRank::Substring);
    }
    let distance = levenshtein_distance(&query, &candidate);
    (distance <= max_distance).then_some(MatchRank::Near(distance))
}

/// Candidates matching `query`, best first, at most `limit` of them
///
/// Ties keep the order the candidates were given in.
pub fn find_near_matches<'a>(
    query: &str,
    candidates: &'a [String],
    max_distance: usize,
    limit: usize,
) -> Vec<&'a str> {
    let mut matches: Vec<(MatchRank, usize, &str)> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            rank(query, candidate, max_distance).map(|rank| (rank, index, candidate.as_str()))
        })
        .collect();

    matches.sort();
    matches.into_iter().take(limit).map(|(_, _, candidate)| candidate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("", ""), 0);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_rank() {
        assert_eq!(rank("Host", "host", 2), Some(MatchRank::Exact));
        assert_eq!(rank("ho", "hostname", 2), Some(MatchRank::Prefix));
        assert_eq!(rank("name", "hostname", 2), Some(MatchRank::Substring));
        assert_eq!(rank("hsot", "host", 2), Some(MatchRank::Near(2)));
        assert_eq!(rank("xyz", "host", 2), None);
    }

    #[test]
    fn test_find_near_matches() {
        let candidates = names(&["service", "host", "hostgroup", "state", "ghost"]);
        assert_eq!(find_near_matches("host", &candidates, 1, 10), vec!["host", "hostgroup", "ghost"]);
        assert_eq!(find_near_matches("", &candidates, 1, 2), vec!["service", "host"]);
        assert!(find_near_matches("zzzz", &candidates, 1, 10).is_empty());
    }
}
