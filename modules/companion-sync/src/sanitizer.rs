use tracing::info;

use crate::types::{BannedKeyword, PublishedCompanion};

/// Strip banned tokens from each companion's keywords.
///
/// Tokens are applied in list order and each removes only its first
/// occurrence as a plain substring, so overlapping tokens depend on order.
/// Returns the number of removals.
pub fn scrub_keywords(roster: &mut [PublishedCompanion], banned: &[BannedKeyword]) -> usize {
    let mut removed = 0;
    for keyword in banned {
        for companion in roster.iter_mut() {
            let Some(text) = companion.keywords.as_mut() else {
                continue;
            };
            if text.contains(keyword.token.as_str()) {
                info!(
                    keyword = keyword.token.as_str(),
                    companion = companion.name.as_str(),
                    "Removed banned keyword"
                );
                *text = text.replacen(keyword.token.as_str(), "", 1);
                removed += 1;
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn companion(name: &str, keywords: Option<&str>) -> PublishedCompanion {
        PublishedCompanion {
            id: name.to_string(),
            name: name.to_string(),
            url: None,
            services: vec![],
            race: vec![],
            gender: vec![],
            catersto: vec![],
            age: vec![],
            body_type: vec![],
            height: vec![],
            tattoos: vec![],
            body_hair: vec![],
            tagline: None,
            keywords: keywords.map(String::from),
            location: vec![],
        }
    }

    fn banned(tokens: &[&str]) -> Vec<BannedKeyword> {
        tokens
            .iter()
            .map(|t| BannedKeyword { token: t.to_string() })
            .collect()
    }

    #[test]
    fn removes_first_occurrence_only() {
        let mut roster = vec![companion("a", Some("cheap, fun, cheap"))];
        let removed = scrub_keywords(&mut roster, &banned(&["cheap"]));

        assert_eq!(removed, 1);
        assert_eq!(roster[0].keywords.as_deref(), Some(", fun, cheap"));
    }

    #[test]
    fn substring_match_ignores_word_boundaries() {
        let mut roster = vec![companion("a", Some("sunset walks"))];
        scrub_keywords(&mut roster, &banned(&["sun"]));
        assert_eq!(roster[0].keywords.as_deref(), Some("set walks"));
    }

    #[test]
    fn overlapping_tokens_follow_list_order() {
        let mut first = vec![companion("a", Some("xabcx"))];
        scrub_keywords(&mut first, &banned(&["ab", "abc"]));
        assert_eq!(first[0].keywords.as_deref(), Some("xcx"));

        let mut reversed = vec![companion("a", Some("xabcx"))];
        scrub_keywords(&mut reversed, &banned(&["abc", "ab"]));
        assert_eq!(reversed[0].keywords.as_deref(), Some("xx"));
    }

    #[test]
    fn null_keywords_untouched() {
        let mut roster = vec![companion("a", None), companion("b", Some("kind"))];
        let removed = scrub_keywords(&mut roster, &banned(&["kind"]));

        assert_eq!(removed, 1);
        assert_eq!(roster[0].keywords, None);
        assert_eq!(roster[1].keywords.as_deref(), Some(""));
    }
}
