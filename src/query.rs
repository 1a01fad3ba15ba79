use unicode_normalization::UnicodeNormalization;

/// Folds diacritics to their base letters ("ação" -> "acao", "Ç" -> "C").
///
/// Decomposes to NFD, drops the Combining Diacritical Marks block and
/// recomposes, so text in scripts without Latin diacritics is left as is.
pub fn fold_diacritics(input: &str) -> String {
    let stripped: String = input
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect();
    stripped.nfc().collect()
}

/// A search engine query built from a free-text topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    topic: String,
    augmentation: String,
}

impl SearchQuery {
    pub fn new(topic: &str, augmentation: &str) -> Self {
        Self {
            topic: fold_diacritics(topic.trim()),
            augmentation: fold_diacritics(augmentation.trim()),
        }
    }

    /// The folded topic, without augmentation.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn augmentation(&self) -> &str {
        &self.augmentation
    }

    /// Query string ready to embed after `q=`: every word percent-encoded
    /// and joined with `+`, augmentation clause last.
    pub fn as_query_param(&self) -> String {
        self.topic
            .split_whitespace()
            .chain(self.augmentation.split_whitespace())
            .map(|word| urlencoding::encode(word).into_owned())
            .collect::<Vec<_>>()
            .join("+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_portuguese_accents() {
        assert_eq!(fold_diacritics("ação"), "acao");
        assert_eq!(fold_diacritics("Inovação em São Paulo"), "Inovacao em Sao Paulo");
        assert_eq!(fold_diacritics("ÇÃÉÍÕÜ"), "CAEIOU");
        assert_eq!(fold_diacritics("notícias"), "noticias");
    }

    #[test]
    fn folding_is_idempotent() {
        for input in ["café com pão", "naïve résumé", "日本語テスト", "plain ascii", "한국어", ""] {
            let once = fold_diacritics(input);
            assert_eq!(fold_diacritics(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn leaves_non_latin_scripts_composed() {
        assert_eq!(fold_diacritics("한국어"), "한국어");
        assert_eq!(fold_diacritics("Москва"), "Москва");
    }

    #[test]
    fn joins_words_with_plus_and_appends_augmentation() {
        let query = SearchQuery::new("energia solar", "blog ou portal de notícias");
        assert_eq!(query.as_query_param(), "energia+solar+blog+ou+portal+de+noticias");
    }

    #[test]
    fn never_emits_encoded_spaces() {
        let query = SearchQuery::new("  inteligência   artificial ", "blog");
        let param = query.as_query_param();
        assert!(!param.contains("%20"));
        assert_eq!(param, "inteligencia+artificial+blog");
    }

    #[test]
    fn encodes_reserved_characters() {
        let query = SearchQuery::new("c++ & rust", "");
        assert_eq!(query.as_query_param(), "c%2B%2B+%26+rust");
    }

    #[test]
    fn empty_topic_still_carries_augmentation() {
        let query = SearchQuery::new("", "blog ou portal de noticias");
        assert_eq!(query.topic(), "");
        assert_eq!(query.as_query_param(), "blog+ou+portal+de+noticias");
    }
}
