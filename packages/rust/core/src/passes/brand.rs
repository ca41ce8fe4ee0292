//! Legacy brand replacement over raw markup.
//!
//! Runs before parsing so that tokens in attributes, scripts and comments are
//! rewritten along with visible text.

use std::borrow::Cow;

use regex::{NoExpand, Regex, RegexBuilder};

use pagesmith_shared::{PagesmithError, Result};

/// Case-insensitive rewriter from every legacy token to the canonical brand.
#[derive(Debug, Clone)]
pub struct BrandRewriter {
    pattern: Option<Regex>,
    brand: String,
}

impl BrandRewriter {
    /// Compile `tokens` into a single alternation. Longer tokens are tried
    /// first so that `"AI Factory"` wins over a shorter overlapping token.
    pub fn new(tokens: &[String], brand: &str) -> Result<Self> {
        let mut tokens: Vec<&str> = tokens
            .iter()
            .map(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        tokens.dedup();

        let pattern = if tokens.is_empty() {
            None
        } else {
            let alternation = tokens
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let re = RegexBuilder::new(&alternation)
                .case_insensitive(true)
                .build()
                .map_err(|e| PagesmithError::config(format!("invalid legacy brand token: {e}")))?;
            Some(re)
        };

        Ok(Self {
            pattern,
            brand: brand.to_string(),
        })
    }

    /// Canonical brand name.
    pub fn brand(&self) -> &str {
        &self.brand
    }

    /// Replace every legacy token in `text`. Borrows when nothing matched.
    pub fn rewrite<'t>(&self, text: &'t str) -> (Cow<'t, str>, bool) {
        match &self.pattern {
            Some(re) if re.is_match(text) => (re.replace_all(text, NoExpand(&self.brand)), true),
            _ => (Cow::Borrowed(text), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> BrandRewriter {
        let tokens = [
            "AI Factory",
            "AIfactory",
            "ai-factory",
            "fabrica-n8n",
            "Fábrica de Automações",
        ]
        .map(String::from);
        BrandRewriter::new(&tokens, "Automations Cookbook").unwrap()
    }

    #[test]
    fn replaces_every_token_case_insensitively() {
        let (out, changed) = rewriter().rewrite(
            r#"<title>x | ai factory</title><a class="AIFACTORY" href="https://fabrica-n8n.io">FÁBRICA DE AUTOMAÇÕES</a>"#,
        );
        assert!(changed);
        assert_eq!(
            out,
            r#"<title>x | Automations Cookbook</title><a class="Automations Cookbook" href="https://Automations Cookbook.io">Automations Cookbook</a>"#
        );
    }

    #[test]
    fn second_rewrite_is_a_no_op() {
        let r = rewriter();
        let (once, _) = r.rewrite("Welcome to AI Factory");
        let (twice, changed) = r.rewrite(&once);
        assert!(!changed);
        assert_eq!(once, twice);
        assert!(matches!(twice, Cow::Borrowed(_)));
    }

    #[test]
    fn brand_with_dollar_sign_is_literal() {
        let r = BrandRewriter::new(&["old".into()], "$1 Co").unwrap();
        assert_eq!(r.rewrite("old").0, "$1 Co");
    }

    #[test]
    fn no_tokens_means_no_changes() {
        let r = BrandRewriter::new(&[], "Brand").unwrap();
        let (out, changed) = r.rewrite("AI Factory");
        assert!(!changed);
        assert_eq!(out, "AI Factory");
    }
}
