//! Filename convention parsing.
//!
//! Integration pages are named `<source>-para-<target>[-<platform>].html`,
//! e.g. `facebook-ads-para-google-sheets-n8n.html`. Files that do not follow
//! the convention are still valid documents; they just have no service pair.

use regex::Regex;

use pagesmith_shared::{PagesmithError, Result};

/// Connector word between the two services in a filename.
pub const CONNECTOR: &str = "para";

/// The `(source, target)` services encoded in a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePair {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl ServicePair {
    /// True when the filename followed the convention.
    pub fn is_known(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }
}

/// Compiled filename pattern for a set of platform tags.
#[derive(Debug, Clone)]
pub struct SlugParser {
    pair: Regex,
    platform_suffix: Option<Regex>,
}

impl SlugParser {
    /// Build a parser accepting any of `platform_tags` as an optional trailing tag.
    pub fn new(platform_tags: &[String]) -> Result<Self> {
        let tags: Vec<String> = platform_tags
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| regex::escape(t))
            .collect();

        let (pair, platform_suffix) = if tags.is_empty() {
            (format!("^(.+?)-{CONNECTOR}-(.+?)$"), None)
        } else {
            let alternation = tags.join("|");
            (
                format!("^(.+?)-{CONNECTOR}-(.+?)(?:-(?:{alternation}))?$"),
                Some(format!("-(?:{alternation})$")),
            )
        };

        let pair = Regex::new(&pair)
            .map_err(|e| PagesmithError::config(format!("invalid slug pattern: {e}")))?;
        let platform_suffix = platform_suffix
            .map(|p| Regex::new(&p))
            .transpose()
            .map_err(|e| PagesmithError::config(format!("invalid platform tag pattern: {e}")))?;

        Ok(Self {
            pair,
            platform_suffix,
        })
    }

    /// Extract the service pair from a filename. Never fails; mismatches yield `None`s.
    pub fn parse(&self, filename: &str) -> ServicePair {
        let stem = file_stem(filename);
        match self.pair.captures(stem) {
            Some(caps) => ServicePair {
                source: Some(caps[1].trim().to_string()),
                target: Some(caps[2].trim().to_string()),
            },
            None => ServicePair::default(),
        }
    }

    /// Human title for a page: `"Facebook Ads para Google Sheets"`, or the
    /// humanized stem when the filename has no service pair.
    pub fn display_title(&self, filename: &str) -> String {
        let pair = self.parse(filename);
        match (pair.source, pair.target) {
            (Some(source), Some(target)) => {
                format!("{} {CONNECTOR} {}", humanize(&source), humanize(&target))
            }
            _ => humanize(self.strip_platform_tag(file_stem(filename))),
        }
    }

    fn strip_platform_tag<'a>(&self, stem: &'a str) -> &'a str {
        match &self.platform_suffix {
            Some(re) => match re.find(stem) {
                Some(m) if m.start() > 0 => &stem[..m.start()],
                _ => stem,
            },
            None => stem,
        }
    }
}

impl Default for SlugParser {
    fn default() -> Self {
        Self::new(&["n8n".to_string()]).expect("default platform tag is a valid pattern")
    }
}

/// `"facebook-ads"` → `"Facebook Ads"`.
pub fn humanize(slug: &str) -> String {
    slug.split('-')
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// File name without directories or the `.html`/`.htm` extension.
pub fn file_stem(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".html") {
        &name[..name.len() - 5]
    } else if lower.ends_with(".htm") {
        &name[..name.len() - 4]
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pair_with_platform_tag() {
        let parser = SlugParser::default();
        let pair = parser.parse("facebook-ads-para-google-sheets-n8n.html");
        assert_eq!(pair.source.as_deref(), Some("facebook-ads"));
        assert_eq!(pair.target.as_deref(), Some("google-sheets"));
        assert!(pair.is_known());
    }

    #[test]
    fn parses_pair_without_platform_tag() {
        let pair = SlugParser::default().parse("slack-para-trello.html");
        assert_eq!(pair.source.as_deref(), Some("slack"));
        assert_eq!(pair.target.as_deref(), Some("trello"));
    }

    #[test]
    fn mismatch_yields_nothing() {
        let pair = SlugParser::default().parse("about-us.html");
        assert_eq!(pair, ServicePair::default());
        assert!(!pair.is_known());
    }

    #[test]
    fn ignores_directories() {
        let pair = SlugParser::default().parse("integracoes/hubspot-para-slack-n8n.html");
        assert_eq!(pair.source.as_deref(), Some("hubspot"));
        assert_eq!(pair.target.as_deref(), Some("slack"));
    }

    #[test]
    fn custom_platform_tags() {
        let parser = SlugParser::new(&["make".into(), "zapier".into()]).unwrap();
        let pair = parser.parse("gmail-para-notion-zapier.html");
        assert_eq!(pair.target.as_deref(), Some("notion"));
        // n8n is no longer a tag, so it stays part of the target.
        let pair = parser.parse("gmail-para-notion-n8n.html");
        assert_eq!(pair.target.as_deref(), Some("notion-n8n"));
    }

    #[test]
    fn humanize_capitalizes_tokens() {
        assert_eq!(humanize("facebook-ads"), "Facebook Ads");
        assert_eq!(humanize("whatsapp"), "Whatsapp");
        assert_eq!(humanize("ótimo-crm"), "Ótimo Crm");
        assert_eq!(humanize(""), "");
    }

    #[test]
    fn display_title_for_pair_and_plain_names() {
        let parser = SlugParser::default();
        assert_eq!(
            parser.display_title("facebook-ads-para-google-sheets-n8n.html"),
            "Facebook Ads para Google Sheets"
        );
        assert_eq!(parser.display_title("email-marketing-n8n.html"), "Email Marketing");
        assert_eq!(parser.display_title("index.html"), "Index");
    }

    #[test]
    fn file_stem_strips_extension() {
        assert_eq!(file_stem("a/b/page.HTML"), "page");
        assert_eq!(file_stem("page.htm"), "page");
        assert_eq!(file_stem("page"), "page");
    }
}
