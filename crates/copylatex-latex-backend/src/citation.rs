//! Template-driven citation rendering.

use serde::{Deserialize, Serialize};

/// Which LaTeX command wraps a `[[@key]]` citation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiteCommand {
    Basic,
    #[default]
    Autocite,
    Parencite,
    /// Context-sensitive rendering through [`CitationTemplates`].
    Extended,
}

impl CiteCommand {
    /// Command name for the fixed variants; `None` for `Extended`.
    pub fn command_name(self) -> Option<&'static str> {
        match self {
            CiteCommand::Basic => Some("cite"),
            CiteCommand::Autocite => Some("autocite"),
            CiteCommand::Parencite => Some("parencite"),
            CiteCommand::Extended => None,
        }
    }
}

/// How a citation sits in the surrounding prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationContext {
    /// `go see [[@ref]] for some stuff`
    Bare,
    /// `a big thing (e.g. [[@ref]] p.37)`
    Surrounded,
    /// `something large (e.g. [[@ref]])`
    Pre,
    /// `some things from the book ([[@ref]], p.37)`
    Post,
    /// `some things from Author ([[@ref]])`
    Paren,
}

impl CitationContext {
    pub const ALL: [CitationContext; 5] = [
        CitationContext::Bare,
        CitationContext::Paren,
        CitationContext::Pre,
        CitationContext::Post,
        CitationContext::Surrounded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CitationContext::Bare => "bare",
            CitationContext::Surrounded => "surrounded",
            CitationContext::Pre => "pre",
            CitationContext::Post => "post",
            CitationContext::Paren => "paren",
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            CitationContext::Bare => "Bare citation: `... is clearly shown [[@foo]].`",
            CitationContext::Paren => "Parenthetical: `Author ([[@ref]]) says...`",
            CitationContext::Pre => "Pre-text: `some people (e.g. [[@ref]]) say ...`",
            CitationContext::Post => "Post-text: `... from the book ([[@ref]] p.29)`",
            CitationContext::Surrounded => {
                "Pre and post: `can find examples (e.g. [[@ref]] p.29)`"
            }
        }
    }
}

/// Classify a citation from the prose the annotator attached to it.
///
/// An empty string is not the same as an absent value: `Some("")` on both
/// sides falls through to [`CitationContext::Paren`].
pub fn classify(pre: Option<&str>, post: Option<&str>) -> CitationContext {
    let has_pre = pre.is_some_and(|p| !p.is_empty());
    let has_post = post.is_some_and(|p| !p.is_empty());
    match (pre, post) {
        (None, None) => CitationContext::Bare,
        _ if has_pre && has_post => CitationContext::Surrounded,
        _ if has_pre => CitationContext::Pre,
        _ if has_post => CitationContext::Post,
        _ => CitationContext::Paren,
    }
}

/// One template per [`CitationContext`], using `#id`, `#pre` and `#post`
/// placeholders. Templates missing from a settings file fall back to the
/// `Default` preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationTemplates {
    pub bare: String,
    pub surrounded: String,
    pub pre: String,
    pub post: String,
    pub paren: String,
}

impl CitationTemplates {
    pub fn new(
        bare: impl Into<String>,
        surrounded: impl Into<String>,
        pre: impl Into<String>,
        post: impl Into<String>,
        paren: impl Into<String>,
    ) -> Self {
        Self {
            bare: bare.into(),
            surrounded: surrounded.into(),
            pre: pre.into(),
            post: post.into(),
            paren: paren.into(),
        }
    }

    pub fn get(&self, context: CitationContext) -> &str {
        match context {
            CitationContext::Bare => &self.bare,
            CitationContext::Surrounded => &self.surrounded,
            CitationContext::Pre => &self.pre,
            CitationContext::Post => &self.post,
            CitationContext::Paren => &self.paren,
        }
    }

    pub fn preset(preset: TemplatePreset) -> Self {
        match preset {
            TemplatePreset::Default => Self::new(
                "\\cite{#id}",
                "\\cite[#pre][#post]{#id}",
                "\\cite[#pre][]{#id}",
                "\\cite[#post]{#id}",
                "\\cite{#id}",
            ),
            TemplatePreset::Autocite => Self::new(
                "\\autocite{#id}",
                "\\autocite[#pre][#post]{#id}",
                "\\autocite[#pre][]{#id}",
                "\\autocite[#post]{#id}",
                "\\citeyear{#id}",
            ),
            TemplatePreset::Natbib => Self::new(
                "\\citep{#id}",
                "\\cite[#pre][#post]{#id}",
                "\\cite[#pre][]{#id}",
                "\\cite[#post]{#id}",
                "\\citet{#id}",
            ),
            TemplatePreset::BruteForce => Self::new(
                "\\cite{#id}",
                "(#pre \\cite{#id} #post)",
                "(#pre \\cite{#id})",
                "(\\cite{#id} #post)",
                "(\\cite{#id})",
            ),
            TemplatePreset::Testing => Self::new(
                "\\cite{#id} BARE",
                "(#pre \\cite{#id} #post) SURR",
                "(#pre \\cite{#id}) PRE",
                "(\\cite{#id} #post) POST",
                "\\cite{#id} PAREN",
            ),
        }
    }
}

impl Default for CitationTemplates {
    fn default() -> Self {
        Self::preset(TemplatePreset::Default)
    }
}

/// Named template sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatePreset {
    Default,
    Autocite,
    Natbib,
    BruteForce,
    Testing,
}

impl TemplatePreset {
    pub const ALL: [TemplatePreset; 5] = [
        TemplatePreset::Default,
        TemplatePreset::Autocite,
        TemplatePreset::Natbib,
        TemplatePreset::BruteForce,
        TemplatePreset::Testing,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TemplatePreset::Default => "Default",
            TemplatePreset::Autocite => "Autocite",
            TemplatePreset::Natbib => "Natbib",
            TemplatePreset::BruteForce => "Brute-Force",
            TemplatePreset::Testing => "Testing",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(wanted))
    }
}

/// Fill the template registered for `context`.
///
/// Each placeholder is replaced once, in the order `#id`, `#pre`, `#post`.
/// Placeholders missing from the template are simply not substituted.
pub fn render_citation(
    key: &str,
    pre: Option<&str>,
    post: Option<&str>,
    context: CitationContext,
    templates: &CitationTemplates,
) -> String {
    templates
        .get(context)
        .replacen("#id", key, 1)
        .replacen("#pre", pre.unwrap_or(""), 1)
        .replacen("#post", post.unwrap_or(""), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        assert_eq!(classify(None, None), CitationContext::Bare);
        assert_eq!(
            classify(Some("e.g."), Some("p.37")),
            CitationContext::Surrounded
        );
        assert_eq!(classify(Some("e.g."), None), CitationContext::Pre);
        assert_eq!(classify(None, Some("p.37")), CitationContext::Post);
        assert_eq!(classify(Some(""), Some("")), CitationContext::Paren);
    }

    #[test]
    fn one_sided_empty_falls_back_to_paren() {
        assert_eq!(classify(Some(""), None), CitationContext::Paren);
        assert_eq!(classify(None, Some("")), CitationContext::Paren);
        assert_eq!(classify(Some("e.g."), Some("")), CitationContext::Pre);
    }

    #[test]
    fn renders_surrounded_template() {
        let templates = CitationTemplates::default();
        let out = render_citation(
            "smith",
            Some("e.g."),
            Some("p.37"),
            CitationContext::Surrounded,
            &templates,
        );
        assert_eq!(out, "\\cite[e.g.][p.37]{smith}");
    }

    #[test]
    fn substitutes_only_first_occurrence() {
        let templates = CitationTemplates::new("#id #id", "", "", "", "");
        let out = render_citation("k", None, None, CitationContext::Bare, &templates);
        assert_eq!(out, "k #id");
    }

    #[test]
    fn missing_placeholders_are_left_alone() {
        let templates = CitationTemplates::new("\\nocite", "", "", "", "");
        let out = render_citation("k", Some("a"), Some("b"), CitationContext::Bare, &templates);
        assert_eq!(out, "\\nocite");
    }

    #[test]
    fn preset_lookup_ignores_case() {
        assert_eq!(
            TemplatePreset::from_name("brute-force"),
            Some(TemplatePreset::BruteForce)
        );
        assert_eq!(TemplatePreset::from_name("chicago"), None);
        let natbib = CitationTemplates::preset(TemplatePreset::Natbib);
        assert_eq!(natbib.paren, "\\citet{#id}");
    }
}
