//! Document tree to LaTeX backend.

pub mod citation;

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};

use copylatex_ir::{Alignment, CodeBlock, Image, InternalLink, Node, Span, Table};

pub use citation::{
    classify, render_citation, CitationContext, CitationTemplates, CiteCommand, TemplatePreset,
};

/// Containers nested deeper than this are flattened to escaped text.
pub const MAX_RENDER_DEPTH: usize = 256;

/// Indent level used for the content of a blockquote.
const BLOCKQUOTE_INDENT: usize = 4;

lazy_static! {
    static ref TRAILING_LABEL: Regex = Regex::new(r"\^([A-Za-z0-9_:\-]*)\s*$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionSettings {
    /// Delimiter for `\lstinline`; empty means braces.
    pub inline_delimiter: String,
    pub minted_listings: bool,
    pub cite_command: CiteCommand,
    pub citation_templates: CitationTemplates,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            inline_delimiter: String::new(),
            minted_listings: false,
            cite_command: CiteCommand::default(),
            citation_templates: CitationTemplates::default(),
        }
    }
}

/// Render a whole tree starting at indent level 0.
pub fn render_document(node: &Node, settings: &ConversionSettings) -> String {
    render_node(node, settings, 0)
}

pub fn render_node(node: &Node, settings: &ConversionSettings, indent: usize) -> String {
    render_at(node, settings, indent, 0)
}

fn render_at(node: &Node, settings: &ConversionSettings, indent: usize, depth: usize) -> String {
    if depth > MAX_RENDER_DEPTH {
        return escape_latex(&node.plain_text());
    }
    let depth = depth + 1;
    match node {
        Node::Root(children) => render_joined(children, settings, indent, depth, "\n"),
        Node::Paragraph(children) => {
            let mut out = render_joined(children, settings, indent, depth, "");
            out.push('\n');
            out
        }
        Node::Emphasis(children) => wrap_command("emph", children, settings, indent, depth),
        Node::Strong(children) => wrap_command("textbf", children, settings, indent, depth),
        Node::Strikethrough(children) => wrap_command("st", children, settings, indent, depth),
        Node::Footnote(children) => wrap_command("footnote", children, settings, indent, depth),
        Node::List { ordered, items } => render_list(*ordered, items, settings, indent, depth),
        Node::ListItem(children) => {
            let mut out = tabs(indent);
            out.push_str("\\item ");
            out.push_str(&render_joined(children, settings, indent, depth, ""));
            out
        }
        Node::Heading { depth: level, content } => {
            render_heading(*level, content, settings, indent, depth)
        }
        Node::InternalLink(link) => render_internal_link(link, settings),
        Node::ExternalLink { url, content } => render_external_link(url, content),
        Node::CodeBlock(code) => render_code_block(code, settings),
        Node::InlineCode(value) => render_inline_code(value, settings),
        Node::InlineMath { value, span } => render_inline_math(value, *span),
        Node::DisplayMath(value) => format!("$$\n{}\n$$", value),
        Node::Image(image) => render_image(image),
        Node::Blockquote(children) => {
            let mut out = String::from("\\begin{displayquote}\n");
            let body = render_joined(children, settings, BLOCKQUOTE_INDENT, depth, "");
            // Trailing whitespace of the body is kept as is.
            out.push_str(&body);
            out.push_str("\\end{displayquote}\n");
            out
        }
        Node::Table(table) => render_table(table, settings, indent, depth),
        Node::TableRow(children) | Node::TableCell(children) => {
            render_joined(children, settings, indent, depth, "")
        }
        Node::Text(value) => render_leaf(Some(value.as_str())),
        Node::Other { value, .. } => render_leaf(value.as_deref()),
    }
}

fn render_joined(
    children: &[Node],
    settings: &ConversionSettings,
    indent: usize,
    depth: usize,
    separator: &str,
) -> String {
    children
        .iter()
        .map(|child| render_at(child, settings, indent, depth))
        .collect::<Vec<_>>()
        .join(separator)
}

fn wrap_command(
    cmd: &str,
    children: &[Node],
    settings: &ConversionSettings,
    indent: usize,
    depth: usize,
) -> String {
    format!(
        "\\{}{{{}}}",
        cmd,
        render_joined(children, settings, indent, depth, "")
    )
}

fn tabs(indent: usize) -> String {
    "\t".repeat(indent)
}

/// Fallback for text and unrecognised nodes.
///
/// A value ending in `^name` renders as `\label{name}` and anything before
/// the caret in the same leaf is dropped.
fn render_leaf(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    if let Some(caps) = TRAILING_LABEL.captures(value) {
        return format!("\\label{{{}}}", &caps[1]);
    }
    escape_latex(value)
}

/// Escape LaTeX special characters in free text.
///
/// Every character is mapped at most once, so the output of one rule is
/// never re-escaped by another. Calling this twice corrupts the text.
pub fn escape_latex(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '&' => out.push_str("\\&"),
            '%' => out.push_str("\\%"),
            '$' => out.push_str("\\$"),
            '#' => out.push_str("\\#"),
            '_' => out.push_str("\\_"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_heading(
    level: u8,
    content: &[Node],
    settings: &ConversionSettings,
    indent: usize,
    depth: usize,
) -> String {
    let cmd = match level {
        0 | 1 => "section",
        2 => "subsection",
        _ => "subsubsection",
    };
    let body = content
        .first()
        .map(|child| render_at(child, settings, indent, depth))
        .unwrap_or_default();
    format!("\\{}{{{}}}\n\\label{{sec:{}}}\n", cmd, body, body)
}

fn render_list(
    ordered: bool,
    items: &[Node],
    settings: &ConversionSettings,
    indent: usize,
    depth: usize,
) -> String {
    let env = if ordered { "enumerate" } else { "itemize" };
    let mut out = String::new();
    out.push_str(&format!("{}\\begin{{{}}}\n", tabs(indent), env));
    out.push_str(&render_joined(items, settings, indent + 1, depth, ""));
    out.push_str(&format!("{}\\end{{{}}}\n", tabs(indent), env));
    out
}

fn render_internal_link(link: &InternalLink, settings: &ConversionSettings) -> String {
    if let Some(key) = link.citation_key() {
        return match settings.cite_command.command_name() {
            Some(cmd) => format!("\\{}{{{}}}", cmd, key),
            None => {
                let pre = link.pre.as_deref();
                let post = link.post.as_deref();
                render_citation(
                    key,
                    pre,
                    post,
                    classify(pre, post),
                    &settings.citation_templates,
                )
            }
        };
    }
    if let Some(target) = link.value.strip_prefix('^') {
        return format!("\\ref{{{}}}", target);
    }
    link.value.clone()
}

fn render_external_link(url: &str, content: &[Node]) -> String {
    let title = content.first().map(Node::plain_text).unwrap_or_default();

    if let Some(key) = title.strip_prefix('@') {
        return format!("\\cite{{{}}}", key);
    }
    if let Some(macro_name) = title.strip_prefix('!') {
        return format!("\\{}", macro_name);
    }
    if let Some(anchor) = url.strip_prefix('#') {
        let escaped_title = escape_latex(&title);
        return match anchor {
            "code" => format!("{}\\autoref{{code:{}}}", escaped_title, title),
            "fig" => format!("{}\\autoref{{fig:{}}}", escaped_title, title),
            _ => {
                let name = percent_decode_str(anchor).decode_utf8_lossy();
                format!("{}\\autoref{{sec:{}}}", escaped_title, escape_latex(&name))
            }
        };
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        if title.is_empty() {
            return format!("\\url{{{}}}", url);
        }
        return format!("\\href{{{}}}{{{}}}", url, escape_latex(&title));
    }
    let text = if title.is_empty() { url } else { title.as_str() };
    format!("\\repodocref{{{}}}{{{}}}", url, escape_latex(text))
}

fn render_code_block(code: &CodeBlock, settings: &ConversionSettings) -> String {
    let lang = code.lang.as_deref().filter(|l| !l.is_empty());
    if settings.minted_listings {
        return format!(
            "\\begin{{minted}}{{{}}}\n{}\n\\end{{minted}}\n",
            lang.unwrap_or(""),
            code.value
        );
    }
    let Some(lang) = lang else {
        return format!("\\begin{{lstlisting}}\n{}\n\\end{{lstlisting}}\n", code.value);
    };
    let meta = code.meta.as_deref().filter(|m| !m.is_empty());
    let mut opts = format!("language={},caption={}", lang, escape_latex(meta.unwrap_or("")));
    if let Some(meta) = meta {
        opts.push_str(&format!(",label=code:{}", meta));
    }
    format!(
        "\\begin{{lstlisting}}[{}]\n{}\n\\end{{lstlisting}}\n",
        opts, code.value
    )
}

fn render_inline_code(value: &str, settings: &ConversionSettings) -> String {
    let delim = settings.inline_delimiter.as_str();
    if delim.is_empty() {
        return format!("\\lstinline{{{}}}", value);
    }
    format!("\\lstinline{}{}{}", delim, value, delim)
}

/// `$x$` and `$$x$$` both arrive as inline math; the number of source
/// bytes consumed beyond the value tells them apart.
fn render_inline_math(value: &str, span: Option<Span>) -> String {
    let consumed = span.map(|s| s.len().saturating_sub(value.len())).unwrap_or(0);
    if consumed > 2 {
        format!("$${}$$", value)
    } else {
        format!("${}$", value)
    }
}

fn render_image(image: &Image) -> String {
    let file_name = image.url.rsplit('/').next().unwrap_or_default();
    let alt = escape_latex(image.alt.as_deref().unwrap_or(""));
    let mut out = String::new();
    out.push_str("\\begin{figure}[H]\n");
    out.push_str("\\centering\n");
    out.push_str(&format!(
        "\\includegraphics[width=\\textwidth]{{figures/{}}}\n",
        file_name
    ));
    out.push_str(&format!("\\caption{{{}}}\n", alt));
    out.push_str(&format!("\\label{{fig:{}}}\n", alt));
    out.push_str("\\end{figure}\n");
    out
}

fn render_table(table: &Table, settings: &ConversionSettings, indent: usize, depth: usize) -> String {
    let mut out = String::new();
    out.push_str("\\begin{table}[H]\n");
    out.push_str("\\centering\n");
    out.push_str("\\resizebox{\\textwidth}{!}{\n");
    out.push_str(&format!("\\begin{{tabular}}{{{}}}\n", build_column_spec(table)));
    out.push_str("\\hline\n");
    for row in &table.rows {
        // Only the first inline node of each cell is rendered.
        let cells: Vec<String> = row
            .children()
            .iter()
            .map(|cell| {
                cell.children()
                    .first()
                    .map(|first| render_at(first, settings, indent, depth + 1))
                    .unwrap_or_default()
            })
            .collect();
        out.push_str(&cells.join("\t& "));
        out.push_str("\\\\ \\hline\n");
    }
    out.push_str("\\end{tabular}}\n");
    out.push_str("\\end{table}\n");
    out
}

fn build_column_spec(table: &Table) -> String {
    let columns = if table.align.is_empty() {
        table
            .rows
            .first()
            .map(|row| row.children().len())
            .unwrap_or(0)
            .max(1)
    } else {
        table.align.len()
    };
    let mut spec = String::from("|");
    for i in 0..columns {
        let a = table.align.get(i).copied().flatten();
        spec.push(match a {
            Some(Alignment::Left) => 'l',
            Some(Alignment::Right) => 'r',
            Some(Alignment::Center) | None => 'c',
        });
        spec.push('|');
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn basic() -> ConversionSettings {
        ConversionSettings {
            cite_command: CiteCommand::Basic,
            ..ConversionSettings::default()
        }
    }

    #[test]
    fn escapes_every_special_character() {
        assert_eq!(escape_latex("\\"), "\\textbackslash{}");
        assert_eq!(escape_latex("{}"), "\\{\\}");
        assert_eq!(escape_latex("&%$#_"), "\\&\\%\\$\\#\\_");
        assert_eq!(escape_latex("~"), "\\textasciitilde{}");
        assert_eq!(escape_latex("^"), "\\textasciicircum{}");
        assert_eq!(escape_latex(""), "");
        assert_eq!(escape_latex("plain text"), "plain text");
    }

    #[test]
    fn escape_is_not_idempotent() {
        let once = escape_latex("a\\b");
        assert_eq!(once, "a\\textbackslash{}b");
        assert_ne!(escape_latex(&once), once);
    }

    #[test]
    fn trailing_label_replaces_whole_leaf() {
        // Text in front of the caret is dropped along with it.
        assert_eq!(render_leaf(Some("Some prose ^fig-1")), "\\label{fig-1}");
        assert_eq!(render_leaf(Some("^sec:intro  ")), "\\label{sec:intro}");
        assert_eq!(render_leaf(Some("^")), "\\label{}");
        assert_eq!(render_leaf(Some("2^10 bytes")), "2\\textasciicircum{}10 bytes");
        assert_eq!(render_leaf(None), "");
    }

    #[test]
    fn heading_depths() {
        let settings = basic();
        let heading = |depth| Node::Heading {
            depth,
            content: vec![Node::text("Intro")],
        };
        assert_eq!(
            render_document(&heading(1), &settings),
            "\\section{Intro}\n\\label{sec:Intro}\n"
        );
        assert!(render_document(&heading(2), &settings).starts_with("\\subsection{Intro}"));
        assert!(render_document(&heading(3), &settings).starts_with("\\subsubsection{Intro}"));
        assert!(render_document(&heading(5), &settings).starts_with("\\subsubsection{Intro}"));
    }

    #[test]
    fn inline_math_uses_source_span() {
        assert_eq!(render_inline_math("x", Some(Span::new(0, 3))), "$x$");
        assert_eq!(render_inline_math("x", Some(Span::new(0, 5))), "$$x$$");
        assert_eq!(render_inline_math("x", None), "$x$");
    }

    #[test]
    fn column_spec_defaults_to_center() {
        let table = Table {
            align: vec![Some(Alignment::Left), None, Some(Alignment::Right)],
            rows: Vec::new(),
        };
        assert_eq!(build_column_spec(&table), "|l|c|r|");
    }

    #[test]
    fn deep_nesting_degrades_to_text() {
        let mut node = Node::text("a_b");
        for _ in 0..(MAX_RENDER_DEPTH + 10) {
            node = Node::Emphasis(vec![node]);
        }
        let out = render_document(&node, &basic());
        assert!(out.contains("a\\_b"));
        assert!(out.starts_with("\\emph{"));
    }
}
