use minijinja::{context, Value};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use url::Url;

use crate::conversation::{Conversation, Role, Turn, TurnId};

/// Markdown dialect accepted in model output.
fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// Link and image targets a rendered reply may point at.
const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Keep relative targets and allowed schemes; anything else becomes `#`.
fn safe_url(dest: CowStr<'_>) -> CowStr<'_> {
    let allowed = match Url::parse(&dest) {
        Ok(url) => ALLOWED_SCHEMES.contains(&url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    };
    if allowed {
        dest
    } else {
        CowStr::Borrowed("#")
    }
}

/// Render model output to HTML that is safe to embed in a page.
///
/// Raw HTML in the source is shown as text, link targets outside
/// [`ALLOWED_SCHEMES`] are neutralised, and single newlines become
/// `<br />` so replies keep the line layout the model produced.
pub fn render_markdown(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let parser = Parser::new_ext(raw, markdown_options()).map(|event| match event {
        Event::Html(text) | Event::InlineHtml(text) => Event::Text(text),
        Event::SoftBreak => Event::HardBreak,
        Event::Start(Tag::Link { link_type, dest_url, title, id }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image { link_type, dest_url, title, id }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(raw.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// A turn as the assistant page shows it.
#[derive(Debug, Clone)]
pub struct TurnView {
    pub id: TurnId,
    pub role: Role,
    /// Pre-formatting text, which is what the copy button copies.
    pub raw: String,
    pub html: String,
}

impl TurnView {
    pub fn new(id: TurnId, turn: &Turn) -> Self {
        // User prompts are shown verbatim; only model replies are markdown.
        let html = match turn.role() {
            Role::Assistant => render_markdown(turn.content()),
            Role::User => plain_paragraph(turn.content()),
        };
        Self {
            id,
            role: turn.role(),
            raw: turn.content().to_string(),
            html,
        }
    }

    pub fn to_value(&self) -> Value {
        context! {
            id => self.id.to_string(),
            role => self.role.as_str(),
            raw => &self.raw,
            html => Value::from_safe_string(self.html.clone()),
        }
    }
}

/// Views for every turn, newest first.
pub fn conversation_views(conversation: &Conversation) -> Vec<TurnView> {
    conversation
        .recent_first()
        .map(|(id, turn)| TurnView::new(id, turn))
        .collect()
}

fn plain_paragraph(text: &str) -> String {
    let events = [
        Event::Start(Tag::Paragraph),
        Event::Text(CowStr::Borrowed(text)),
        Event::End(pulldown_cmark::TagEnd::Paragraph),
    ];
    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold() {
        assert_eq!(render_markdown("**Hi!**"), "<p><strong>Hi!</strong></p>\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render_markdown(""), "");
        assert_eq!(render_markdown("  \n"), "");
    }

    #[test]
    fn test_headers_and_lists() {
        let out = render_markdown("## Steps\n\n1. First\n2. Second\n\n* a\n* b\n");
        assert!(out.contains("<h2>Steps</h2>"));
        assert!(out.contains("<ol>\n<li>First</li>\n<li>Second</li>\n</ol>"));
        assert!(out.contains("<ul>\n<li>a</li>\n<li>b</li>\n</ul>"));
        assert_eq!(out.matches("<ul>").count(), 1);
    }

    #[test]
    fn test_header_followed_by_text_keeps_header() {
        // The regex formatter collapsed newlines before matching headers.
        let out = render_markdown("### Title\nbody");
        assert!(out.contains("<h3>Title</h3>"));
        assert!(out.contains("<p>body</p>"));
    }

    #[test]
    fn test_soft_breaks_become_line_breaks() {
        assert_eq!(render_markdown("one\ntwo"), "<p>one<br />\ntwo</p>\n");
    }

    #[test]
    fn test_unmatched_markup_passes_through() {
        assert_eq!(render_markdown("**open"), "<p>**open</p>\n");
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let out = render_markdown("<script>alert(1)</script>\n\nhi <b>x</b>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains("&lt;b&gt;x&lt;/b&gt;"));
    }

    #[test]
    fn test_script_urls_are_neutralised() {
        for src in [
            "[click](javascript:alert(document.cookie))",
            "[click](JaVaScript:alert(1))",
            "<javascript:alert(1)>",
            "[x](data:text/html;base64,PHNjcmlwdD4=)",
            "[ref]\n\n[ref]: javascript:alert(1)",
            "![x](javascript:alert(1))",
        ] {
            let out = render_markdown(src);
            let lower = out.to_lowercase();
            assert!(!lower.contains("href=\"javascript:"), "{} -> {}", src, out);
            assert!(!lower.contains("src=\"javascript:"), "{} -> {}", src, out);
            assert!(!lower.contains("data:text/html"), "{} -> {}", src, out);
        }
        assert_eq!(
            render_markdown("[click](javascript:alert(1))"),
            "<p><a href=\"#\">click</a></p>\n"
        );
    }

    #[test]
    fn test_web_and_relative_links_are_kept() {
        assert!(render_markdown("[docs](https://example.com/a?b=1)")
            .contains(r#"href="https://example.com/a?b=1""#));
        assert!(render_markdown("[mail](mailto:hi@example.com)")
            .contains(r#"href="mailto:hi@example.com""#));
        assert!(render_markdown("[up](/code)").contains(r#"href="/code""#));
        assert!(render_markdown("![logo](img/logo.png)").contains(r#"src="img/logo.png""#));
    }

    #[test]
    fn test_tables() {
        let out = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(out.contains("<table>"));
        assert!(out.contains("<td>1</td>"));
    }

    #[test]
    fn test_rendering_is_stable_across_calls() {
        let src = "* a\n* b\n\n**bold**";
        assert_eq!(render_markdown(src), render_markdown(src));
    }

    #[test]
    fn test_user_turn_is_not_markdown() {
        let mut conversation = Conversation::new();
        let id = conversation.push(Turn::user("**not bold** <i>"));
        let view = TurnView::new(id, conversation.get(id).unwrap());
        assert_eq!(view.html, "<p>**not bold** &lt;i&gt;</p>\n");
        assert_eq!(view.raw, "**not bold** <i>");
    }

    #[test]
    fn test_views_are_newest_first_with_distinct_ids() {
        let conversation = Conversation::from(vec![
            Turn::user("same"),
            Turn::assistant("same"),
        ]);
        let views = conversation_views(&conversation);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].role, Role::Assistant);
        assert_eq!(views[0].id.to_string(), "turn-1");
        assert_eq!(views[1].id.to_string(), "turn-0");
    }
}
