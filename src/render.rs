//! Markdown rendering for blog posts.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

/// Schemes a link or image may point at. Relative destinations are always allowed.
const SAFE_SCHEMES: [&str; 6] = ["http", "https", "mailto", "irc", "ircs", "xmpp"];

/// Whether a link destination is relative or uses one of [`SAFE_SCHEMES`].
///
/// A colon only starts a scheme when it comes before any `/`, `?` or `#`.
fn is_safe_destination(url: &str) -> bool {
	let Some(colon) = url.find(':') else {
		return true;
	};

	if url[..colon].contains(['/', '?', '#']) {
		return true;
	}

	SAFE_SCHEMES
		.iter()
		.any(|scheme| url[..colon].eq_ignore_ascii_case(scheme))
}

fn sanitize_destination(url: CowStr<'_>) -> CowStr<'_> {
	if is_safe_destination(&url) {
		url
	} else {
		CowStr::Borrowed("")
	}
}

/// Renders Markdown to HTML.
///
/// Tables, strikethrough and task lists are enabled. Fenced code blocks get a
/// `language-*` class so the client can highlight them. Raw HTML in the
/// source is escaped rather than passed through, and link or image
/// destinations with an unsafe scheme are emptied.
pub fn markdown_to_html(markdown: &str) -> String {
	let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;

	let parser = Parser::new_ext(markdown, options).map(|event| match event {
		Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(CowStr::from(raw.into_string())),
		Event::Start(Tag::Link {
			link_type,
			dest_url,
			title,
			id,
		}) => Event::Start(Tag::Link {
			link_type,
			dest_url: sanitize_destination(dest_url),
			title,
			id,
		}),
		Event::Start(Tag::Image {
			link_type,
			dest_url,
			title,
			id,
		}) => Event::Start(Tag::Image {
			link_type,
			dest_url: sanitize_destination(dest_url),
			title,
			id,
		}),
		event => event,
	});

	let mut output = String::with_capacity(markdown.len() * 3 / 2);

	html::push_html(&mut output, parser);
	output
}

/// The languages named on fenced code blocks, in order of appearance.
pub fn code_languages(markdown: &str) -> Vec<String> {
	use pulldown_cmark::CodeBlockKind;

	Parser::new(markdown)
		.filter_map(|event| match event {
			Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) if !lang.is_empty() => {
				Some(lang.split_whitespace().next().unwrap_or_default().to_owned())
			}
			_ => None,
		})
		.collect()
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_renders_markdown() {
		let html = markdown_to_html("# Hello\n\nSome *emphasis* and ~~strike~~.");

		assert!(html.contains("<h1>Hello</h1>"));
		assert!(html.contains("<em>emphasis</em>"));
		assert!(html.contains("<del>strike</del>"));
	}

	#[test]
	fn test_code_blocks_carry_language() {
		let html = markdown_to_html("```rust\nfn main() {}\n```");

		assert!(html.contains(r#"<code class="language-rust">"#));
		assert_eq!(
			code_languages("```rust\n1\n```\n\n```\n2\n```\n\n```sql ignore\n3\n```"),
			["rust", "sql"]
		);
	}

	#[test]
	fn test_raw_html_is_escaped() {
		let html = markdown_to_html("<script>alert(1)</script>\n\nhi <b>there</b>");

		assert!(!html.contains("<script>"));
		assert!(html.contains("&lt;script&gt;"));
		assert!(!html.contains("<b>"));
	}

	#[test]
	fn test_script_links_are_emptied() {
		let html = markdown_to_html(
			"[click](javascript:alert(document.cookie)) ![x](JavaScript:alert(1)) [d](data:text/html,hi)",
		);

		assert!(!html.to_lowercase().contains("javascript:"));
		assert!(!html.contains("data:"));
		assert!(html.contains(r#"<a href="">click</a>"#));
		assert!(html.contains(r#"<img src="" alt="x" />"#));
	}

	#[test]
	fn test_safe_links_are_kept() {
		let html = markdown_to_html(
			"[site](https://example.com) [mail](mailto:ada@example.com) [rel](/posts/1) [q](?a=b:c)",
		);

		assert!(html.contains(r#"href="https://example.com""#));
		assert!(html.contains(r#"href="mailto:ada@example.com""#));
		assert!(html.contains(r#"href="/posts/1""#));
		assert!(html.contains(r#"href="?a=b:c""#));
	}
}
