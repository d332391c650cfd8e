//! Root document rewriting.

use lol_html::html_content::ContentType;
use lol_html::{element, HtmlRewriter, Settings};

use crate::config::TransformConfig;
use crate::transform::TransformError;

/// Fixed edits applied to the site's root document.
#[derive(Debug, Clone)]
pub struct RootDocument {
    title: String,
    removed_script_src: String,
    base_href: Option<String>,
    /// Markup inserted right after `<title>`.
    after_title: String,
}

impl RootDocument {
    pub fn from_config(config: &TransformConfig) -> Self {
        let mut after_title = String::new();
        after_title.push_str(&format!(
            r#"<meta name="keywords" content="{}">"#,
            escape_attr(&config.keywords)
        ));
        after_title.push_str(&format!(
            r#"<meta name="description" content="{}">"#,
            escape_attr(&config.description)
        ));
        for src in &config.scripts {
            after_title.push_str(&format!(
                r#"<script type="text/javascript" src="{}"></script>"#,
                escape_attr(src)
            ));
        }

        let base_href = Some(config.base_href.trim())
            .filter(|href| !href.is_empty())
            .map(|href| format!(r#"<base href="{}" />"#, escape_attr(href)));

        Self {
            title: config.title.clone(),
            removed_script_src: config.removed_script_src.clone(),
            base_href,
            after_title,
        }
    }

    /// Rewrite a decoded HTML document.
    ///
    /// Handlers only see markup from the input, so the inserted description
    /// is never matched by the description removal.
    pub fn rewrite(&self, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let mut output = Vec::with_capacity(input.len() + self.after_title.len());
        let mut handlers = vec![
            element!("head title", |el| {
                el.set_inner_content(&self.title, ContentType::Text);
                el.after(&self.after_title, ContentType::Html);
                Ok(())
            }),
            element!(r#"meta[name="description"]"#, |el| {
                el.remove();
                Ok(())
            }),
            element!("script[src]", |el| {
                if el.get_attribute("src").as_deref() == Some(self.removed_script_src.as_str()) {
                    el.remove();
                }
                Ok(())
            }),
        ];
        if let Some(base) = &self.base_href {
            handlers.push(element!("head", move |el| {
                el.prepend(base, ContentType::Html);
                Ok(())
            }));
        }

        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: handlers,
                ..Settings::default()
            },
            |c: &[u8]| output.extend_from_slice(c),
        );

        rewriter.write(input)?;
        rewriter.end()?;
        Ok(output)
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}
