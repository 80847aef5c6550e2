use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::page::Page as CrPage;

use crate::element::Element;
use crate::error::{Error, Result};

/// Attribute stamped on interactive elements by [`Page::interactive_tree`].
pub const INDEX_ATTRIBUTE: &str = "data-harness-id";

/// CSS selector for the element that [`Page::interactive_tree`] labelled `index`.
pub fn index_selector(index: u32) -> String {
    format!("[{INDEX_ATTRIBUTE}=\"{index}\"]")
}

/// Wrapper around a chromiumoxide Page with a simplified, agent-friendly API.
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
}

impl Page {
    pub(crate) fn new(inner: CrPage, default_timeout: Duration) -> Self {
        Self {
            inner,
            default_timeout,
        }
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Navigate to the given URL and wait for the page to load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Navigate back in the browser history.
    pub async fn go_back(&self) -> Result<()> {
        self.inner
            .evaluate("window.history.back()")
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Get the current page URL.
    pub async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    /// Get the current page title.
    pub async fn title(&self) -> Result<String> {
        let result = self
            .inner
            .evaluate("document.title")
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(result.into_value::<String>().unwrap_or_default())
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Click on an element matching the given CSS selector.
    pub async fn click(&self, selector: &str) -> Result<()> {
        let el = self.wait_for_selector(selector).await?;
        el.click().await
    }

    /// Type text into an element matching the given CSS selector.
    pub async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        let el = self.wait_for_selector(selector).await?;
        el.click().await?;
        el.type_text(text).await
    }

    /// Scroll the window down by `pixels`.
    pub async fn scroll_down(&self, pixels: u32) -> Result<()> {
        let js = format!("window.scrollBy(0, {})", pixels);
        self.inner
            .evaluate(js)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(())
    }

    /// Wait for an element matching the given CSS selector to appear in the DOM.
    /// Polls every 100ms up to the configured default timeout.
    pub async fn wait_for_selector(&self, selector: &str) -> Result<Element> {
        let timeout = self.default_timeout;
        let interval = Duration::from_millis(100);
        let start = std::time::Instant::now();

        loop {
            match self.find_element(selector).await {
                Ok(el) => return Ok(el),
                Err(_) if start.elapsed() < timeout => {
                    tokio::time::sleep(interval).await;
                }
                Err(_) => {
                    return Err(Error::Timeout(format!(
                        "Timed out waiting for selector: {}",
                        selector
                    )));
                }
            }
        }
    }

    // ── Observations ────────────────────────────────────────────────

    /// Get the text content of an element matching the given CSS selector.
    pub async fn text_content(&self, selector: &str) -> Result<String> {
        let el = self.find_element(selector).await?;
        el.inner_text().await
    }

    /// Visible text of the whole document body.
    pub async fn visible_text(&self) -> Result<String> {
        let result = self
            .inner
            .evaluate("(document.body && document.body.innerText) || ''")
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        Ok(result.into_value::<String>().unwrap_or_default())
    }

    /// Build a compact outline of the page for the model. Every interactive
    /// element is stamped with a numeric [`INDEX_ATTRIBUTE`] and listed as
    /// `[n]<tag> label`, so actions can refer to it via [`index_selector`].
    /// Indices are reassigned on every call.
    pub async fn interactive_tree(&self) -> Result<String> {
        let js = format!(
            r#"
            JSON.stringify((function() {{
                const attr = '{INDEX_ATTRIBUTE}';
                document.querySelectorAll('[' + attr + ']').forEach(el => el.removeAttribute(attr));
                function getLabel(el) {{
                    if (el.getAttribute('aria-label')) return el.getAttribute('aria-label');
                    if (el.id) {{
                        const label = document.querySelector('label[for="' + el.id + '"]');
                        if (label) return (label.innerText || '').trim();
                    }}
                    const text = (el.innerText || el.value || '').trim();
                    if (text) return text.substring(0, 80);
                    return el.getAttribute('placeholder') || el.getAttribute('title') || el.getAttribute('alt') || '';
                }}
                const lines = [];
                let next = 0;
                function walk(el, depth) {{
                    const tag = el.tagName.toLowerCase();
                    if (['script','style','noscript','meta','link','head','svg'].includes(tag)) return;
                    const style = window.getComputedStyle(el);
                    if (style.display === 'none' || style.visibility === 'hidden') return;
                    const interactable = ['a','button','input','select','textarea'].includes(tag)
                        || el.getAttribute('role') === 'button'
                        || el.onclick !== null;
                    if (interactable) {{
                        el.setAttribute(attr, String(next));
                        let desc = '  '.repeat(depth) + '[' + next + ']<' + tag + '>';
                        const label = getLabel(el);
                        if (label) desc += ' ' + label.replace(/\s+/g, ' ');
                        if (tag === 'input') desc += ' type=' + (el.type || 'text');
                        lines.push(desc);
                        next += 1;
                    }} else if (el.children.length === 0) {{
                        const text = (el.innerText || '').trim();
                        if (text && text.length < 120) lines.push('  '.repeat(depth) + text);
                    }}
                    for (const child of el.children) walk(child, interactable ? depth + 1 : depth);
                }}
                walk(document.body || document.documentElement, 0);
                return lines;
            }})())
            "#
        );
        let result = self
            .inner
            .evaluate(js)
            .await
            .map_err(|e| Error::JsError(e.to_string()))?;
        let json_str: String = result
            .into_value()
            .map_err(|e| Error::JsError(e.to_string()))?;
        let lines: Vec<String> =
            serde_json::from_str(&json_str).map_err(|e| Error::JsError(e.to_string()))?;
        Ok(lines.join("\n"))
    }

    // ── Element Queries ─────────────────────────────────────────────

    /// Find an element matching the given CSS selector.
    pub async fn find_element(&self, selector: &str) -> Result<Element> {
        let el = self
            .inner
            .find_element(selector)
            .await
            .map_err(|e| Error::ElementNotFound(e.to_string()))?;
        Ok(Element::new(el))
    }
}

/// Page operations the agent loop relies on.
#[async_trait]
pub trait PageControl: Send + Sync {
    async fn url(&self) -> Result<String>;
    async fn title(&self) -> Result<String>;
    async fn interactive_tree(&self) -> Result<String>;
    async fn goto(&self, url: &str) -> Result<()>;
    async fn go_back(&self) -> Result<()>;
    async fn click(&self, selector: &str) -> Result<()>;
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;
    async fn scroll_down(&self, pixels: u32) -> Result<()>;
    async fn visible_text(&self) -> Result<String>;
}

#[async_trait]
impl PageControl for Page {
    async fn url(&self) -> Result<String> {
        Page::url(self).await
    }

    async fn title(&self) -> Result<String> {
        Page::title(self).await
    }

    async fn interactive_tree(&self) -> Result<String> {
        Page::interactive_tree(self).await
    }

    async fn goto(&self, url: &str) -> Result<()> {
        Page::goto(self, url).await
    }

    async fn go_back(&self) -> Result<()> {
        Page::go_back(self).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        Page::click(self, selector).await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        Page::type_text(self, selector, text).await
    }

    async fn scroll_down(&self, pixels: u32) -> Result<()> {
        Page::scroll_down(self, pixels).await
    }

    async fn visible_text(&self) -> Result<String> {
        Page::visible_text(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_selector_targets_stamped_attribute() {
        assert_eq!(index_selector(7), "[data-harness-id=\"7\"]");
    }
}
