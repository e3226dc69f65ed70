//! Chromium-backed driver implementation
//!
//! Drives the page through `Runtime.evaluate`-style JavaScript with an
//! in-page element registry: queries push matched nodes into
//! `window.__sf_reg` and hand back indexes as opaque handles. A navigation
//! replaces the document (and the registry with it), so handles from an
//! earlier document surface as stale, which upstream retry logic treats as
//! transient.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::driver::PageDriver;
use crate::errors::DriverError;
use crate::types::{ElementHandle, ElementHit, ElementState, Selector};

/// Launch configuration for the Chromium driver.
#[derive(Debug, Clone)]
pub struct CdpDriverConfig {
    pub headless: bool,
    pub window: (u32, u32),
    pub no_sandbox: bool,
    pub launch_timeout: Duration,
}

impl Default for CdpDriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window: (1440, 900),
            no_sandbox: true,
            launch_timeout: Duration::from_secs(20),
        }
    }
}

/// Driver over a real Chromium instance via the DevTools protocol.
pub struct CdpDriver {
    browser: Mutex<Browser>,
    page: Page,
    event_task: JoinHandle<()>,
}

/// Result shape returned by the interaction snippets.
#[derive(Debug, Deserialize)]
struct JsOutcome {
    #[serde(default)]
    err: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    visible: Option<bool>,
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct JsHit {
    id: u64,
    visible: bool,
    enabled: bool,
}

/// Shared JS helpers prepended to every snippet.
const JS_PRELUDE: &str = r#"
const reg = (window.__sf_reg = window.__sf_reg || { els: [] });
const isVisible = (el) => {
    if (!el || !el.isConnected) return false;
    const style = window.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
};
const isEnabled = (el) => {
    if (el.disabled) return false;
    return el.getAttribute('aria-disabled') !== 'true';
};
const grab = (id) => {
    const el = reg.els[id];
    return el && el.isConnected ? el : null;
};
"#;

impl CdpDriver {
    /// Launch a fresh Chromium instance with one blank page.
    pub async fn launch(cfg: CdpDriverConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(cfg.window.0, cfg.window.1)
            .launch_timeout(cfg.launch_timeout);
        if !cfg.headless {
            builder = builder.with_head();
        }
        if cfg.no_sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;

        let event_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|err| DriverError::Launch(err.to_string()))?;

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            event_task,
        })
    }

    /// Shut the browser down. Pending handles become invalid.
    pub async fn close(&self) {
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            warn!("browser close failed: {}", err);
        }
        self.event_task.abort();
    }

    async fn eval_json(&self, js: String) -> Result<Value, DriverError> {
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn run_interaction(&self, js: String) -> Result<JsOutcome, DriverError> {
        let value = self.eval_json(js).await?;
        let outcome: JsOutcome = serde_json::from_value(value)
            .map_err(|err| DriverError::Protocol(format!("bad interaction result: {err}")))?;
        if let Some(code) = &outcome.err {
            return Err(map_js_error(code));
        }
        Ok(outcome)
    }

    fn match_expr(selector: &Selector) -> Result<String, DriverError> {
        let expr = match selector {
            Selector::Css(css) => {
                let lit = js_string(css);
                format!("Array.from(document.querySelectorAll({lit}))")
            }
            Selector::TestId(id) => {
                let lit = js_string(&format!("[data-testid=\"{id}\"]"));
                format!("Array.from(document.querySelectorAll({lit}))")
            }
            Selector::XPath(xpath) => {
                let lit = js_string(xpath);
                format!(
                    "(() => {{ const snap = document.evaluate({lit}, document, null, \
                     XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const nodes = []; \
                     for (let i = 0; i < snap.snapshotLength; i++) nodes.push(snap.snapshotItem(i)); \
                     return nodes; }})()"
                )
            }
            Selector::Text(text) => {
                // Exact trimmed match on innerText, innermost elements only
                // (an ancestor whose text is exactly its child's text would
                // otherwise match too).
                let lit = js_string(text);
                format!(
                    "(() => {{ const wanted = {lit}; \
                     const all = Array.from(document.querySelectorAll('*')); \
                     const hits = all.filter(el => (el.innerText || '').trim() === wanted); \
                     return hits.filter(el => !hits.some(other => other !== el && el.contains(other))); }})()"
                )
            }
        };
        Ok(expr)
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!(url, "navigating");
        self.page
            .goto(url)
            .await
            .map_err(|err| DriverError::Navigation(err.to_string()))?;
        Ok(())
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<ElementHit>, DriverError> {
        let matcher = Self::match_expr(selector)?;
        let js = format!(
            "(() => {{ {JS_PRELUDE} try {{ const nodes = {matcher}; \
             return nodes.map(el => {{ const id = reg.els.push(el) - 1; \
             return {{ id, visible: isVisible(el), enabled: isEnabled(el) }}; }}); \
             }} catch (e) {{ return {{ err: 'selector', msg: String(e) }}; }} }})()"
        );
        let value = self.eval_json(js).await?;
        if value.get("err").is_some() {
            let msg = value
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("evaluation failed");
            return Err(DriverError::InvalidSelector(format!("{selector}: {msg}")));
        }
        let hits: Vec<JsHit> = serde_json::from_value(value)
            .map_err(|err| DriverError::Protocol(format!("bad query result: {err}")))?;
        Ok(hits
            .into_iter()
            .map(|hit| ElementHit {
                handle: ElementHandle(hit.id),
                state: ElementState {
                    visible: hit.visible,
                    enabled: hit.enabled,
                },
            })
            .collect())
    }

    async fn element_state(&self, handle: ElementHandle) -> Result<ElementState, DriverError> {
        let id = handle.0;
        let js = format!(
            "(() => {{ {JS_PRELUDE} const el = grab({id}); \
             if (!el) return {{ err: 'stale' }}; \
             return {{ visible: isVisible(el), enabled: isEnabled(el) }}; }})()"
        );
        let outcome = self.run_interaction(js).await?;
        Ok(ElementState {
            visible: outcome.visible.unwrap_or(false),
            enabled: outcome.enabled.unwrap_or(false),
        })
    }

    async fn click(&self, handle: ElementHandle) -> Result<(), DriverError> {
        let id = handle.0;
        let js = format!(
            "(() => {{ {JS_PRELUDE} const el = grab({id}); \
             if (!el) return {{ err: 'stale' }}; \
             if (!isVisible(el) || !isEnabled(el)) return {{ err: 'not-interactable' }}; \
             el.scrollIntoView({{ block: 'center' }}); \
             if (typeof el.click === 'function') el.click(); \
             else el.dispatchEvent(new MouseEvent('click', {{ bubbles: true }})); \
             return {{}}; }})()"
        );
        self.run_interaction(js).await?;
        Ok(())
    }

    async fn fill(&self, handle: ElementHandle, text: &str) -> Result<(), DriverError> {
        let id = handle.0;
        let lit = js_string(text);
        // Uses the native value setter so framework-managed inputs observe
        // the change; always clears first (overwrite contract).
        let js = format!(
            "(() => {{ {JS_PRELUDE} const el = grab({id}); \
             if (!el) return {{ err: 'stale' }}; \
             if (!isVisible(el) || !isEnabled(el)) return {{ err: 'not-interactable' }}; \
             el.focus(); \
             const proto = el instanceof HTMLTextAreaElement \
                 ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
             const desc = Object.getOwnPropertyDescriptor(proto, 'value'); \
             if (!desc || !desc.set) return {{ err: 'not-interactable' }}; \
             desc.set.call(el, ''); \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             desc.set.call(el, {lit}); \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return {{}}; }})()"
        );
        self.run_interaction(js).await?;
        Ok(())
    }

    async fn text(&self, handle: ElementHandle) -> Result<String, DriverError> {
        let id = handle.0;
        let js = format!(
            "(() => {{ {JS_PRELUDE} const el = grab({id}); \
             if (!el) return {{ err: 'stale' }}; \
             return {{ text: (el.innerText || '').trim() }}; }})()"
        );
        let outcome = self.run_interaction(js).await?;
        Ok(outcome.text.unwrap_or_default())
    }

    async fn value(&self, handle: ElementHandle) -> Result<String, DriverError> {
        let id = handle.0;
        let js = format!(
            "(() => {{ {JS_PRELUDE} const el = grab({id}); \
             if (!el) return {{ err: 'stale' }}; \
             return {{ text: el.value !== undefined ? String(el.value) : '' }}; }})()"
        );
        let outcome = self.run_interaction(js).await?;
        Ok(outcome.text.unwrap_or_default())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let value = self.eval_json("window.location.href".to_string()).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Protocol("no current url".to_string()))
    }

    async fn title(&self) -> Result<String, DriverError> {
        let value = self.eval_json("document.title".to_string()).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|err| DriverError::Protocol(err.to_string()))
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        self.eval_json("history.back()".to_string()).await?;
        Ok(())
    }
}

fn map_js_error(code: &str) -> DriverError {
    match code {
        "stale" => DriverError::StaleElement,
        "not-interactable" => DriverError::NotInteractable("element not interactable".to_string()),
        other => DriverError::Protocol(format!("page script error: {other}")),
    }
}

/// Encode a Rust string as a JS string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
