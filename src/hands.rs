use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::agent::BrowserPage;
use crate::dom;
use crate::error::NavigationError;
use crate::types::{EXTRACT_MAX_CHARS, Extraction, PageState, Step};

pub const DEFAULT_DEBUG_URL: &str = "http://127.0.0.1:9222";

#[derive(Debug, Clone, Default)]
pub struct ChromeOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    /// DevTools endpoint of an already running Chrome to attach to first.
    pub debug_url: Option<String>,
}

/// Chrome session for one run: attached to a running browser when possible,
/// otherwise launched.
pub struct BrowserSession {
    browser: Arc<Browser>,
    tab: Arc<Tab>,
}

impl BrowserSession {
    /// Launches off the async runtime; a failure here means the navigation
    /// capability is unavailable.
    pub async fn start(options: ChromeOptions) -> Result<Self, NavigationError> {
        let attach_url = match &options.debug_url {
            Some(url) => match resolve_debugger_url(url).await {
                Ok(ws_url) => Some(ws_url),
                Err(e) => {
                    debug!(%url, error = %e, "no running Chrome to attach to");
                    None
                }
            },
            None => None,
        };

        tokio::task::spawn_blocking(move || Self::launch(&options, attach_url.as_deref()))
            .await
            .map_err(|e| NavigationError::unavailable(format!("browser launch panicked: {e}")))?
            .map_err(|e| NavigationError::unavailable(format!("{e:#}")))
    }

    /// `attach_url` is the browser's `ws://` debugger URL; see
    /// [`resolve_debugger_url`].
    pub fn launch(options: &ChromeOptions, attach_url: Option<&str>) -> Result<Self> {
        if let Some(url) = attach_url {
            debug!(%url, "attempting to attach to existing Chrome");
            match Browser::connect(url.to_string()) {
                Ok(browser) => {
                    let tab = {
                        let tabs = browser.get_tabs();
                        let tabs = tabs.lock().map_err(|_| anyhow!("tab list lock poisoned"))?;
                        tabs.first().cloned()
                    };
                    let tab = match tab {
                        Some(t) => t,
                        None => browser.new_tab()?,
                    };
                    info!(%url, "attached to existing Chrome");
                    return Ok(Self {
                        browser: Arc::new(browser),
                        tab,
                    });
                }
                Err(e) => debug!(%url, error = %e, "could not attach, launching Chrome"),
            }
        }

        let options = LaunchOptions {
            headless: options.headless,
            path: options.chrome_path.clone().or_else(find_chrome),
            window_size: Some((1280, 900)),
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
                OsStr::new("--disable-infobars"),
                OsStr::new("--password-store=basic"),
            ],
            idle_browser_timeout: Duration::from_secs(120),
            ..Default::default()
        };

        let browser =
            Browser::new(options).map_err(|e| anyhow!("Browser launch failed: {e}"))?;
        let tab = browser.new_tab()?;
        tab.navigate_to("about:blank")?;
        info!("Chrome ready");

        Ok(Self {
            browser: Arc::new(browser),
            tab,
        })
    }

    async fn on_tab<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = self.tab.clone();
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| anyhow!("browser task panicked: {e}"))?
    }
}

#[async_trait]
impl BrowserPage for BrowserSession {
    async fn open_tab(&mut self) -> Result<()> {
        let browser = self.browser.clone();
        let tab = tokio::task::spawn_blocking(move || browser.new_tab())
            .await
            .map_err(|e| anyhow!("browser task panicked: {e}"))??;
        self.tab = tab;
        Ok(())
    }

    async fn perform(&self, step: &Step) -> Result<Vec<Extraction>> {
        let step = step.clone();
        self.on_tab(move |tab| perform_on_tab(tab, &step)).await
    }

    async fn observe(&self) -> PageState {
        let observed = self
            .on_tab(|tab| {
                Ok(PageState {
                    url: dom::get_current_url(tab).unwrap_or_else(|_| "unknown".into()),
                    title: dom::get_page_title(tab).unwrap_or_else(|_| "untitled".into()),
                    dom_snapshot: dom::capture_dom_snapshot(tab).unwrap_or_default(),
                    ..PageState::default()
                })
            })
            .await;
        observed.unwrap_or_else(|e| {
            warn!(error = %e, "page observation failed");
            PageState {
                url: "unknown".into(),
                title: "untitled".into(),
                ..PageState::default()
            }
        })
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.on_tab(|tab| tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true))
            .await
    }
}

/// Turns a DevTools HTTP endpoint such as `http://127.0.0.1:9222` into the
/// browser's WebSocket debugger URL. WebSocket URLs are returned unchanged.
pub async fn resolve_debugger_url(debug_url: &str) -> Result<String> {
    if debug_url.starts_with("ws://") || debug_url.starts_with("wss://") {
        return Ok(debug_url.to_string());
    }

    let endpoint = format!("{}/json/version", debug_url.trim_end_matches('/'));
    let version: Value = reqwest::Client::new()
        .get(&endpoint)
        .timeout(Duration::from_secs(2))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    version["webSocketDebuggerUrl"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| anyhow!("{endpoint} did not report webSocketDebuggerUrl"))
}

fn perform_on_tab(tab: &Tab, step: &Step) -> Result<Vec<Extraction>> {
    let mut extracted = Vec::new();

    match step {
        Step::Navigate { url } => {
            tab.navigate_to(url)?;
            tab.wait_for_element("body")?;
            std::thread::sleep(Duration::from_millis(1500));
        }
        Step::WaitFor {
            selector,
            timeout_ms,
        } => {
            tab.wait_for_element_with_custom_timeout(selector, Duration::from_millis(*timeout_ms))?;
        }
        Step::TypeInto { selector, text } => {
            let el = tab.find_element(selector)?;
            el.click()?;
            let js_sel = dom::escape_js_single_quoted(selector);
            tab.evaluate(
                &format!("document.querySelector('{js_sel}').value = ''"),
                false,
            )?;
            tab.type_str(text)?;
        }
        Step::Click { selector } => {
            tab.find_element(selector)?.click()?;
            std::thread::sleep(Duration::from_millis(1000));
        }
        Step::PressKey { key } => {
            tab.press_key(key)?;
            std::thread::sleep(Duration::from_millis(1000));
        }
        Step::Scroll { pixels } => {
            tab.evaluate(&format!("window.scrollBy(0, {pixels})"), false)?;
            std::thread::sleep(Duration::from_millis(500));
        }
        Step::Extract { selector, label } => {
            let content = dom::extract_text(tab, selector)?;
            extracted.push(Extraction {
                label: label.clone(),
                content: dom::truncate_chars(&content, EXTRACT_MAX_CHARS),
            });
        }
        Step::Done { .. } => {}
    }

    Ok(extracted)
}

fn find_chrome() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = if cfg!(target_os = "windows") {
        vec![
            PathBuf::from(r"C:\Program Files\Google\Chrome\Application\chrome.exe"),
            PathBuf::from(r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe"),
        ]
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        )]
    } else {
        ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
            .iter()
            .map(|name| PathBuf::from("/usr/bin").join(name))
            .collect()
    };
    if let Ok(user) = std::env::var("USERNAME") {
        candidates.push(PathBuf::from(format!(
            r"C:\Users\{user}\AppData\Local\Google\Chrome\Application\chrome.exe"
        )));
    }

    // None lets headless_chrome fall back to its own discovery.
    candidates.into_iter().find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one HTTP response with `body` and returns the listener's base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn http_endpoint_resolves_to_websocket_url() {
        let base = serve_once(
            "200 OK",
            r#"{"Browser":"Chrome/131.0","webSocketDebuggerUrl":"ws://127.0.0.1:9222/devtools/browser/abc-123"}"#,
        )
        .await;

        let ws_url = resolve_debugger_url(&format!("{base}/")).await.unwrap();

        assert_eq!(ws_url, "ws://127.0.0.1:9222/devtools/browser/abc-123");
    }

    #[tokio::test]
    async fn websocket_url_is_used_as_is() {
        let url = "ws://127.0.0.1:9222/devtools/browser/xyz";
        assert_eq!(resolve_debugger_url(url).await.unwrap(), url);
    }

    #[tokio::test]
    async fn version_without_debugger_url_is_an_error() {
        let base = serve_once("200 OK", r#"{"Browser":"Chrome/131.0"}"#).await;
        let err = resolve_debugger_url(&base).await.unwrap_err();
        assert!(err.to_string().contains("webSocketDebuggerUrl"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(resolve_debugger_url(&format!("http://{addr}")).await.is_err());
    }
}
