use anyhow::Result;
use headless_chrome::Tab;

use crate::types::DOM_SNAPSHOT_MAX_CHARS;

/// JavaScript injected into the page to produce a simplified DOM representation.
/// Reads the DOM without touching styles or layout.
///
/// The script:
///   1. Skips script, style, noscript, svg and link elements.
///   2. Walks the visible DOM tree (max depth 15).
///   3. Tags interactive elements (a, button, input, textarea, select) with
///      sequential `data-eid` ids [e0], [e1], ...
///   4. Emits one line per element; links carry their href and images their
///      src so poster and ticket URLs reach the model.
const SNAPSHOT_JS: &str = r#"
(() => {
  const SKIP = new Set(['SCRIPT','STYLE','NOSCRIPT','SVG','LINK']);
  let id = 0;
  const lines = [];
  const seen = new Set();

  function isVisible(el) {
    if (el.offsetParent === null && el.tagName !== 'BODY' && el.tagName !== 'HTML') return false;
    const s = getComputedStyle(el);
    return s.display !== 'none' && s.visibility !== 'hidden' && s.opacity !== '0';
  }

  function push(line) {
    if (line && !seen.has(line)) {
      seen.add(line);
      lines.push(line);
    }
  }

  function walk(node, depth) {
    if (depth > 15) return;
    for (const child of node.children) {
      if (SKIP.has(child.tagName)) continue;
      if (!isVisible(child)) continue;
      const tag = child.tagName.toLowerCase();
      const interactive = ['a','button','input','textarea','select'].includes(tag);

      if (interactive) {
        const eid = '[e' + (id++) + ']';
        child.setAttribute('data-eid', eid);
        if (tag === 'a') {
          push(eid + ' link "' + (child.textContent||'').trim().slice(0,60) + '" href=' + (child.href||''));
        } else if (tag === 'input' || tag === 'textarea') {
          let desc = eid + ' ' + tag + ' type=' + (child.type||'text') + ' placeholder="' + (child.placeholder||'') + '"';
          if (child.name) desc += ' name=' + child.name;
          if (child.value) desc += ' value="' + child.value.slice(0,30) + '"';
          push(desc);
        } else if (tag === 'button') {
          push(eid + ' button "' + (child.textContent||'').trim().slice(0,60) + '"');
        } else if (tag === 'select') {
          const opts = [...child.options].map(o => o.text.trim().slice(0,20)).join('|');
          push(eid + ' select [' + opts + ']');
        }
      } else if (tag === 'img') {
        if (child.src) push('  img "' + (child.alt||'').slice(0,60) + '" src=' + child.src);
      } else {
        const text = child.textContent ? child.textContent.trim() : '';
        if (text && text.length > 2 && text.length < 200 && child.children.length === 0) {
          push('  "' + text.slice(0, 100) + '"');
        }
      }
      walk(child, depth + 1);
    }
  }

  walk(document.body, 0);
  return lines.join('\n');
})()
"#;

/// Capture a simplified DOM snapshot from the current page.
pub fn capture_dom_snapshot(tab: &Tab) -> Result<String> {
    let raw = evaluate_string(tab, SNAPSHOT_JS)?.unwrap_or_default();
    Ok(truncate_snapshot(&raw, DOM_SNAPSHOT_MAX_CHARS))
}

pub fn get_current_url(tab: &Tab) -> Result<String> {
    Ok(evaluate_string(tab, "window.location.href")?.unwrap_or_else(|| "unknown".to_string()))
}

pub fn get_page_title(tab: &Tab) -> Result<String> {
    Ok(evaluate_string(tab, "document.title")?.unwrap_or_else(|| "untitled".to_string()))
}

/// Inner text of the first element matching `selector`, empty if none.
pub fn extract_text(tab: &Tab, selector: &str) -> Result<String> {
    let js_sel = escape_js_single_quoted(selector);
    Ok(evaluate_string(
        tab,
        &format!("(document.querySelector('{js_sel}') || {{}}).innerText || ''"),
    )?
    .unwrap_or_default())
}

pub fn escape_js_single_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

fn evaluate_string(tab: &Tab, script: &str) -> Result<Option<String>> {
    let result = tab.evaluate(script, false)?;
    Ok(result.value.and_then(|v| v.as_str().map(String::from)))
}

/// Cuts on a char boundary; pages are often Hebrew, so byte slicing would panic.
pub fn truncate_snapshot(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((cut, _)) => format!(
            "{}\n... [truncated, {} total chars]",
            &raw[..cut],
            raw.chars().count()
        ),
        None => raw.to_string(),
    }
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
