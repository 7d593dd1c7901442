//! Embedded HTML/CSS/JS page for the abcxyz dashboard.
//!
//! The page is compiled into the binary as a template string. Regions are
//! rendered server-side by [`HtmlView`] and swapped in place by the script
//! after uploads, deletes and auto-refresh reloads.

use std::fmt::Write as _;

use crate::chat::quick_replies;
use crate::notify::Notification;
use crate::render::html::Region;
use crate::render::{HtmlView, escape_html};
use crate::ui::{Effect, LEGEND, Overlays};

/// Inputs for one page render.
pub struct Page<'a> {
    pub view: &'a HtmlView,
    pub notifications: &'a [Notification],
    /// Chat window markup (already escaped).
    pub chat: &'a str,
    /// Which overlays start open.
    pub overlays: &'a Overlays,
    /// Follow-up for the script to run once the page loads.
    pub effect: Effect,
    pub refresh_ms: u64,
    pub max_upload_bytes: u64,
}

/// Fill the page template.
pub fn render_page(page: &Page<'_>) -> String {
    let region = |r: Region| page.view.region(r).unwrap_or("").to_string();
    let active = |open: bool| if open { "active" } else { "" }.to_string();

    let mut notifications = String::new();
    for n in page.notifications {
        let _ = write!(
            notifications,
            "<div class=\"notification {}\">{}</div>",
            n.level,
            escape_html(&n.message)
        );
    }

    let mut legend = String::new();
    for (class, text) in LEGEND {
        let _ = write!(
            legend,
            "<li><span class=\"badge category-{}\">{class}</span> {}</li>",
            class.to_lowercase(),
            escape_html(text)
        );
    }

    let mut quick = String::new();
    for prompt in quick_replies() {
        let escaped = escape_html(prompt);
        let _ = write!(
            quick,
            "<button type=\"button\" class=\"quick-reply\" data-text=\"{escaped}\">{escaped}</button>"
        );
    }

    fill_template(INDEX_HTML, |name| {
        Some(match name {
            "NOTIFICATIONS" => notifications.clone(),
            "TABLE" => region(Region::Table),
            "SUMMARY" => region(Region::Summary),
            "CHARTS" => region(Region::Charts),
            "DELETION" => region(Region::Deletion),
            "LEGEND" => legend.clone(),
            "CHAT" => page.chat.to_string(),
            "QUICK_REPLIES" => quick.clone(),
            "REFRESH_MS" => page.refresh_ms.to_string(),
            "INFO_CLASS" => active(page.overlays.info_open()),
            "CHAT_CLASS" => active(page.overlays.chat_open()),
            "FOCUS_DELAY_MS" => page.overlays.focus_delay().as_millis().to_string(),
            "FOCUS_ON_LOAD" => matches!(page.effect, Effect::FocusInput(_)).to_string(),
            "MAX_UPLOAD_BYTES" => page.max_upload_bytes.to_string(),
            _ => return None,
        })
    })
}

/// Substitute `{{NAME}}` markers in one pass over `template`.
///
/// Substituted values are never rescanned. Markers `lookup` does not know
/// are copied through unchanged.
fn fill_template(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after.find("}}").and_then(|end| {
            let name = &after[..end];
            let is_marker = !name.is_empty()
                && name.bytes().all(|b| b.is_ascii_uppercase() || b == b'_');
            if is_marker {
                lookup(name).map(|v| (v, end))
            } else {
                None
            }
        });
        match value {
            Some((v, end)) => {
                out.push_str(&v);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// The dashboard page template.
const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>ABC/XYZ Analysis</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
* { box-sizing: border-box; }
body { margin: 0; background: var(--bg); color: var(--text); font-family: var(--font); }
header { display: flex; align-items: center; gap: 16px; padding: 16px 24px; border-bottom: 1px solid var(--border); }
header h1 { font-size: 18px; margin: 0; flex: 1; }
main { padding: 24px; display: grid; gap: 24px; }
section { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 16px; }
section h2 { margin-top: 0; font-size: 15px; color: var(--text-muted); }
button { background: var(--surface); color: var(--text); border: 1px solid var(--border); border-radius: var(--radius); padding: 6px 12px; cursor: pointer; }
button:hover { border-color: var(--accent); }
.upload-row { display: flex; gap: 12px; align-items: center; flex-wrap: wrap; }
.progress { height: 6px; background: var(--border); border-radius: 3px; overflow: hidden; margin-top: 12px; visibility: hidden; }
.progress.active { visibility: visible; }
.progress-fill { height: 100%; width: 0; background: var(--accent); transition: width .3s; }
#notifications { position: fixed; top: 16px; right: 16px; display: grid; gap: 8px; z-index: 30; }
.notification { padding: 10px 14px; border-radius: var(--radius); background: var(--surface); border-left: 4px solid var(--accent); max-width: 360px; }
.notification.success { border-color: var(--green); }
.notification.warning { border-color: var(--yellow); }
.notification.error { border-color: var(--red); }
table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { padding: 6px 8px; border-bottom: 1px solid var(--border); text-align: left; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
td.empty { text-align: center; color: var(--text-muted); }
tr.category-a td:first-child { border-left: 3px solid var(--green); }
tr.category-b td:first-child { border-left: 3px solid var(--yellow); }
tr.category-c td:first-child { border-left: 3px solid var(--red); }
.badge { display: inline-block; min-width: 22px; text-align: center; border-radius: 4px; padding: 1px 4px; background: var(--border); }
.badge.category-a { background: var(--green); color: #000; }
.badge.category-b { background: var(--yellow); color: #000; }
.badge.category-c { background: var(--red); color: #000; }
.stat-card { display: inline-flex; flex-direction: column; margin: 0 16px 12px 0; }
.stat-label { color: var(--text-muted); font-size: 12px; }
.stat-value { font-size: 22px; font-weight: 600; }
.stat-group { display: inline-block; vertical-align: top; margin-right: 24px; }
.stat-group h4 { margin: 4px 0; }
.charts { display: flex; flex-wrap: wrap; gap: 16px; }
figure.chart { margin: 0; max-width: 480px; }
figure.chart img { max-width: 100%; border-radius: var(--radius); background: #fff; }
#updating { color: var(--yellow); font-size: 13px; visibility: hidden; }
#updating.active { visibility: visible; }
#infoPanel { position: fixed; top: 0; left: 0; bottom: 0; width: 380px; background: var(--surface); border-right: 1px solid var(--border); padding: 20px; overflow-y: auto; transform: translateX(-100%); transition: transform .25s; z-index: 20; }
#infoPanel.active { transform: none; }
#infoPanel ul { list-style: none; padding: 0; }
#infoPanel li { margin: 6px 0; }
.chat-bot-btn { position: fixed; right: 24px; bottom: 24px; z-index: 20; }
#chatWindow { position: fixed; right: 24px; bottom: 72px; width: 360px; height: 480px; background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); display: none; flex-direction: column; z-index: 20; }
#chatWindow.active { display: flex; }
#chatMessages { flex: 1; overflow-y: auto; padding: 12px; display: flex; flex-direction: column; gap: 8px; }
.message { max-width: 85%; padding: 8px 10px; border-radius: var(--radius); font-size: 13px; }
.user-message { align-self: flex-end; background: #1f6feb; }
.bot-message { align-self: flex-start; background: var(--border); }
.message-time { font-size: 10px; color: var(--text-muted); margin-top: 4px; }
.welcome-message { color: var(--text-muted); font-size: 13px; }
.quick-replies { display: flex; flex-wrap: wrap; gap: 4px; padding: 0 12px 8px; }
.quick-reply { font-size: 11px; padding: 3px 8px; }
.chat-input { display: flex; gap: 8px; padding: 12px; border-top: 1px solid var(--border); }
.chat-input textarea { flex: 1; resize: none; background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: var(--radius); padding: 6px; }
</style>
</head>
<body>
<div id="notifications">{{NOTIFICATIONS}}</div>

<header>
  <button type="button" class="info-toggle-btn" id="infoToggle">Show info</button>
  <h1>ABC/XYZ Inventory Analysis</h1>
  <span id="updating">Updating…</span>
</header>

<main>
  <section>
    <h2>Upload</h2>
    <div class="upload-row">
      <input type="file" id="fileInput" accept=".xls,.xlsx">
      <button type="button" id="uploadBtn">Upload and analyze</button>
      <button type="button" id="deleteBtn">Delete items in file</button>
    </div>
    <div class="progress" id="progress"><div class="progress-fill" id="progressFill"></div></div>
  </section>

  <section>
    <h2>Summary</h2>
    <div id="summaryRegion">{{SUMMARY}}</div>
  </section>

  <section>
    <h2>Charts</h2>
    <div class="charts" id="chartsRegion">{{CHARTS}}</div>
  </section>

  <section>
    <h2>Results</h2>
    <div id="tableRegion">{{TABLE}}</div>
  </section>

  <section>
    <h2>Last delete</h2>
    <div id="deletionRegion">{{DELETION}}</div>
  </section>
</main>

<aside id="infoPanel" class="{{INFO_CLASS}}">
  <button type="button" id="infoClose">✕ Close</button>
  <h3>Categories</h3>
  <ul>{{LEGEND}}</ul>
  <h3>Current data</h3>
  <div id="infoSummary">{{SUMMARY}}</div>
</aside>

<button type="button" class="chat-bot-btn" id="chatBtn">💬 Assistant</button>
<div id="chatWindow" class="{{CHAT_CLASS}}">
  <div id="chatMessages">{{CHAT}}</div>
  <div class="quick-replies">{{QUICK_REPLIES}}</div>
  <div class="chat-input">
    <textarea id="chatInput" rows="2" placeholder="Ask about ABC/XYZ analysis…"></textarea>
    <button type="button" id="chatSend">Send</button>
    <button type="button" id="chatClear" title="Clear history">🗑</button>
  </div>
</div>

<script>
const REFRESH_MS = {{REFRESH_MS}};
const FOCUS_DELAY_MS = {{FOCUS_DELAY_MS}};
const FOCUS_ON_LOAD = {{FOCUS_ON_LOAD}};
const MAX_UPLOAD_BYTES = {{MAX_UPLOAD_BYTES}};
const HISTORY_KEY = 'chat_history_v1';
const $ = (id) => document.getElementById(id);

function esc(s) {
  const div = document.createElement('div');
  div.textContent = s;
  return div.innerHTML;
}

// ---------------------------------------------------------------- notifications

function notify(level, message) {
  const el = document.createElement('div');
  el.className = 'notification ' + level;
  el.textContent = message;
  $('notifications').appendChild(el);
  if (level !== 'error') setTimeout(() => el.remove(), 5000);
  else el.addEventListener('click', () => el.remove());
}

function setProgress(pct) {
  $('progress').classList.toggle('active', pct > 0);
  $('progressFill').style.width = pct + '%';
}

function swapRegions(regions) {
  if (!regions) return;
  const map = { table: ['tableRegion'], summary: ['summaryRegion', 'infoSummary'], charts: ['chartsRegion'], deletion: ['deletionRegion'] };
  for (const [key, ids] of Object.entries(map)) {
    if (regions[key] === undefined) continue;
    for (const id of ids) { const el = $(id); if (el) el.innerHTML = regions[key]; }
  }
}

// ---------------------------------------------------------------- upload / delete

async function sendFile(endpoint) {
  const file = $('fileInput').files[0];
  if (!file) { notify('error', 'Please choose a file first'); return; }
  if (file.size > MAX_UPLOAD_BYTES) {
    notify('error', 'File size must not exceed ' + Math.floor(MAX_UPLOAD_BYTES / 1048576) + ' MB');
    setProgress(0);
    return;
  }
  setProgress(30);
  try {
    const res = await fetch(endpoint + '?name=' + encodeURIComponent(file.name), { method: 'POST', body: file });
    const data = await res.json();
    for (const n of data.notifications || []) notify(n.level, n.message);
    const trail = data.progress || [];
    setProgress(trail.length ? trail[trail.length - 1] : 0);
    swapRegions(data.regions);
    if (data.success) setTimeout(() => setProgress(0), 1000);
  } catch (e) {
    console.error(e);
    notify('error', 'Could not connect to the analysis server');
    setProgress(0);
  }
}

$('uploadBtn').addEventListener('click', () => sendFile('/api/upload'));
$('deleteBtn').addEventListener('click', () => sendFile('/api/delete'));

// ---------------------------------------------------------------- auto-refresh

let lastUpdate = null;
let refreshTimer = null;

async function refreshTick() {
  try {
    const stats = await (await fetch('/api/stats')).json();
    if (!stats.last_update) return;
    const ts = Date.parse(stats.last_update);
    if (lastUpdate !== null && ts <= lastUpdate) return;
    lastUpdate = ts;
    $('updating').classList.add('active');
    const data = await (await fetch('/api/results')).json();
    swapRegions(data.regions);
  } catch (e) {
    console.error(e);
  } finally {
    $('updating').classList.remove('active');
  }
}

function startAutoRefresh() {
  stopAutoRefresh();
  refreshTimer = setInterval(refreshTick, REFRESH_MS);
}

function stopAutoRefresh() {
  if (refreshTimer !== null) { clearInterval(refreshTimer); refreshTimer = null; }
}

// ---------------------------------------------------------------- overlays

function toggleInfo() {
  const open = $('infoPanel').classList.toggle('active');
  $('infoToggle').textContent = open ? '✕ Close' : 'Show info';
}

function toggleChat() {
  const open = $('chatWindow').classList.toggle('active');
  if (open) setTimeout(() => $('chatInput').focus(), FOCUS_DELAY_MS);
}

$('infoToggle').addEventListener('click', (e) => { e.stopPropagation(); toggleInfo(); });
$('infoClose').addEventListener('click', (e) => { e.stopPropagation(); if ($('infoPanel').classList.contains('active')) toggleInfo(); });
$('chatBtn').addEventListener('click', (e) => { e.stopPropagation(); toggleChat(); });

document.addEventListener('click', (e) => {
  const inside = (id) => $(id).contains(e.target);
  const overlays = inside('infoPanel') || inside('infoToggle') || inside('chatWindow') || inside('chatBtn');
  if (overlays) return;
  if ($('infoPanel').classList.contains('active')) toggleInfo();
  if ($('chatWindow').classList.contains('active')) toggleChat();
});

document.addEventListener('keydown', (e) => {
  if (e.key !== 'Escape') return;
  if ($('chatWindow').classList.contains('active')) toggleChat();
  else if ($('infoPanel').classList.contains('active')) toggleInfo();
});

// ---------------------------------------------------------------- chat

let chatHistory = [];

function timeLabel(d) {
  return String(d.getHours()).padStart(2, '0') + ':' + String(d.getMinutes()).padStart(2, '0');
}

function addMessage(text, sender, when) {
  const box = $('chatMessages');
  const welcome = box.querySelector('.welcome-message');
  if (welcome && sender === 'user') welcome.remove();
  const div = document.createElement('div');
  div.className = 'message ' + sender + '-message';
  div.innerHTML = '<div class="message-content">' + esc(text) + '</div><div class="message-time">' + timeLabel(when || new Date()) + '</div>';
  box.appendChild(div);
  box.scrollTop = box.scrollHeight;
}

function saveHistory() {
  try { sessionStorage.setItem(HISTORY_KEY, JSON.stringify(chatHistory)); } catch (e) { console.error(e); }
}

function restoreHistory() {
  const nav = performance.getEntriesByType('navigation')[0];
  if (nav && nav.type === 'reload') { sessionStorage.removeItem(HISTORY_KEY); return; }
  try {
    chatHistory = JSON.parse(sessionStorage.getItem(HISTORY_KEY) || '[]');
    for (const m of chatHistory) addMessage(m.text, m.sender, new Date(m.timestamp));
  } catch (e) {
    chatHistory = [];
  }
}

async function sendMessage() {
  const input = $('chatInput');
  const text = input.value.trim();
  if (!text) return;
  input.value = '';
  addMessage(text, 'user');
  chatHistory.push({ text, sender: 'user', timestamp: new Date().toISOString() });
  saveHistory();

  const typing = document.createElement('div');
  typing.className = 'message bot-message typing-indicator';
  typing.textContent = '…';
  $('chatMessages').appendChild(typing);

  try {
    const res = await fetch('/api/chat', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify({ message: text }) });
    const data = await res.json();
    setTimeout(() => {
      typing.remove();
      addMessage(data.reply, 'bot');
      chatHistory.push({ text: data.reply, sender: 'bot', timestamp: new Date().toISOString() });
      saveHistory();
    }, data.delay_ms || 0);
  } catch (e) {
    typing.remove();
    console.error(e);
  }
}

async function clearChat() {
  const res = await fetch('/api/chat/clear', { method: 'POST' });
  const data = await res.json();
  chatHistory = [];
  saveHistory();
  $('chatMessages').innerHTML = '<div class="welcome-message"><p>' + esc($('chatMessages').dataset.welcome || '') + '</p></div>';
  addMessage(data.notice, 'bot');
}

$('chatSend').addEventListener('click', sendMessage);
$('chatClear').addEventListener('click', clearChat);
$('chatInput').addEventListener('keydown', (e) => {
  if (e.key === 'Enter' && !e.shiftKey) { e.preventDefault(); sendMessage(); }
});
for (const btn of document.querySelectorAll('.quick-reply')) {
  btn.addEventListener('click', () => { $('chatInput').value = btn.dataset.text; $('chatInput').focus(); });
}

// ---------------------------------------------------------------- init

(function init() {
  const welcome = $('chatMessages').querySelector('.welcome-message');
  if (welcome) $('chatMessages').dataset.welcome = welcome.textContent.trim();
  restoreHistory();
  if (FOCUS_ON_LOAD) setTimeout(() => $('chatInput').focus(), FOCUS_DELAY_MS);
  startAutoRefresh();
  for (const el of document.querySelectorAll('#notifications .notification:not(.error)')) {
    setTimeout(() => el.remove(), 5000);
  }
})();
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::notify::Level;

    fn page_with<'a>(view: &'a HtmlView, notes: &'a [Notification]) -> String {
        let overlays = Overlays::new(Duration::from_millis(300));
        page_with_overlays(view, notes, &overlays, Effect::None)
    }

    fn page_with_overlays(
        view: &HtmlView,
        notes: &[Notification],
        overlays: &Overlays,
        effect: Effect,
    ) -> String {
        render_page(&Page {
            view,
            notifications: notes,
            chat: "<div class=\"welcome-message\"><p>hi</p></div>",
            overlays,
            effect,
            refresh_ms: 30_000,
            max_upload_bytes: 10,
        })
    }

    #[test]
    fn all_placeholders_are_filled() {
        let view = HtmlView::new();
        let html = page_with(&view, &[]);
        assert!(!html.contains("{{"));
        assert!(html.contains("const REFRESH_MS = 30000;"));
        assert!(html.contains("const FOCUS_DELAY_MS = 300;"));
        assert!(html.contains("const FOCUS_ON_LOAD = false;"));
        assert!(html.contains("<aside id=\"infoPanel\" class=\"\">"));
    }

    #[test]
    fn open_chat_overlay_is_rendered_active() {
        let view = HtmlView::new();
        let mut overlays = Overlays::new(Duration::from_millis(120));
        let effect = overlays.toggle_chat();
        let html = page_with_overlays(&view, &[], &overlays, effect);
        assert!(html.contains("<div id=\"chatWindow\" class=\"active\">"));
        assert!(html.contains("<aside id=\"infoPanel\" class=\"\">"));
        assert!(html.contains("const FOCUS_ON_LOAD = true;"));
        assert!(html.contains("const FOCUS_DELAY_MS = 120;"));
    }

    #[test]
    fn notifications_are_escaped() {
        let view = HtmlView::new();
        let notes = [Notification::new(Level::Error, "<b>boom</b>")];
        let html = page_with(&view, &notes);
        assert!(html.contains("<div class=\"notification error\">&lt;b&gt;boom&lt;/b&gt;</div>"));
    }

    #[test]
    fn legend_and_quick_replies_present() {
        let view = HtmlView::new();
        let html = page_with(&view, &[]);
        assert!(html.contains("badge category-a"));
        assert!(html.contains("data-text=\"Что такое ABC анализ?\""));
    }

    #[test]
    fn markers_inside_substituted_values_stay_literal() {
        let view = HtmlView::new();
        let notes = [Notification::new(Level::Info, "{{TABLE}} and {{REFRESH_MS}}")];
        let html = page_with(&view, &notes);
        assert!(html.contains(
            "<div class=\"notification info\">{{TABLE}} and {{REFRESH_MS}}</div>"
        ));
        assert!(html.contains("const REFRESH_MS = 30000;"));
    }

    #[test]
    fn fill_template_skips_unknown_and_unterminated_markers() {
        let out = fill_template("a {{X}} {{Y}} {{ js }} {{X", |name| {
            (name == "X").then(|| "1".to_string())
        });
        assert_eq!(out, "a 1 {{Y}} {{ js }} {{X");
    }
}
