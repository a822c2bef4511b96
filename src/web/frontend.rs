//! Embedded HTML/CSS/JS frontend for the roadseg map viewer.
//!
//! The page is compiled into the binary as a string constant. Leaflet and
//! the OpenStreetMap tiles are the only external assets.

/// The complete single-page map viewer.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>roadseg Map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --red: #f85149;
  --yellow: #d29922;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
html, body { height: 100%; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  display: flex;
  flex-direction: column;
}

header {
  display: flex;
  align-items: center;
  gap: 16px;
  padding: 10px 16px;
  background: var(--surface);
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 16px; font-weight: 600; }
header .status { color: var(--text-muted); margin-left: auto; }
select, button {
  background: var(--bg);
  color: var(--text);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 4px 10px;
  font: inherit;
}
button:disabled, select:disabled { opacity: 0.5; }

#map { flex: 1; }

.legend {
  background: var(--surface);
  color: var(--text);
  padding: 8px 12px;
  border-radius: var(--radius);
  border: 1px solid var(--border);
  line-height: 1.7;
}
.legend h4 { margin-bottom: 4px; }
.legend i {
  display: inline-block;
  width: 18px;
  height: 5px;
  margin-right: 8px;
  vertical-align: middle;
  opacity: 0.7;
}

#toasts {
  position: fixed;
  top: 60px;
  right: 16px;
  z-index: 1000;
  display: flex;
  flex-direction: column;
  gap: 8px;
}
.toast {
  background: var(--surface);
  border: 1px solid var(--border);
  border-left: 4px solid var(--accent);
  border-radius: var(--radius);
  padding: 8px 12px;
  max-width: 360px;
}
.toast.error { border-left-color: var(--red); }
.toast.warning { border-left-color: var(--yellow); }
.toast small { display: block; color: var(--text-muted); }
</style>
</head>
<body>
<header>
  <h1>Road Segments</h1>
  <label>Date range
    <select id="dateRange">
      <option value="all">All</option>
      <option value="today">Today</option>
      <option value="week">Last 7 days</option>
      <option value="month">Last 30 days</option>
    </select>
  </label>
  <button id="reload">Reload</button>
  <span class="status" id="status">loading…</span>
</header>
<div id="map"></div>
<div id="toasts"></div>

<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script>
const map = L.map('map').setView([0, 0], 2);
L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
  attribution: '&copy; OpenStreetMap contributors',
  maxZoom: 19,
}).addTo(map);

let segmentLayer = L.layerGroup().addTo(map);
let fitted = false;
let busy = false;

const $ = (id) => document.getElementById(id);

function escapeHtml(s) {
  return String(s).replace(/[&<>"']/g, (c) => ({
    '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;',
  }[c]));
}

function toast(n) {
  const el = document.createElement('div');
  el.className = 'toast ' + n.level;
  el.innerHTML = escapeHtml(n.message) +
    (n.detail ? '<small>' + escapeHtml(n.detail) + '</small>' : '');
  $('toasts').appendChild(el);
  setTimeout(() => el.remove(), 6000);
}

function densityText(d) {
  const unit = d.unit === 'per_km' ? 'issues/km' : 'issues (no distance)';
  return d.value.toFixed(1) + ' ' + unit;
}

function popupHtml(p) {
  const speed = p.average_speed == null ? 'N/A' : p.average_speed.toFixed(1) + ' knots';
  return '<strong>Road Section</strong><br>' +
    'Total Issues: ' + p.total_issues + '<br>' +
    'Issue Density: ' + densityText(p.density) + '<br>' +
    'Average Speed: ' + speed + '<br>' +
    'Total Distance: ' + p.total_distance_km.toFixed(1) + ' km<br>' +
    'Time: ' + escapeHtml(p.start_time) + ' - ' + escapeHtml(p.end_time);
}

function draw(layer) {
  const next = L.layerGroup();
  for (const p of layer.polylines) {
    L.polyline(p.path, { color: p.color, weight: p.weight, opacity: p.opacity })
      .bindPopup(popupHtml(p.popup))
      .addTo(next);
  }
  map.removeLayer(segmentLayer);
  segmentLayer = next.addTo(map);

  if (!fitted && layer.polylines.length > 0) {
    map.fitBounds(layer.polylines.flatMap((p) => p.path));
    fitted = true;
  }
  $('status').textContent = layer.segment_count + ' segments in ' +
    layer.groups.length + ' sections (' + layer.date_range + ')';
}

function setBusy(b) {
  busy = b;
  $('reload').disabled = b;
  $('dateRange').disabled = b;
}

async function load() {
  if (busy) return;
  setBusy(true);
  try {
    const range = $('dateRange').value;
    const res = await fetch('/api/layer?dateRange=' + encodeURIComponent(range));
    const data = await res.json();
    if (!res.ok) {
      toast({ level: 'error', message: data.error || ('HTTP ' + res.status) });
      return;
    }
    if (data.layer) draw(data.layer);
    for (const n of data.notifications) toast(n);
  } catch (e) {
    toast({ level: 'error', message: 'Error loading road segments', detail: String(e) });
  } finally {
    setBusy(false);
  }
}

async function loadLegend() {
  const res = await fetch('/api/legend');
  const legend = await res.json();
  const control = L.control({ position: 'bottomright' });
  control.onAdd = () => {
    const div = L.DomUtil.create('div', 'legend');
    div.innerHTML = '<h4>' + escapeHtml(legend.title) + '</h4>' +
      legend.entries.map((e) =>
        '<i style="background:' + e.color + '"></i>' + escapeHtml(e.label)
      ).join('<br>');
    return div;
  };
  control.addTo(map);
}

$('dateRange').addEventListener('change', load);
$('reload').addEventListener('click', load);

fetch('/api/config')
  .then((r) => r.json())
  .then((c) => { $('dateRange').value = c.config.backend.default_date_range; })
  .catch(() => {})
  .finally(() => { loadLegend(); load(); });
</script>
</body>
</html>
"##;
