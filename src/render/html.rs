use crate::render::map::MapView;

/// Render a self-contained HTML choropleth (map data embedded as JSON).
///
/// Important: we avoid `format!()` because the HTML contains many `{}` from JS
/// template literals (e.g., `${x}`), which would conflict with Rust formatting.
pub fn render_html_map(view: &MapView) -> anyhow::Result<String> {
    let json = serde_json::to_string(view)?; // embedded as JS object literal

    const TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Manageable rain height by sewershed</title>
<style>
  body { font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial, sans-serif; margin: 0; }
  header { padding: 12px 16px; border-bottom: 1px solid #ddd; }
  .summary { display: flex; gap: 16px; flex-wrap: wrap; font-size: 14px; color: #333; }
  .pill { padding: 4px 8px; border: 1px solid #ddd; border-radius: 999px; background: #fafafa; }
  .main { padding: 12px; }
  svg.map { width: 100%; max-height: calc(100vh - 160px); }
  svg.map path { fill-rule: evenodd; stroke-width: 1; vector-effect: non-scaling-stroke; }
  svg.map path.overlay:hover { stroke-width: 2; }
  svg.map text { font-size: 12px; text-anchor: middle; dominant-baseline: middle;
                 fill: black; stroke: white; stroke-width: 4px; paint-order: stroke; }
  .legend { margin: 8px auto 0; max-width: 600px; font-size: 13px; color: #333; }
  .bar { height: 14px; border: 1px solid #999; }
  .ticks { display: flex; justify-content: space-between; font-variant-numeric: tabular-nums; }
  .muted { color: #777; font-size: 12px; }
</style>
</head>
<body>
<header>
  <div class="summary" id="summary"></div>
</header>

<div class="main">
  <svg class="map" id="map" xmlns="http://www.w3.org/2000/svg"></svg>
  <div class="legend" id="legend"></div>
  <div class="muted" id="hover"></div>
</div>

<script>
// Embedded map data (JSON object literal)
const DATA = __DATA__;
const SVG_NS = "http://www.w3.org/2000/svg";

function escapeHtml(s) {
  return String(s)
    .replaceAll("&", "&amp;")
    .replaceAll("<", "&lt;")
    .replaceAll(">", "&gt;")
    .replaceAll('"', "&quot;")
    .replaceAll("'", "&#39;");
}

function renderSummary() {
  const t = DATA.totals;
  const el = document.getElementById("summary");
  el.innerHTML = `
    <span class="pill">sewersheds: <b>${t.sewersheds}</b></span>
    <span class="pill">with rain height: <b>${t.with_rain_height}</b></span>
    <span class="pill">non-finite: <b>${t.non_finite}</b></span>
  `;
}

function addShape(svg, shape, cls) {
  const p = document.createElementNS(SVG_NS, "path");
  p.setAttribute("d", shape.path);
  p.setAttribute("fill", shape.fill);
  p.setAttribute("stroke", shape.stroke);
  p.setAttribute("class", cls);
  if (shape.key) {
    p.onmouseenter = () => {
      document.getElementById("hover").textContent = `sewershed: ${shape.key}`;
    };
  }
  svg.appendChild(p);
}

function renderMap() {
  const svg = document.getElementById("map");
  svg.setAttribute("viewBox", `0 0 ${DATA.width} ${DATA.height}`);
  for (const s of DATA.base) addShape(svg, s, "base");
  for (const s of DATA.overlay) addShape(svg, s, "overlay");
  for (const l of DATA.labels) {
    const t = document.createElementNS(SVG_NS, "text");
    t.setAttribute("x", l.x);
    t.setAttribute("y", l.y);
    t.textContent = l.text;
    svg.appendChild(t);
  }
}

function renderLegend() {
  const el = document.getElementById("legend");
  const lg = DATA.legend;
  if (!lg) {
    el.innerHTML = `<span class="muted">no finite rain heights to scale</span>`;
    return;
  }
  el.innerHTML = `
    <div class="bar" style="background: linear-gradient(to right, ${lg.stops.join(", ")});"></div>
    <div class="ticks"><span>${escapeHtml(lg.min_text)}</span><span>${escapeHtml(lg.max_text)}</span></div>
    <div style="text-align:center;">${escapeHtml(lg.label)}</div>
  `;
}

renderSummary();
renderMap();
renderLegend();
</script>
</body>
</html>
"#;

    Ok(TEMPLATE.replace("__DATA__", &json))
}
