//! Choropleth rendering: view model, color scale, and the HTML page.

pub mod html;
pub mod map;
pub mod scale;

pub use html::render_html_map;
pub use map::build_map_view;
