mod feed_panel;
mod fps;
mod panels;
mod pipeline_panel;
