//! User interface rendering modules.

mod charts;
mod devices;
mod dialogs;
mod footer;
mod header;
mod layout;
mod processes;

pub use layout::render_ui;
