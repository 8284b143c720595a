pub mod exporter;
pub mod markdown;

pub use exporter::{
    DirectoryShareTarget, ExportError, ExportFormat, Exporter, ShareTarget, UnavailableShareTarget,
};
pub use markdown::{render_markdown, render_recipe};
