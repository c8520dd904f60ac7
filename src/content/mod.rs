//! Site content: page files, the page store and the HTML page shell.

mod page;
mod render;
mod store;

pub use page::{Page, normalize_page_path};
pub use render::render_page;
pub use store::PageStore;
