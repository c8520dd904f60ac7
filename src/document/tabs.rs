//! Tabs rendering.
//!
//! Interactive pages render every tab of a `tabs` block into one group.
//! Switching is left to the client-side widget, which relies on this markup:
//!
//! ```html
//! <div class="..." data-tabs="{group id}">
//!   <div role="tablist">
//!     <button role="tab" id="tab-{tab}" aria-controls="tabpanel-{tab}" aria-selected="true">..</button>
//!   </div>
//!   <div role="tabpanel" id="tabpanel-{tab}" aria-labelledby="tab-{tab}">..</div>
//! </div>
//! ```
//!
//! Print mode renders each tab as its own single-tab group, so every panel
//! is visible on paper.

use super::{
    blocks::{BlockProps, BlocksOptions, DocumentContext, RenderMode, write_blocks},
    node::Block,
};
use crate::utils::xml::{
    XmlWriter, create_writer, into_string, write_end, write_raw, write_start, write_text_element,
};
use anyhow::Result;

/// Block style of blocks inside a tab body.
pub const TAB_BLOCK_STYLE: &str = "flip-heading-hash";
/// Container style of a tab body.
pub const TAB_BODY_STYLE: &str = "w-full space-y-4";

/// A rendered tab.
#[derive(Debug)]
struct TabItem<'a> {
    id: String,
    title: &'a str,
    body: String,
}

pub fn write_tabs(
    writer: &mut XmlWriter,
    ctx: &DocumentContext<'_>,
    props: &BlockProps<'_>,
) -> Result<()> {
    let tabs = tab_items(ctx, props)?;

    match ctx.mode {
        RenderMode::Print => {
            for tab in &tabs {
                write_tab_group(writer, &tab.id, props.style, std::slice::from_ref(tab))?;
            }
            Ok(())
        }
        RenderMode::Default => write_tab_group(writer, props.key, props.style, &tabs),
    }
}

fn tab_items<'a>(ctx: &DocumentContext<'_>, props: &BlockProps<'a>) -> Result<Vec<TabItem<'a>>> {
    let tabs_block = props.block;

    tabs_block
        .child_blocks()
        .into_iter()
        .enumerate()
        .map(|(index, tab)| {
            let mut ancestors = props.ancestors.to_vec();
            ancestors.push(tabs_block);
            ancestors.push(tab);

            let mut body = create_writer();
            write_blocks(
                &mut body,
                ctx,
                &tab.child_blocks(),
                &ancestors,
                &BlocksOptions {
                    style: TAB_BODY_STYLE,
                    block_style: TAB_BLOCK_STYLE,
                    ..BlocksOptions::default()
                },
            )?;

            Ok(TabItem {
                id: tab_id(tab, props.key, index),
                title: tab.data.title.as_deref().unwrap_or(""),
                body: into_string(body)?,
            })
        })
        .collect()
}

/// Anchor id of a tab: its meta id, its key, or `{tabs key}-{index}`.
fn tab_id(tab: &Block, tabs_key: &str, index: usize) -> String {
    tab.meta
        .id
        .clone()
        .or_else(|| tab.key.clone())
        .unwrap_or_else(|| format!("{tabs_key}-{index}"))
}

fn write_tab_group(
    writer: &mut XmlWriter,
    id: &str,
    style: &str,
    tabs: &[TabItem<'_>],
) -> Result<()> {
    write_start(writer, "div", &[("class", style), ("data-tabs", id)])?;

    write_start(writer, "div", &[("role", "tablist"), ("class", "tabs-list")])?;
    for (index, tab) in tabs.iter().enumerate() {
        let tab_elem = format!("tab-{}", tab.id);
        let panel = format!("tabpanel-{}", tab.id);
        let selected = if index == 0 { "true" } else { "false" };
        write_text_element(
            writer,
            "button",
            &[
                ("type", "button"),
                ("role", "tab"),
                ("id", tab_elem.as_str()),
                ("aria-controls", panel.as_str()),
                ("aria-selected", selected),
                ("data-tab", tab.id.as_str()),
            ],
            tab.title,
        )?;
    }
    write_end(writer, "div")?;

    for (index, tab) in tabs.iter().enumerate() {
        let tab_elem = format!("tab-{}", tab.id);
        let panel = format!("tabpanel-{}", tab.id);
        let mut attrs = vec![
            ("role", "tabpanel"),
            ("id", panel.as_str()),
            ("aria-labelledby", tab_elem.as_str()),
        ];
        if index > 0 {
            attrs.push(("hidden", ""));
        }
        write_start(writer, "div", &attrs)?;
        write_raw(writer, &tab.body)?;
        write_end(writer, "div")?;
    }

    write_end(writer, "div")
}
