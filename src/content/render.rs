//! Page shell: wraps a rendered document in a complete HTML page.

use super::page::Page;
use crate::{
    config::SiteConfig,
    document::{RenderMode, render_document},
    utils::xml::{
        create_writer, into_string, write_empty_elem, write_end, write_raw, write_start,
        write_text_element,
    },
};
use anyhow::Result;

/// Client-side tab switching for `data-tabs` groups.
const TABS_SCRIPT: &str = r#"document.addEventListener("click",function(e){var t=e.target.closest('[data-tabs] [role="tab"]');if(!t)return;var g=t.closest("[data-tabs]");g.querySelectorAll('[role="tab"]').forEach(function(b){var s=b===t;b.setAttribute("aria-selected",s?"true":"false");var p=document.getElementById(b.getAttribute("aria-controls"));if(p)p.hidden=!s;});});"#;

/// Render a page to a complete HTML document.
pub fn render_page(page: &Page, config: &SiteConfig, mode: RenderMode) -> Result<String> {
    let site = &config.site;
    let title = if page.title.is_empty() {
        site.title.clone()
    } else {
        format!("{} | {}", page.title, site.title)
    };
    let og_image = format!(
        "{}/~site/ogimage/{}",
        site.url.as_deref().unwrap_or("").trim_end_matches('/'),
        page.path
    );

    let mut writer = create_writer();
    write_raw(&mut writer, "<!DOCTYPE html>")?;
    write_start(&mut writer, "html", &[("lang", site.language.as_str())])?;

    write_start(&mut writer, "head", &[])?;
    write_empty_elem(&mut writer, "meta", &[("charset", "utf-8")])?;
    write_empty_elem(
        &mut writer,
        "meta",
        &[("name", "viewport"), ("content", "width=device-width, initial-scale=1")],
    )?;
    write_text_element(&mut writer, "title", &[], &title)?;
    if !page.description.is_empty() {
        write_empty_elem(
            &mut writer,
            "meta",
            &[("name", "description"), ("content", page.description.as_str())],
        )?;
    }
    write_empty_elem(
        &mut writer,
        "meta",
        &[("property", "og:title"), ("content", title.as_str())],
    )?;
    write_empty_elem(
        &mut writer,
        "meta",
        &[("property", "og:image"), ("content", og_image.as_str())],
    )?;
    for theme in ["light", "dark"] {
        let href = format!("/~site/icon?size=small&theme={theme}");
        let media = format!("(prefers-color-scheme: {theme})");
        write_empty_elem(
            &mut writer,
            "link",
            &[
                ("rel", "icon"),
                ("type", "image/png"),
                ("href", href.as_str()),
                ("media", media.as_str()),
            ],
        )?;
    }
    write_end(&mut writer, "head")?;

    let body_class = match mode {
        RenderMode::Default => "",
        RenderMode::Print => "print-mode",
    };
    write_start(&mut writer, "body", &[("class", body_class)])?;
    write_start(&mut writer, "main", &[])?;
    write_text_element(&mut writer, "h1", &[], &page.title)?;
    if !page.description.is_empty() {
        write_text_element(&mut writer, "p", &[("class", "page-description")], &page.description)?;
    }
    write_raw(&mut writer, &render_document(&page.document, mode)?)?;
    write_end(&mut writer, "main")?;

    if mode == RenderMode::Default {
        write_start(&mut writer, "script", &[])?;
        write_raw(&mut writer, TABS_SCRIPT)?;
        write_end(&mut writer, "script")?;
    }
    write_end(&mut writer, "body")?;
    write_end(&mut writer, "html")?;

    into_string(writer)
}
