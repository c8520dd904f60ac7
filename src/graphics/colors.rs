//! Color parsing and WCAG contrast.

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Base background of the light theme.
pub const LIGHT_BASE: &str = "#ffffff";
/// Base background of the dark theme.
pub const DARK_BASE: &str = "#111827";

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (alpha ignored).
pub fn parse_hex(color: &str) -> Option<Rgb> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some(Rgb {
                r: digits.next()??,
                g: digits.next()??,
                b: digits.next()??,
            })
        }
        6 | 8 => Some(Rgb {
            r: channel(&hex[0..2])?,
            g: channel(&hex[2..4])?,
            b: channel(&hex[4..6])?,
        }),
        _ => None,
    }
}

/// Relative luminance as defined by WCAG 2.
pub fn relative_luminance(color: Rgb) -> f64 {
    let linear = |c: u8| {
        let c = f64::from(c) / 255.0;
        if c <= 0.039_28 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(color.r) + 0.7152 * linear(color.g) + 0.0722 * linear(color.b)
}

/// Contrast ratio between two colors, from 1 to 21.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let (la, lb) = (relative_luminance(a), relative_luminance(b));
    let (lighter, darker) = if la > lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Pick the candidate with the highest contrast against `background`.
///
/// Unparseable candidates are skipped; when the background itself cannot be
/// parsed the first candidate wins.
pub fn color_contrast<'a>(background: &str, candidates: &[&'a str]) -> &'a str {
    let first = candidates.first().copied().unwrap_or(DARK_BASE);
    let Some(bg) = parse_hex(background) else {
        return first;
    };

    candidates
        .iter()
        .filter_map(|c| parse_hex(c).map(|rgb| (*c, contrast_ratio(bg, rgb))))
        .fold(None, |best: Option<(&str, f64)>, (c, ratio)| match best {
            Some((_, best_ratio)) if best_ratio >= ratio => best,
            _ => Some((c, ratio)),
        })
        .map_or(first, |(c, _)| c)
}
