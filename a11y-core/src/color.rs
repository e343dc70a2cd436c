// Colour parsing and WCAG contrast math.
//
// Relative luminance: https://www.w3.org/TR/WCAG21/#dfn-relative-luminance

use regex::Regex;
use std::sync::LazyLock;

static RGB_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*([\d.]+%?)[\s,]+([\d.]+%?)[\s,]+([\d.]+%?)").unwrap()
});

static HSL_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^hsla?\(\s*(-?[\d.]+)(?:deg)?[\s,]+([\d.]+)%[\s,]+([\d.]+)%").unwrap()
});

/// Minimum ratio for normal-size text.
pub const NORMAL_TEXT_MIN_RATIO: f64 = 4.5;
/// Minimum ratio for large text.
pub const LARGE_TEXT_MIN_RATIO: f64 = 3.0;

/// Luminance at or above which a colour counts as light.
const LIGHT_LUMINANCE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn relative_luminance(self) -> f64 {
        let channels = [self.r, self.g, self.b].map(|c| {
            let v = c as f64 / 255.0;
            if v <= 0.04045 {
                v / 12.92
            } else {
                ((v + 0.055) / 1.055).powf(2.4)
            }
        });
        0.2126 * channels[0] + 0.7152 * channels[1] + 0.0722 * channels[2]
    }

    pub fn is_light(self) -> bool {
        self.relative_luminance() >= LIGHT_LUMINANCE
    }

    /// Black or white, whichever contrasts more with `self`.
    pub fn best_extreme(self) -> Rgb {
        if contrast_ratio(self, Rgb::BLACK) >= contrast_ratio(self, Rgb::WHITE) {
            Rgb::BLACK
        } else {
            Rgb::WHITE
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Contrast ratio between two colours, in `1.0..=21.0`.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = a.relative_luminance();
    let lb = b.relative_luminance();
    let (lighter, darker) = if la > lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Parse a CSS colour value. Returns `None` for anything unrecognised,
/// including `transparent`, `inherit` and `currentColor`.
pub fn parse_color(value: &str) -> Option<Rgb> {
    let value = value.trim().trim_end_matches("!important").trim().to_ascii_lowercase();
    if let Some(hex) = value.strip_prefix('#') {
        parse_hex(hex)
    } else if value.starts_with("rgb") {
        parse_rgb_function(&value)
    } else if value.starts_with("hsl") {
        parse_hsl_function(&value)
    } else {
        named_color(&value)
    }
}

fn parse_hex(hex: &str) -> Option<Rgb> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        // #rgb and #rgba
        3 | 4 => Some(Rgb::new(
            channel(&hex[0..1].repeat(2))?,
            channel(&hex[1..2].repeat(2))?,
            channel(&hex[2..3].repeat(2))?,
        )),
        // #rrggbb and #rrggbbaa
        6 | 8 => Some(Rgb::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

fn parse_rgb_function(value: &str) -> Option<Rgb> {
    let caps = RGB_FUNCTION.captures(value)?;
    let channel = |raw: &str| -> Option<u8> {
        let number = match raw.strip_suffix('%') {
            Some(percent) => percent.parse::<f64>().ok()? * 2.55,
            None => raw.parse::<f64>().ok()?,
        };
        Some(number.round().clamp(0.0, 255.0) as u8)
    };
    Some(Rgb::new(channel(&caps[1])?, channel(&caps[2])?, channel(&caps[3])?))
}

fn parse_hsl_function(value: &str) -> Option<Rgb> {
    let caps = HSL_FUNCTION.captures(value)?;
    let hue = caps[1].parse::<f64>().ok()?.rem_euclid(360.0);
    let saturation = (caps[2].parse::<f64>().ok()? / 100.0).clamp(0.0, 1.0);
    let lightness = (caps[3].parse::<f64>().ok()? / 100.0).clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = chroma * (1.0 - ((hue / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = lightness - chroma / 2.0;
    let (r, g, b) = match hue {
        h if h < 60.0 => (chroma, x, 0.0),
        h if h < 120.0 => (x, chroma, 0.0),
        h if h < 180.0 => (0.0, chroma, x),
        h if h < 240.0 => (0.0, x, chroma),
        h if h < 300.0 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let scale = |c: f64| ((c + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Some(Rgb::new(scale(r), scale(g), scale(b)))
}

fn named_color(name: &str) -> Option<Rgb> {
    let (r, g, b) = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "dimgray" | "dimgrey" => (105, 105, 105),
        "silver" => (192, 192, 192),
        "brown" => (165, 42, 42),
        "orange" => (255, 165, 0),
        "pink" => (255, 192, 203),
        "gold" => (255, 215, 0),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "lime" => (0, 255, 0),
        "aqua" | "cyan" => (0, 255, 255),
        "fuchsia" | "magenta" => (255, 0, 255),
        "darkred" => (139, 0, 0),
        "darkgreen" => (0, 100, 0),
        "darkblue" => (0, 0, 139),
        "gainsboro" => (220, 220, 220),
        "whitesmoke" => (245, 245, 245),
        "beige" => (245, 245, 220),
        "ivory" => (255, 255, 240),
        "cornsilk" => (255, 248, 220),
        "linen" => (250, 240, 230),
        "lightyellow" => (255, 255, 224),
        "lightcyan" => (224, 255, 255),
        "lightblue" => (173, 216, 230),
        "lavender" => (230, 230, 250),
        "mistyrose" => (255, 228, 225),
        "lemonchiffon" => (255, 250, 205),
        "honeydew" => (240, 255, 240),
        "mintcream" => (245, 255, 250),
        _ => return None,
    };
    Some(Rgb::new(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_white_is_21() {
        let ratio = contrast_ratio(Rgb::BLACK, Rgb::WHITE);
        assert!((ratio - 21.0).abs() < 0.01, "got {ratio}");
    }

    #[test]
    fn test_same_color_is_1() {
        let grey = Rgb::new(119, 119, 119);
        assert!((contrast_ratio(grey, grey) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ratio_is_symmetric() {
        let a = Rgb::new(51, 102, 153);
        let b = Rgb::new(240, 240, 240);
        assert_eq!(contrast_ratio(a, b), contrast_ratio(b, a));
    }

    #[test]
    fn test_parse_formats() {
        assert_eq!(parse_color("#fff"), Some(Rgb::WHITE));
        assert_eq!(parse_color("#FF0000"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_color("#00ff0080"), Some(Rgb::new(0, 255, 0)));
        assert_eq!(parse_color("rgb(10, 20, 30)"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(parse_color("rgba(10,20,30,0.5)"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(parse_color("rgb(100%, 0%, 50%)"), Some(Rgb::new(255, 0, 128)));
        assert_eq!(parse_color("hsl(0, 100%, 50%)"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(parse_color("hsl(120deg 100% 25%)"), Some(Rgb::new(0, 128, 0)));
        assert_eq!(parse_color(" White !important"), Some(Rgb::WHITE));
        assert_eq!(parse_color("transparent"), None);
        assert_eq!(parse_color("#ggg"), None);
        assert_eq!(parse_color("#12345"), None);
    }

    #[test]
    fn test_light_and_extremes() {
        assert!(parse_color("#eee").unwrap().is_light());
        assert!(parse_color("lightyellow").unwrap().is_light());
        assert!(!parse_color("gray").unwrap().is_light());
        assert_eq!(Rgb::WHITE.best_extreme(), Rgb::BLACK);
        assert_eq!(parse_color("navy").unwrap().best_extreme(), Rgb::WHITE);
        assert_eq!(Rgb::new(255, 255, 0).to_hex(), "#ffff00");
    }

    #[test]
    fn test_known_mid_ratio() {
        // #767676 on white is the classic 4.54:1 pair.
        let ratio = contrast_ratio(parse_color("#767676").unwrap(), Rgb::WHITE);
        assert!(ratio > 4.5 && ratio < 4.6, "got {ratio}");
    }
}
