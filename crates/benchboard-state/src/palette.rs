use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Color scheme threaded explicitly into every render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

/// Hue in degrees, saturation and lightness in percent, alpha in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsla {
    pub h: f64,
    pub s: f64,
    pub l: f64,
    pub a: f64,
}

impl Hsla {
    pub const fn new(h: f64, s: f64, l: f64, a: f64) -> Self {
        Self { h, s, l, a }
    }

    /// sRGB conversion for terminals that take truecolor values.
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        let s = self.s / 100.0;
        let l = self.l / 100.0;
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let h = self.h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        (channel(r), channel(g), channel(b))
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsla({}, {}%, {}%, {})", self.h, self.s, self.l, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemePalette {
    pub grid: Hsla,
    pub axis: Hsla,
    pub border: Hsla,
}

impl ThemePalette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                grid: Hsla::new(240.0, 5.0, 89.0, 1.0),
                axis: Hsla::new(240.0, 5.0, 26.0, 1.0),
                border: Hsla::new(240.0, 5.0, 84.0, 1.0),
            },
            Theme::Dark => Self {
                grid: Hsla::new(240.0, 5.0, 26.0, 1.0),
                axis: Hsla::new(240.0, 6.0, 90.0, 1.0),
                border: Hsla::new(240.0, 5.0, 36.0, 1.0),
            },
        }
    }
}

// (vendor, light, dark)
const VENDOR_COLORS: &[(&str, Hsla, Hsla)] = &[
    ("openai", Hsla::new(0.0, 0.0, 25.0, 0.8), Hsla::new(0.0, 0.0, 50.0, 0.8)),
    ("google", Hsla::new(134.0, 51.0, 42.0, 0.8), Hsla::new(134.0, 65.0, 60.0, 0.8)),
    ("anthropic", Hsla::new(15.0, 52.0, 58.0, 0.8), Hsla::new(15.0, 64.0, 70.0, 0.8)),
    ("x-ai", Hsla::new(270.0, 70.0, 50.0, 0.8), Hsla::new(270.0, 80.0, 70.0, 0.8)),
    ("deepseek", Hsla::new(214.0, 61.0, 44.0, 0.8), Hsla::new(214.0, 75.0, 65.0, 0.8)),
    ("mistralai", Hsla::new(26.0, 100.0, 50.0, 0.8), Hsla::new(26.0, 100.0, 68.0, 0.8)),
    ("qwen", Hsla::new(23.0, 82.0, 31.0, 0.8), Hsla::new(23.0, 94.0, 49.0, 0.8)),
    ("z-ai", Hsla::new(213.0, 79.0, 31.0, 0.8), Hsla::new(213.0, 91.0, 49.0, 0.8)),
    ("minimax", Hsla::new(343.0, 63.0, 32.0, 0.8), Hsla::new(343.0, 75.0, 50.0, 0.8)),
    ("moonshotai", Hsla::new(212.0, 97.0, 29.0, 0.8), Hsla::new(212.0, 100.0, 47.0, 0.8)),
];

/// Stable color for a vendor; unknown vendors get the theme's border tone.
pub fn vendor_color(theme: Theme, vendor: &str) -> Hsla {
    let found = VENDOR_COLORS
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(vendor));
    match (found, theme) {
        (Some((_, light, _)), Theme::Light) => *light,
        (Some((_, _, dark)), Theme::Dark) => *dark,
        (None, _) => {
            let border = ThemePalette::for_theme(theme).border;
            Hsla { a: 0.8, ..border }
        }
    }
}

/// One color per seed, in the order given (callers pass seeds sorted).
/// Hues are spread evenly around the wheel; saturation steps by index mod 3.
pub fn seed_colors(theme: Theme, seeds: &[String]) -> Vec<Hsla> {
    let n = seeds.len().max(1) as f64;
    let lightness = match theme {
        Theme::Light => 45.0,
        Theme::Dark => 55.0,
    };
    (0..seeds.len())
        .map(|i| {
            let hue = i as f64 * 360.0 / n;
            let saturation = 60.0 + (i % 3) as f64 * 10.0;
            Hsla::new(hue, saturation, lightness, 0.8)
        })
        .collect()
}
