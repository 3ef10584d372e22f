use crate::domain::model::WvwOwner;
use colored::{Color, Colorize};

pub struct Theme {
    pub title: fn(&str) -> String,
    pub line: fn(&str) -> String,
    pub label: fn(&str) -> String,
    pub dim: fn(&str) -> String,
    pub warning: fn(&str) -> String,
    red: Color,
    blue: Color,
    green: Color,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name {
            "normal" | "" => Self::normal(),
            "colorblind" => Self::colorblind(),
            _ => {
                eprintln!("{}", format!("✘ Unknown theme: {}", name).red());
                Self::normal() // Fallback to default
            }
        }
    }

    fn normal() -> Self {
        Self {
            title: |s| s.bright_white().bold().underline().to_string(),
            line: |s| s.bright_black().dimmed().to_string(),
            label: |s| s.cyan().to_string(),
            dim: |s| s.bright_black().to_string(),
            warning: |s| s.yellow().bold().to_string(),
            red: Color::TrueColor {
                r: 213,
                g: 71,
                b: 67,
            },
            blue: Color::TrueColor {
                r: 100,
                g: 164,
                b: 228,
            },
            green: Color::TrueColor {
                r: 73,
                g: 190,
                b: 111,
            },
        }
    }

    // 色弱友好: 红/绿换成橙/紫
    fn colorblind() -> Self {
        Self {
            red: Color::TrueColor {
                r: 230,
                g: 159,
                b: 0,
            },
            blue: Color::TrueColor {
                r: 86,
                g: 180,
                b: 233,
            },
            green: Color::TrueColor {
                r: 204,
                g: 121,
                b: 167,
            },
            ..Self::normal()
        }
    }

    pub fn team_color(&self, owner: WvwOwner) -> Color {
        match owner {
            WvwOwner::Red => self.red,
            WvwOwner::Blue => self.blue,
            WvwOwner::Green => self.green,
            WvwOwner::Neutral | WvwOwner::Unknown => Color::TrueColor {
                r: 105,
                g: 105,
                b: 105,
            },
        }
    }

    pub fn team(&self, owner: WvwOwner, text: &str) -> String {
        text.color(self.team_color(owner)).bold().to_string()
    }
}
