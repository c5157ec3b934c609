//! Formatting symbols for server-list and disconnect messages.

/// The section sign that prefixes every colour and style code.
pub const SECTION: &str = "§";

pub const BLACK: &str = "§0";
pub const BLUE: &str = "§1";
pub const GREEN: &str = "§2";
pub const AQUA: &str = "§3";
pub const RED: &str = "§4";
pub const PURPLE: &str = "§5";
pub const GOLD: &str = "§6";
pub const LIGHT_GRAY: &str = "§7";
pub const GRAY: &str = "§8";
pub const LIGHT_BLUE: &str = "§9";
pub const LIGHT_GREEN: &str = "§a";
pub const LIGHT_AQUA: &str = "§b";
pub const LIGHT_RED: &str = "§c";
pub const PINK: &str = "§d";
pub const YELLOW: &str = "§e";
pub const WHITE: &str = "§f";

pub const SCRAMBLE: &str = "§k";
pub const BOLD: &str = "§l";
pub const STRIKETHROUGH: &str = "§m";
pub const UNDERLINE: &str = "§n";
pub const ITALIC: &str = "§o";
pub const RESET: &str = "§r";

/// Rewrites `&`-prefixed formatting codes into their `§` wire form, leaving
/// every other byte untouched.
pub fn format(message: &str) -> String {
    message.replace('&', SECTION)
}
