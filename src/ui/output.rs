use crate::link::LegacyLink;
use crate::output::is_quiet;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::DATABASE, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, label.style(theme().dim.clone()), value);
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

/// One-line rendering of a link: `🔗 collection 42 -> abc (synced ...)`
pub fn link_line(link: &LegacyLink) {
    let icon = if link.is_orphaned() { Icons::BROKEN } else { Icons::LINK };
    let target = match &link.owned_ref {
        Some(owned) => owned.as_str().style(theme().owned.clone()).to_string(),
        None => "∅".style(theme().dim.clone()).to_string(),
    };
    let synced = link
        .last_synced_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never synced".to_string());

    println!(
        "{} {} {} -> {} {}",
        icon,
        link.kind,
        link.legacy_id.style(theme().legacy.clone()),
        target,
        format!("({})", synced).style(theme().dim.clone())
    );
}
