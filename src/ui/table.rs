use crate::kind::LinkKind;
use crate::link::LegacyLink;
use crate::storage::LinkStats;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct LinkRow {
    #[tabled(rename = "Legacy ID")]
    legacy_id: i64,
    #[tabled(rename = "Owned")]
    owned: String,
    #[tabled(rename = "Last Synced")]
    last_synced: String,
}

impl From<&LegacyLink> for LinkRow {
    fn from(link: &LegacyLink) -> Self {
        Self {
            legacy_id: link.legacy_id.get(),
            owned: link
                .owned_ref
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
            last_synced: link
                .last_synced_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Links")]
    links: usize,
    #[tabled(rename = "Linked")]
    linked: usize,
    #[tabled(rename = "Orphaned")]
    orphaned: usize,
    #[tabled(rename = "Owned")]
    owned: usize,
}

pub fn links_table(links: &[LegacyLink]) -> String {
    if links.is_empty() {
        return String::new();
    }
    let rows: Vec<LinkRow> = links.iter().map(LinkRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &LinkStats) -> String {
    let rows: Vec<StatsRow> = LinkKind::all()
        .iter()
        .map(|kind| {
            let s = stats.for_kind(*kind);
            StatsRow {
                kind: kind.as_str(),
                links: s.links,
                linked: s.linked,
                orphaned: s.orphaned,
                owned: s.owned,
            }
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}
