//! Formatted output helpers for CLI commands.

use berth_mount::MountTable;

/// Renders a mount table as tab-separated rows under a header.
#[must_use]
pub fn format_mount_table(table: &MountTable) -> String {
    let mut out = String::from("DESTINATION\tMODE\tDRIVER\tNAME\tSOURCE");
    for mp in table.values() {
        let source = mp
            .host_path()
            .ok()
            .flatten()
            .map_or_else(|| "-".to_owned(), |p| p.display().to_string());
        let mode = if mp.read_write { "rw" } else { "ro" };
        out.push_str(&format!(
            "\n{}\t{mode}\t{}\t{}\t{source}",
            mp.destination.display(),
            dash_if_empty(&mp.driver),
            dash_if_empty(&mp.name),
        ));
    }
    out
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
