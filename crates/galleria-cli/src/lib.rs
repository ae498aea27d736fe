use galleria_core::GalleryItem;

/// Truncate a string to `max_len` characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render active items as a fixed-width table.
pub fn format_item_table(items: &[GalleryItem]) -> String {
    if items.is_empty() {
        return "No gallery items found.".to_string();
    }

    let mut out = format!(
        "{:<36} {:<6} {:<30} {:>5} {:>8} {:>20}\n",
        "ID", "Kind", "Title", "Order", "Featured", "Created At"
    );
    out.push_str(&"-".repeat(110));
    out.push('\n');

    for item in items {
        out.push_str(&format!(
            "{:<36} {:<6} {:<30} {:>5} {:>8} {:>20}\n",
            item.id,
            item.media_kind.as_str(),
            truncate_string(item.title.as_deref().unwrap_or("-"), 30),
            item.order_index,
            if item.featured { "yes" } else { "no" },
            item.created_at.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}

/// Initialize tracing for the CLI. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("galleria=debug,info")),
        )
        .init();
}
