//! List published posts

use anyhow::Result;

use crate::content::reading_time_minutes;
use crate::helpers::format_date;
use crate::pages::{fetch_listing, fetch_post, LoadMore};
use crate::Blog;

/// Print every post, most recently modified first, with its reading time
pub async fn run(blog: &Blog) -> Result<()> {
    let source = blog.content_source()?;
    let content = &blog.config.content;

    let first = fetch_listing(source.as_ref(), content, content.static_page_size, None).await?;
    let listing = LoadMore::new(first);
    while listing.has_more() {
        listing.load(source.as_ref()).await?;
    }

    let posts = listing.into_state().results;
    println!("Posts ({}):", posts.len());
    for summary in posts {
        let date = summary
            .first_publication_date
            .map(|d| format_date(&d, &blog.config.date_format, &blog.config.language))
            .unwrap_or_else(|| "-".to_string());

        let minutes = match summary.id.as_deref() {
            Some(id) => {
                let post = fetch_post(source.as_ref(), content, id, None).await?;
                format!("{} min", reading_time_minutes(&post))
            }
            None => "?".to_string(),
        };

        println!(
            "  {} - {} [{}] ({})",
            date,
            summary.title,
            summary.id.as_deref().unwrap_or("no uid"),
            minutes
        );
    }

    Ok(())
}
