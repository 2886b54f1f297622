//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::Blog;

/// Export the listing and every published post into the public directory
pub async fn run(blog: &Blog) -> Result<()> {
    let start = std::time::Instant::now();

    let source = blog.content_source()?;
    tracing::info!("Fetching posts from {}", source.name());
    let generator = Generator::new(blog, source)?;
    let report = generator.generate().await?;

    if !report.skipped.is_empty() {
        tracing::warn!(
            "{} posts could not be generated: {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} posts in {:.2}s",
        report.posts,
        duration.as_secs_f64()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_from_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let docs = crate::source::timeline(2);
        std::fs::write(
            dir.path().join("posts.json"),
            serde_json::to_string(&docs).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("_config.yml"),
            "content:\n  fixtures: posts.json\n",
        )
        .unwrap();

        let blog = Blog::new(dir.path()).unwrap();
        run(&blog).await.unwrap();

        assert!(blog.public_dir.join("index.html").exists());
        assert!(blog.public_dir.join("post/post-2/index.html").exists());
    }
}
