//! Values derived from a post at render time

use super::post::Post;

/// Average reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Number of whitespace-separated words in the post body
///
/// Block headings are not counted, only fragment texts.
pub fn word_count(post: &Post) -> usize {
    post.content
        .iter()
        .flat_map(|block| block.body.iter())
        .map(|fragment| fragment.text.split_whitespace().count())
        .sum()
}

/// Estimated minutes to read, rounded up; 0 for a post without words
pub fn reading_time_minutes(post: &Post) -> usize {
    word_count(post).div_ceil(WORDS_PER_MINUTE)
}

/// Whether the post changed after its first publication
pub fn was_edited(post: &Post) -> bool {
    post.last_publication_date != post.first_publication_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Banner, ContentBlock, TextFragment};
    use chrono::{TimeZone, Utc};

    fn post_with(fragments: Vec<TextFragment>) -> Post {
        Post {
            id: "post".to_string(),
            document_id: "doc".to_string(),
            first_publication_date: None,
            last_publication_date: None,
            title: "Title".to_string(),
            subtitle: String::new(),
            author: "Author".to_string(),
            banner: Banner::default(),
            content: vec![ContentBlock {
                heading: "Heading with several words".to_string(),
                body: fragments,
            }],
        }
    }

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_empty_post_reads_in_zero_minutes() {
        let mut post = post_with(Vec::new());
        assert_eq!(reading_time_minutes(&post), 0);
        post.content.clear();
        assert_eq!(reading_time_minutes(&post), 0);
    }

    #[test]
    fn test_exactly_200_words_is_one_minute() {
        let post = post_with(vec![TextFragment::paragraph(words(200))]);
        assert_eq!(word_count(&post), 200);
        assert_eq!(reading_time_minutes(&post), 1);
    }

    #[test]
    fn test_201_words_rounds_up() {
        let post = post_with(vec![TextFragment::paragraph(words(201))]);
        assert_eq!(reading_time_minutes(&post), 2);
    }

    #[test]
    fn test_words_split_on_any_whitespace() {
        let post = post_with(vec![TextFragment::paragraph("  one\ttwo\n three  ")]);
        assert_eq!(word_count(&post), 3);
    }

    #[test]
    fn test_counts_across_blocks() {
        let mut post = post_with(vec![TextFragment::paragraph(words(150))]);
        post.content.push(ContentBlock {
            heading: "Second".to_string(),
            body: vec![
                TextFragment::paragraph(words(30)),
                TextFragment::paragraph(words(30)),
            ],
        });
        assert_eq!(word_count(&post), 210);
        assert_eq!(reading_time_minutes(&post), 2);
    }

    #[test]
    fn test_adding_fragments_never_decreases_reading_time() {
        let mut post = post_with(Vec::new());
        let mut previous = reading_time_minutes(&post);
        for n in [0, 1, 57, 199, 200, 3, 401] {
            post.content[0].body.push(TextFragment::paragraph(words(n)));
            let current = reading_time_minutes(&post);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_was_edited() {
        let first = Utc.with_ymd_and_hms(2021, 3, 15, 19, 25, 28).unwrap();
        let later = Utc.with_ymd_and_hms(2021, 3, 19, 15, 49, 0).unwrap();
        let mut post = post_with(Vec::new());

        assert!(!was_edited(&post));

        post.first_publication_date = Some(first);
        post.last_publication_date = Some(first);
        assert!(!was_edited(&post));

        post.last_publication_date = Some(later);
        assert!(was_edited(&post));

        post.last_publication_date = None;
        assert!(was_edited(&post));

        post.first_publication_date = None;
        post.last_publication_date = Some(first);
        assert!(was_edited(&post));
    }

    #[test]
    fn test_one_second_difference_counts_as_edit() {
        let first = Utc.with_ymd_and_hms(2021, 3, 15, 19, 25, 28).unwrap();
        let mut post = post_with(Vec::new());
        post.first_publication_date = Some(first);
        post.last_publication_date = Some(first + chrono::Duration::seconds(1));
        assert!(was_edited(&post));
    }
}
