//! Reading-history import: turns a delimited export into records and a
//! preference summary that the recommendation prompt can use.

use crate::models::{PreferenceSummary, ReadingRecord};
use std::collections::HashMap;
use tracing::debug;

/// Fields read per line: title, author, rating, date read, review, isbn.
const MAX_FIELDS: usize = 6;
const MIN_FIELDS: usize = 3;
const MAX_FAVORITE_AUTHORS: usize = 10;

/// Parse a reading-history export.
///
/// The first line is a header and is skipped, as are blank lines. Lines with
/// fewer than three fields are dropped. Malformed input never fails; whatever
/// could be read is returned.
pub fn parse_reading_history(raw: &str) -> Vec<ReadingRecord> {
    let mut records = Vec::new();

    for (line_no, line) in raw.lines().enumerate().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields = split_fields(line);
        if fields.len() < MIN_FIELDS {
            debug!(
                "Skipping line {} with only {} fields",
                line_no + 1,
                fields.len()
            );
            continue;
        }

        let mut fields = fields.into_iter();
        let mut next = || fields.next().unwrap_or_default();

        let title = next();
        let author = next();
        let rating = parse_rating(&next());
        let date_read = next();
        let review = Some(next()).filter(|s| !s.is_empty());
        let isbn = Some(next()).filter(|s| !s.is_empty());

        records.push(ReadingRecord {
            title,
            author,
            rating,
            date_read,
            review,
            isbn,
        });
    }

    records
}

/// Split one line on commas that sit outside double quotes.
///
/// Quotes are removed from the output and surrounding whitespace trimmed.
/// Only the first six fields are kept.
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::with_capacity(MAX_FIELDS);
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
                if fields.len() == MAX_FIELDS {
                    return fields;
                }
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

fn parse_rating(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|r| r.is_finite())
        .unwrap_or(0.0)
}

/// Derive a preference summary from parsed records.
///
/// Authors are counted by exact name. Ties keep the order in which authors
/// were first seen.
pub fn summarize(records: &[ReadingRecord]) -> PreferenceSummary {
    let mut author_order: Vec<(&str, usize)> = Vec::new();
    let mut author_index: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let author = record.author.as_str();
        match author_index.get(author) {
            Some(&idx) => author_order[idx].1 += 1,
            None => {
                author_index.insert(author, author_order.len());
                author_order.push((author, 1));
            }
        }
    }

    // sort_by is stable, so first-seen order survives for equal counts
    author_order.sort_by(|a, b| b.1.cmp(&a.1));

    let favorite_authors = author_order
        .into_iter()
        .take(MAX_FAVORITE_AUTHORS)
        .map(|(author, _)| author.to_string())
        .collect();

    let reading_history = records
        .iter()
        .map(|record| format!("{} by {}", record.title, record.author))
        .collect();

    PreferenceSummary {
        favorite_authors,
        reading_history,
        average_rating: average_rating(records),
        ..Default::default()
    }
}

/// Mean rating of the records, `None` for an empty slice.
pub fn average_rating(records: &[ReadingRecord]) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|r| r.rating).sum();
    Some(total / records.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PreferredComplexity, PreferredLength};

    const HEADER: &str = "Title,Author,Rating,Date Read,Review,ISBN";

    fn record(title: &str, author: &str, rating: f64) -> ReadingRecord {
        ReadingRecord {
            title: title.to_string(),
            author: author.to_string(),
            rating,
            date_read: String::new(),
            review: None,
            isbn: None,
        }
    }

    #[test]
    fn parses_quoted_fields_and_skips_header() {
        let csv = format!(
            "{}\n\"Dune\",\"Frank Herbert\",\"5\",\"2023-01-01\"\n\"Dune Messiah\",\"Frank Herbert\",\"4\",\"2023-02-01\"\n",
            HEADER
        );
        let records = parse_reading_history(&csv);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Dune");
        assert_eq!(records[0].author, "Frank Herbert");
        assert_eq!(records[0].rating, 5.0);
        assert_eq!(records[0].date_read, "2023-01-01");
        assert_eq!(records[0].review, None);
        assert_eq!(records[1].title, "Dune Messiah");
    }

    #[test]
    fn keeps_commas_inside_quotes() {
        let csv = format!(
            "{}\n\"Guns, Germs, and Steel\",Jared Diamond,4,2022-05-01,\"Dense, but great\",0393317552",
            HEADER
        );
        let records = parse_reading_history(&csv);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Guns, Germs, and Steel");
        assert_eq!(records[0].review.as_deref(), Some("Dense, but great"));
        assert_eq!(records[0].isbn.as_deref(), Some("0393317552"));
    }

    #[test]
    fn drops_short_and_blank_lines() {
        let csv = format!("{}\n\nOnly Title,Someone\n   \nEmma,Jane Austen,5\n", HEADER);
        let records = parse_reading_history(&csv);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Emma");
    }

    #[test]
    fn non_numeric_rating_becomes_zero() {
        let csv = format!("{}\nEmma,Jane Austen,great\nPersuasion,Jane Austen,NaN", HEADER);
        let records = parse_reading_history(&csv);

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.rating == 0.0));
    }

    #[test]
    fn ignores_fields_past_the_sixth() {
        let csv = format!("{}\nEmma,Jane Austen,5,2021-01-01,Lovely,123,extra,columns", HEADER);
        let records = parse_reading_history(&csv);

        assert_eq!(records[0].isbn.as_deref(), Some("123"));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let csv = format!("{}\r\nEmma,Jane Austen,5,2021-01-01\r\n", HEADER);
        let records = parse_reading_history(&csv);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date_read, "2021-01-01");
    }

    #[test]
    fn garbage_yields_no_records() {
        assert!(parse_reading_history("").is_empty());
        assert!(parse_reading_history("just a header").is_empty());
        assert!(parse_reading_history("header\nnot,enough").is_empty());
    }

    #[test]
    fn summarize_single_author() {
        let csv = format!(
            "{}\n\"Dune\",\"Frank Herbert\",\"5\",\"2023-01-01\"\n\"Dune Messiah\",\"Frank Herbert\",\"4\",\"2023-02-01\"",
            HEADER
        );
        let summary = summarize(&parse_reading_history(&csv));

        assert_eq!(summary.favorite_authors, vec!["Frank Herbert".to_string()]);
        assert_eq!(summary.average_rating, Some(4.5));
        assert_eq!(
            summary.reading_history,
            vec![
                "Dune by Frank Herbert".to_string(),
                "Dune Messiah by Frank Herbert".to_string()
            ]
        );
    }

    #[test]
    fn summarize_orders_by_count_then_first_seen() {
        let records = vec![
            record("A", "Le Guin", 4.0),
            record("B", "Banks", 5.0),
            record("C", "Banks", 5.0),
            record("D", "Jemisin", 3.0),
            record("E", "Le Guin", 4.0),
            record("F", "Chiang", 5.0),
        ];
        let summary = summarize(&records);

        assert_eq!(
            summary.favorite_authors,
            vec!["Le Guin", "Banks", "Jemisin", "Chiang"]
        );
        assert_eq!(summary.reading_history.len(), 6);
    }

    #[test]
    fn summarize_caps_authors_at_ten() {
        let records: Vec<ReadingRecord> = (0..15)
            .map(|i| record(&format!("Book {}", i), &format!("Author {}", i), 3.0))
            .collect();
        let summary = summarize(&records);

        assert_eq!(summary.favorite_authors.len(), 10);
        assert_eq!(summary.favorite_authors[0], "Author 0");
        assert_eq!(summary.favorite_authors[9], "Author 9");
    }

    #[test]
    fn summarize_is_case_sensitive() {
        let records = vec![record("A", "banks", 4.0), record("B", "Banks", 4.0)];
        assert_eq!(summarize(&records).favorite_authors.len(), 2);
    }

    #[test]
    fn summarize_empty_has_no_average() {
        let summary = summarize(&[]);

        assert!(summary.favorite_authors.is_empty());
        assert!(summary.reading_history.is_empty());
        assert_eq!(summary.average_rating, None);
        assert_eq!(summary.preferred_length, PreferredLength::Medium);
        assert_eq!(summary.preferred_complexity, PreferredComplexity::Moderate);
        assert!(summary.favorite_genres.is_empty());
        assert!(summary.disliked_authors.is_empty());
    }
}
