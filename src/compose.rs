//! Answer composition — hashtags and the caption for a republished voice answer.
//!
//! Everything here is a pure function of its inputs.

use crate::questions::Question;

/// Maximum number of hashtags derived from a question.
pub const MAX_HASHTAGS: usize = 5;

/// Tokens must be longer than this (in characters) to become a hashtag.
const MIN_TAG_CHARS_EXCLUSIVE: usize = 3;

/// Shown instead of the asker when no label is known.
const FALLBACK_ASKER: &str = "کاربر";

/// Fixed tags that lead every caption's tag line.
const FIXED_HASHTAGS: &str = "#مشاوره_دارویی #داروخانه_آنلاین";

/// A voice answer ready to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundVoice {
    pub chat_id: i64,
    /// Transport reference to the already-uploaded voice (Telegram `file_id`).
    pub media_ref: String,
    pub caption: String,
}

/// Derive up to five hashtags from question text.
///
/// Lower-cases, splits on whitespace and keeps tokens longer than three
/// characters, in order. Punctuation stays attached to its token.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|word| word.chars().count() > MIN_TAG_CHARS_EXCLUSIVE)
        .take(MAX_HASHTAGS)
        .map(|word| format!("#{word}"))
        .collect()
}

/// Build the caption attached to a republished answer.
pub fn compose_caption(question: &Question, hashtags: &[String]) -> String {
    let asker = if question.asker_label.is_empty() {
        FALLBACK_ASKER
    } else {
        question.asker_label.as_str()
    };
    let date = question.asked_at.format("%Y/%m/%d");

    format!(
        "🗣 سؤال توسط @{asker}:\n\
         ❓ {body}\n\
         \n\
         🎧 پاسخ دکتر زجاجی:\n\
         📅 تاریخ: {date}\n\
         {FIXED_HASHTAGS} {tags}",
        body = question.body,
        tags = hashtags.join(" "),
    )
}

/// Pair a matched question with its voice answer.
pub fn build_outbound_payload(question: &Question, media_ref: &str) -> OutboundVoice {
    let hashtags = extract_hashtags(&question.body);
    OutboundVoice {
        chat_id: question.origin_chat_id,
        media_ref: media_ref.to_string(),
        caption: compose_caption(question, &hashtags),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone, Utc};

    use super::*;

    fn sara_question() -> Question {
        Question::new(
            42,
            -1001700701292,
            "sara",
            "آیا این دارو ایمن است؟",
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap().fixed_offset(),
        )
    }

    // ── extract_hashtags ────────────────────────────────────────────

    #[test]
    fn hashtags_keep_long_words_lowercased() {
        let tags = extract_hashtags("The quick fox runs very fast");
        assert_eq!(tags, vec!["#quick", "#runs", "#very", "#fast"]);
    }

    #[test]
    fn hashtags_capped_at_five_in_order() {
        let tags = extract_hashtags("Alpha bravo charlie delta echoes foxtrot");
        assert_eq!(
            tags,
            vec!["#alpha", "#bravo", "#charlie", "#delta", "#echoes"]
        );
    }

    #[test]
    fn hashtags_count_characters_not_bytes() {
        // "این" is three characters but six bytes.
        let tags = extract_hashtags("آیا این دارو ایمن است؟");
        assert_eq!(tags, vec!["#دارو", "#ایمن", "#است؟"]);
    }

    #[test]
    fn hashtags_no_dedup_and_punctuation_kept() {
        let tags = extract_hashtags("dose, dose, DOSE");
        assert_eq!(tags, vec!["#dose,", "#dose,", "#dose"]);
    }

    #[test]
    fn hashtags_empty_for_short_words() {
        assert!(extract_hashtags("is it ok").is_empty());
        assert!(extract_hashtags("").is_empty());
    }

    #[test]
    fn hashtags_split_on_any_whitespace() {
        let tags = extract_hashtags("first\nsecond\tthird");
        assert_eq!(tags, vec!["#first", "#second", "#third"]);
    }

    #[test]
    fn hashtags_are_deterministic() {
        let text = "Aspirin interactions with blood thinners";
        assert_eq!(extract_hashtags(text), extract_hashtags(text));
    }

    // ── compose_caption ─────────────────────────────────────────────

    #[test]
    fn caption_matches_template_exactly() {
        let q = sara_question();
        let caption = compose_caption(&q, &extract_hashtags(&q.body));
        let expected = "🗣 سؤال توسط @sara:\n\
                        ❓ آیا این دارو ایمن است؟\n\
                        \n\
                        🎧 پاسخ دکتر زجاجی:\n\
                        📅 تاریخ: 2024/05/01\n\
                        #مشاوره_دارویی #داروخانه_آنلاین #دارو #ایمن #است؟";
        assert_eq!(caption, expected);
    }

    #[test]
    fn caption_without_derived_tags_keeps_fixed_tags() {
        let asked_at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        let q = Question::new(1, -1, "sara", "ok?", asked_at.fixed_offset());
        let caption = compose_caption(&q, &[]);
        let last_line = caption.lines().last().unwrap();
        assert_eq!(last_line, "#مشاوره_دارویی #داروخانه_آنلاین ");
        assert!(caption.contains("📅 تاریخ: 2024/12/31\n"));
    }

    #[test]
    fn caption_date_uses_question_offset() {
        // 22:00 UTC on 30 April is already 1 May in Tehran (UTC+3:30).
        let tehran = FixedOffset::east_opt(3 * 3600 + 30 * 60).unwrap();
        let asked_at = Utc.with_ymd_and_hms(2024, 4, 30, 22, 0, 0).unwrap();
        let q = Question::new(1, -1, "sara", "ok?", asked_at.with_timezone(&tehran));
        assert!(compose_caption(&q, &[]).contains("📅 تاریخ: 2024/05/01\n"));
    }

    #[test]
    fn caption_falls_back_when_asker_unknown() {
        let mut q = sara_question();
        q.asker_label = String::new();
        let caption = compose_caption(&q, &[]);
        assert!(caption.starts_with("🗣 سؤال توسط @کاربر:\n"));
    }

    #[test]
    fn caption_is_deterministic() {
        let q = sara_question();
        let tags = extract_hashtags(&q.body);
        assert_eq!(compose_caption(&q, &tags), compose_caption(&q, &tags));
    }

    // ── build_outbound_payload ──────────────────────────────────────

    #[test]
    fn payload_targets_origin_chat() {
        let q = sara_question();
        let payload = build_outbound_payload(&q, "AwACAgQAAxkBAAIB");
        assert_eq!(payload.chat_id, -1001700701292);
        assert_eq!(payload.media_ref, "AwACAgQAAxkBAAIB");
        assert!(payload.caption.contains(&q.body));
        assert!(payload.caption.ends_with("#دارو #ایمن #است؟"));
    }
}
