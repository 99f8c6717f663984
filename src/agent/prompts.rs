//! Prompt builders for each agent stage.

use super::Stage;
use crate::filter::PROMO_WORDS;
use crate::types::{GenerationRequest, Subject};

/// Shared context block: stage, topic, tone and brand constraints.
fn header(stage: Stage, request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Stage: {}\nTopic: {}\nTone: {}\n",
        stage.as_str(),
        request.topic(),
        request.tone()
    );
    if let Some(brand) = request.brand() {
        if !brand.name.trim().is_empty() {
            prompt.push_str(&format!("Brand: {}\n", brand.name.trim()));
        }
        if !brand.keywords.is_empty() {
            prompt.push_str(&format!(
                "Brand keywords (use when they fit): {}\n",
                brand.keywords.join(", ")
            ));
        }
        if !brand.banned.is_empty() {
            prompt.push_str(&format!(
                "Banned words (never use): {}\n",
                brand.banned.join(", ")
            ));
        }
    }
    if request.subject() == Subject::Image {
        prompt.push_str(
            "Subject: a product photo described by the topic. Highlight the item and why someone would like it.\n",
        );
    }
    prompt.push_str(&format!(
        "Avoid promotional language ({}).\n",
        PROMO_WORDS.join(", ")
    ));
    prompt
}

fn with_body(stage: Stage, request: &GenerationRequest, body: &str) -> String {
    format!("{}\n{body}", header(stage, request))
}

pub fn draft(request: &GenerationRequest, count: usize, max_chars: usize) -> String {
    with_body(
        Stage::Draft,
        request,
        &format!(
            "Write {count} distinct short social media post variants, numbered 1 to {count}. \
             Each must be at most {max_chars} characters. \
             Return only the posts, one per line, with no introduction."
        ),
    )
}

pub fn single(request: &GenerationRequest, max_chars: usize) -> String {
    with_body(
        Stage::Draft,
        request,
        &format!(
            "Write 1 short social media post of at most {max_chars} characters. Return only the post."
        ),
    )
}

pub fn critique(request: &GenerationRequest, post: &str) -> String {
    with_body(
        Stage::Critique,
        request,
        &format!(
            "Critique the post for tone, banned words, promotional language, emoji use and length.\n\
             Start with a score from 0 to 10 on its own line (e.g. \"Score: 7\"), \
             then give one short suggestion.\n\nPost:\n{post}"
        ),
    )
}

pub fn refine(request: &GenerationRequest, post: &str, critique: &str, max_chars: usize) -> String {
    let critique = if critique.trim().is_empty() {
        "(no critique available, improve clarity and engagement)"
    } else {
        critique.trim()
    };
    with_body(
        Stage::Refine,
        request,
        &format!(
            "Rewrite the post to address the critique and improve clarity and engagement. \
             Return only the final post, at most {max_chars} characters.\n\n\
             Post:\n{post}\n\nCritique:\n{critique}"
        ),
    )
}

pub fn hashtags(request: &GenerationRequest, post: &str) -> String {
    with_body(
        Stage::Hashtags,
        request,
        &format!("Suggest 3 to 6 relevant hashtags for this post, comma separated.\n\nPost:\n{post}"),
    )
}

pub fn alt_text(request: &GenerationRequest, post: &str) -> String {
    let what = match request.subject() {
        Subject::Image => "the product photo",
        Subject::Topic => "an image that would accompany this post",
    };
    with_body(
        Stage::AltText,
        request,
        &format!("Write a concise alt text (one sentence) describing {what}.\n\nPost:\n{post}"),
    )
}
